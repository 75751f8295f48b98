pub mod code_gen;
pub mod url_validator;

pub use code_gen::{
    CONTENT_ID_LENGTH, MAX_ATTEMPTS, SHORT_CODE_LENGTH, ensure_unique, generate_content_id,
    generate_short_code, validate_custom_alias,
};
