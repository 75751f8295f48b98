pub mod auth;
pub mod timing;

pub use auth::{ADMIN_SECRET_HEADER, AdminAuth};
pub use timing::TimingMiddleware;
