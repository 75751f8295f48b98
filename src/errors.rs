use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StashError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    RateLimited(String),
    Unauthorized(String),
    Forbidden(String),
    FileTooLarge(String),
    FileTypeNotAllowed(String),
    ContentTooLarge(String),
    Internal(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
}

impl StashError {
    /// 获取错误代码（同时用于 API 响应中的 `code` 字段）
    pub fn code(&self) -> &'static str {
        match self {
            StashError::BadRequest(_) => "BAD_REQUEST",
            StashError::NotFound(_) => "NOT_FOUND",
            StashError::Conflict(_) => "CONFLICT",
            StashError::RateLimited(_) => "RATE_LIMIT_EXCEEDED",
            StashError::Unauthorized(_) => "UNAUTHORIZED",
            StashError::Forbidden(_) => "FORBIDDEN",
            StashError::FileTooLarge(_) => "FILE_TOO_LARGE",
            StashError::FileTypeNotAllowed(_) => "FILE_TYPE_NOT_ALLOWED",
            StashError::ContentTooLarge(_) => "CONTENT_TOO_LARGE",
            StashError::Internal(_) => "INTERNAL_ERROR",
            StashError::DatabaseConfig(_) => "DATABASE_CONFIG",
            StashError::DatabaseConnection(_) => "DATABASE_CONNECTION",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            StashError::BadRequest(_) => "Bad Request",
            StashError::NotFound(_) => "Resource Not Found",
            StashError::Conflict(_) => "Conflict",
            StashError::RateLimited(_) => "Rate Limit Exceeded",
            StashError::Unauthorized(_) => "Unauthorized",
            StashError::Forbidden(_) => "Forbidden",
            StashError::FileTooLarge(_) => "File Too Large",
            StashError::FileTypeNotAllowed(_) => "File Type Not Allowed",
            StashError::ContentTooLarge(_) => "Content Too Large",
            StashError::Internal(_) => "Internal Error",
            StashError::DatabaseConfig(_) => "Database Configuration Error",
            StashError::DatabaseConnection(_) => "Database Connection Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            StashError::BadRequest(msg)
            | StashError::NotFound(msg)
            | StashError::Conflict(msg)
            | StashError::RateLimited(msg)
            | StashError::Unauthorized(msg)
            | StashError::Forbidden(msg)
            | StashError::FileTooLarge(msg)
            | StashError::FileTypeNotAllowed(msg)
            | StashError::ContentTooLarge(msg)
            | StashError::Internal(msg)
            | StashError::DatabaseConfig(msg)
            | StashError::DatabaseConnection(msg) => msg,
        }
    }

    /// 对应的 HTTP 状态码
    ///
    /// 文件大小、类型、内容长度等校验错误统一返回 400
    pub fn status_code(&self) -> u16 {
        match self {
            StashError::BadRequest(_)
            | StashError::FileTooLarge(_)
            | StashError::FileTypeNotAllowed(_)
            | StashError::ContentTooLarge(_) => 400,
            StashError::Unauthorized(_) => 401,
            StashError::Forbidden(_) => 403,
            StashError::NotFound(_) => 404,
            StashError::Conflict(_) => 409,
            StashError::RateLimited(_) => 429,
            StashError::Internal(_)
            | StashError::DatabaseConfig(_)
            | StashError::DatabaseConnection(_) => 500,
        }
    }

    /// 是否属于服务端内部错误（响应时不应暴露细节）
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }

    /// 格式化为彩色输出（用于启动失败等终端场景）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for StashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for StashError {}

// 便捷的构造函数
impl StashError {
    pub fn bad_request<T: Into<String>>(msg: T) -> Self {
        StashError::BadRequest(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        StashError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        StashError::Conflict(msg.into())
    }

    pub fn rate_limited<T: Into<String>>(msg: T) -> Self {
        StashError::RateLimited(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        StashError::Unauthorized(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        StashError::Forbidden(msg.into())
    }

    pub fn file_too_large<T: Into<String>>(msg: T) -> Self {
        StashError::FileTooLarge(msg.into())
    }

    pub fn file_type_not_allowed<T: Into<String>>(msg: T) -> Self {
        StashError::FileTypeNotAllowed(msg.into())
    }

    pub fn content_too_large<T: Into<String>>(msg: T) -> Self {
        StashError::ContentTooLarge(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        StashError::Internal(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        StashError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        StashError::DatabaseConnection(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for StashError {
    fn from(err: sea_orm::DbErr) -> Self {
        StashError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for StashError {
    fn from(err: std::io::Error) -> Self {
        StashError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for StashError {
    fn from(err: serde_json::Error) -> Self {
        StashError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StashError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_map_to_bad_request() {
        assert_eq!(StashError::file_too_large("x").status_code(), 400);
        assert_eq!(StashError::file_type_not_allowed("x").status_code(), 400);
        assert_eq!(StashError::content_too_large("x").status_code(), 400);
        assert_eq!(StashError::bad_request("x").status_code(), 400);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(StashError::not_found("x").status_code(), 404);
        assert_eq!(StashError::conflict("x").status_code(), 409);
        assert_eq!(StashError::unauthorized("x").status_code(), 401);
        assert_eq!(StashError::forbidden("x").status_code(), 403);
        assert_eq!(StashError::rate_limited("x").status_code(), 429);
        assert_eq!(StashError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_codes() {
        assert_eq!(StashError::file_too_large("x").code(), "FILE_TOO_LARGE");
        assert_eq!(StashError::internal("x").code(), "INTERNAL_ERROR");
        assert_eq!(StashError::rate_limited("x").code(), "RATE_LIMIT_EXCEEDED");
    }

    #[test]
    fn test_db_err_becomes_internal() {
        let err: StashError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(err.is_internal());
        assert!(err.message().contains("boom"));
    }

    #[test]
    fn test_format_simple() {
        let err = StashError::not_found("content not found");
        assert_eq!(err.to_string(), "Resource Not Found: content not found");
    }
}
