//! 目标 URL 校验
//!
//! 只接受带主机名的绝对 http/https 地址

use url::Url;

use crate::errors::StashError;

/// URL 验证错误
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    MissingHost,
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::MissingHost => write!(f, "URL must contain a host"),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for StashError {
    fn from(err: UrlValidationError) -> Self {
        StashError::bad_request(format!("invalid url format: {}", err))
    }
}

/// 验证短链接目标地址
pub fn validate_target_url(raw: &str) -> Result<Url, UrlValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let parsed = Url::parse(raw).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::InvalidProtocol(format!("{}:", other))),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_target_url("http://example.com").is_ok());
        assert!(validate_target_url("https://example.com/path?query=1").is_ok());
        assert!(validate_target_url("http://localhost:8080").is_ok());
        assert!(validate_target_url("HTTPS://example.com").is_ok());
    }

    #[test]
    fn test_rejected_protocols() {
        assert!(matches!(
            validate_target_url("javascript:alert(1)"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert!(matches!(
            validate_target_url("ftp://example.com"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
        assert!(matches!(
            validate_target_url("file:///etc/passwd"),
            Err(UrlValidationError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_relative_and_empty() {
        assert_eq!(validate_target_url("  "), Err(UrlValidationError::EmptyUrl));
        assert!(matches!(
            validate_target_url("/just/a/path"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
        assert!(matches!(
            validate_target_url("not a url"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_into_stash_error() {
        let err: StashError = UrlValidationError::EmptyUrl.into();
        assert_eq!(err.status_code(), 400);
    }
}
