//! `StashError` 到 HTTP 响应的转换
//!
//! 所有错误统一渲染为 `{"error": message, "code": CODE}`；
//! 5xx 错误不向客户端暴露内部信息。

use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use tracing::error;

use crate::errors::StashError;

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
    pub code: &'a str,
}

impl ResponseError for StashError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(StashError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            error!(code = self.code(), "Request failed: {}", self.message());
            "internal server error"
        } else {
            self.message()
        };

        HttpResponse::build(ResponseError::status_code(self))
            .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
            .json(ErrorBody {
                error: message,
                code: self.code(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_rt::test]
    async fn test_client_error_body() {
        let resp = StashError::conflict("custom alias already taken").error_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "custom alias already taken");
        assert_eq!(json["code"], "CONFLICT");
    }

    #[actix_rt::test]
    async fn test_internal_error_is_hidden() {
        let resp = StashError::internal("创建内容失败: disk I/O error").error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal server error");
        assert_eq!(json["code"], "INTERNAL_ERROR");
    }

    #[test]
    fn test_validation_errors_are_bad_request() {
        for err in [
            StashError::file_too_large("x"),
            StashError::file_type_not_allowed("x"),
            StashError::content_too_large("x"),
        ] {
            assert_eq!(ResponseError::status_code(&err), StatusCode::BAD_REQUEST);
        }
    }
}
