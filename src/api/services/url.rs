//! 短链接端点：创建、跳转、统计和删除

use actix_web::http::header::{HeaderName, LOCATION, REFERER, USER_AGENT};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::errors::Result;
use crate::services::{ShortenRequest, UrlService};
use crate::storage::{ClickMeta, UrlClick};

// ============ Request/Response DTOs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenBody {
    pub url: String,
    #[serde(default)]
    pub custom_alias: Option<String>,
    /// 有效天数
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub id: i64,
    pub short_code: String,
    pub short_url: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlStatsResponse {
    pub short_code: String,
    pub original_url: String,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub recent_clicks: Vec<UrlClick>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============ Handlers ============

/// 从请求中提取点击来源；空值记为 None
fn click_meta(req: &HttpRequest) -> ClickMeta {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    ClickMeta {
        ip_address: req.connection_info().realip_remote_addr().map(str::to_string),
        user_agent: header(USER_AGENT),
        referrer: header(REFERER),
    }
}

pub async fn shorten(
    body: web::Json<ShortenBody>,
    service: web::Data<UrlService>,
) -> Result<HttpResponse> {
    let ShortenBody {
        url,
        custom_alias,
        expires_in,
    } = body.into_inner();

    let created = service
        .shorten(ShortenRequest {
            url,
            custom_alias,
            expires_in_days: expires_in,
        })
        .await?;

    Ok(HttpResponse::Created().json(ShortenResponse {
        id: created.id,
        short_url: service.short_url(&created.short_code),
        short_code: created.short_code,
        original_url: created.original_url,
        created_at: created.created_at,
        expires_at: created.expires_at,
    }))
}

pub async fn redirect(
    req: HttpRequest,
    path: web::Path<String>,
    service: web::Data<UrlService>,
) -> Result<HttpResponse> {
    let code = path.into_inner();
    let target = service.redirect(&code, click_meta(&req)).await?;
    trace!(short_code = %code, "Redirecting");

    Ok(HttpResponse::MovedPermanently()
        .insert_header((LOCATION, target))
        .finish())
}

pub async fn stats(
    path: web::Path<String>,
    service: web::Data<UrlService>,
) -> Result<HttpResponse> {
    let stats = service.stats(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(UrlStatsResponse {
        short_code: stats.url.short_code,
        original_url: stats.url.original_url,
        click_count: stats.url.click_count,
        created_at: stats.url.created_at,
        expires_at: stats.url.expires_at,
        recent_clicks: stats.recent_clicks,
    }))
}

pub async fn delete(
    path: web::Path<String>,
    service: web::Data<UrlService>,
) -> Result<HttpResponse> {
    service.delete(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "short url deleted successfully".to_string(),
    }))
}

/// 短链接 API 路由（挂载在 `/api` 下）
pub fn url_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/shorten", web::post().to(shorten))
        .route("/shorten/{code}/stats", web::get().to(stats))
        .route("/shorten/{code}", web::delete().to(delete));
}

/// 跳转路由
pub fn redirect_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/s/{code}", web::get().to(redirect));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_click_meta_from_headers() {
        let req = TestRequest::get()
            .uri("/s/abc123")
            .insert_header((USER_AGENT, "curl/8.0"))
            .insert_header((REFERER, "https://news.example.org/post"))
            .peer_addr("203.0.113.9:4711".parse().unwrap())
            .to_http_request();

        let meta = click_meta(&req);
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(meta.referrer.as_deref(), Some("https://news.example.org/post"));
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_click_meta_missing_headers() {
        let req = TestRequest::get().uri("/s/abc123").to_http_request();
        let meta = click_meta(&req);
        assert!(meta.user_agent.is_none());
        assert!(meta.referrer.is_none());
    }

    #[test]
    fn test_shorten_body_field_names() {
        let body: ShortenBody = serde_json::from_str(
            r#"{"url":"https://example.com","customAlias":"promo1","expiresIn":3}"#,
        )
        .unwrap();
        assert_eq!(body.custom_alias.as_deref(), Some("promo1"));
        assert_eq!(body.expires_in, Some(3));
    }
}
