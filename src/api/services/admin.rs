//! 管理端点：内容列表、软删除和手动清理
//!
//! 由 `AdminAuth` 中间件保护

use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::info;

use crate::api::middleware::AdminAuth;
use crate::errors::Result;
use crate::services::ContentService;
use crate::storage::{Content, ContentKind, ContentPayload};

#[derive(Debug, Serialize)]
pub struct AdminContentItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<i64>,
    pub created_at: String,
    pub expires_at: String,
    pub view_count: i64,
}

impl From<Content> for AdminContentItem {
    fn from(content: Content) -> Self {
        let kind = content.kind();
        let (title, filename, filesize) = match content.payload {
            ContentPayload::Note { title, .. } => (title, None, None),
            ContentPayload::File { filename, size, .. } => (None, Some(filename), Some(size)),
        };
        Self {
            id: content.id,
            kind,
            title,
            filename,
            filesize,
            created_at: content.created_at.to_rfc3339(),
            expires_at: content.expires_at.to_rfc3339(),
            view_count: content.view_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub total: usize,
    pub contents: Vec<AdminContentItem>,
}

pub async fn list_content(service: web::Data<ContentService>) -> Result<HttpResponse> {
    let contents: Vec<AdminContentItem> = service
        .list_all()
        .await?
        .into_iter()
        .map(AdminContentItem::from)
        .collect();

    Ok(HttpResponse::Ok().json(AdminListResponse {
        total: contents.len(),
        contents,
    }))
}

pub async fn delete_content(
    path: web::Path<String>,
    service: web::Data<ContentService>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    service.delete(&id).await?;
    info!(content_id = %id, "Admin API: content deleted");
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "content deleted successfully" })))
}

pub async fn sweep(service: web::Data<ContentService>) -> Result<HttpResponse> {
    let report = service.cleanup_expired().await?;
    info!(records_deleted = report.records_deleted, "Admin API: manual sweep");
    Ok(HttpResponse::Ok().json(report))
}

/// 管理路由（挂载在 `/api` 下）
pub fn admin_routes(cfg: &mut web::ServiceConfig, secret: &str) {
    cfg.service(
        web::scope("/admin")
            .wrap(AdminAuth::new(secret))
            .route("/list", web::get().to(list_content))
            .route("/content/{id}", web::delete().to(delete_content))
            .route("/sweep", web::post().to(sweep)),
    );
}
