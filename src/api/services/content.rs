//! 内容相关端点：上传文件、创建笔记、读取、下载和统计

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::http::header::{CONTENT_TYPE, ContentDisposition};
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::{Result, StashError};
use crate::services::{ContentService, NoteRequest, UploadRequest};
use crate::storage::{Content, ContentPayload};

// ============ Request/Response DTOs ============

#[derive(Debug, Deserialize)]
pub struct NoteBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: String,
    pub filename: String,
    pub size: i64,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: String,
    pub expires_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// `GET /api/content/{id}` 的响应，按类型区分字段
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentResponse {
    Note {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    File {
        download_url: String,
        filename: String,
        size: i64,
    },
}

impl From<Content> for ContentResponse {
    fn from(content: Content) -> Self {
        match content.payload {
            ContentPayload::Note { title, body } => ContentResponse::Note {
                title,
                content: body,
            },
            ContentPayload::File { filename, size, .. } => ContentResponse::File {
                download_url: format!("/api/content/{}/download", content.id),
                filename,
                size,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub view_count: i64,
    pub created_at: String,
    pub expires_at: String,
}

// ============ Handlers ============

/// 读取 multipart 中名为 `file` 的字段
///
/// 超过大小上限时立即停止读取，由服务层返回 FileTooLarge
async fn read_upload(mut payload: Multipart, max_size: u64) -> Result<UploadRequest> {
    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| StashError::bad_request(format!("invalid multipart data: {}", e)))?;

        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StashError::bad_request("no file provided"))?;

        let mut bytes = Vec::new();
        let mut size: u64 = 0;
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                error!("Failed to read upload chunk: {}", e);
                StashError::bad_request(format!("failed to read file: {}", e))
            })?;
            size += chunk.len() as u64;
            if size > max_size {
                debug!(size, max_size, "Upload exceeded limit while streaming");
                return Ok(UploadRequest {
                    bytes: Vec::new(),
                    filename,
                    size,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadRequest {
            bytes,
            filename,
            size,
        });
    }

    Err(StashError::bad_request("no file provided"))
}

pub async fn upload(
    payload: Multipart,
    service: web::Data<ContentService>,
) -> Result<HttpResponse> {
    let req = read_upload(payload, service.limits().max_file_size).await?;
    let content = service.upload(req).await?;

    let (filename, size) = match &content.payload {
        ContentPayload::File { filename, size, .. } => (filename.clone(), *size),
        ContentPayload::Note { .. } => {
            return Err(StashError::internal("上传结果不是文件内容"));
        }
    };

    Ok(HttpResponse::Ok().json(UploadResponse {
        id: content.id,
        filename,
        size,
        expires_at: content.expires_at.to_rfc3339(),
    }))
}

pub async fn create_note(
    body: web::Json<NoteBody>,
    service: web::Data<ContentService>,
) -> Result<HttpResponse> {
    let NoteBody { title, content } = body.into_inner();
    let created = service
        .create_note(NoteRequest {
            title,
            body: content,
        })
        .await?;

    let title = match created.payload {
        ContentPayload::Note { title, .. } => title,
        ContentPayload::File { .. } => None,
    };

    Ok(HttpResponse::Ok().json(NoteResponse {
        id: created.id,
        expires_at: created.expires_at.to_rfc3339(),
        title,
    }))
}

pub async fn get_content(
    path: web::Path<String>,
    service: web::Data<ContentService>,
) -> Result<HttpResponse> {
    let content = service.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ContentResponse::from(content)))
}

pub async fn download(
    path: web::Path<String>,
    service: web::Data<ContentService>,
) -> Result<HttpResponse> {
    let file = service.download(&path.into_inner()).await?;

    let bytes = tokio::fs::read(&file.path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StashError::not_found("file not found")
        } else {
            error!(path = %file.path.display(), "Failed to read file for download: {}", e);
            StashError::internal("failed to read file")
        }
    })?;

    Ok(HttpResponse::build(StatusCode::OK)
        .insert_header(ContentDisposition::attachment(file.filename))
        .insert_header((CONTENT_TYPE, "application/octet-stream"))
        .insert_header(("Content-Transfer-Encoding", "binary"))
        .body(bytes))
}

pub async fn stats(
    path: web::Path<String>,
    service: web::Data<ContentService>,
) -> Result<HttpResponse> {
    let stats = service.stats(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(StatsResponse {
        view_count: stats.view_count,
        created_at: stats.created_at.to_rfc3339(),
        expires_at: stats.expires_at.to_rfc3339(),
    }))
}

/// 内容路由（挂载在 `/api` 下）
pub fn content_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload", web::post().to(upload))
        .route("/note", web::post().to(create_note))
        .route("/content/{id}", web::get().to(get_content))
        .route("/content/{id}/download", web::get().to(download))
        .route("/stats/{id}", web::get().to(stats));
}
