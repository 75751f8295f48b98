//! Content service
//!
//! Business logic for uploaded files and notes: validation, identifier
//! generation, persistence and scheduling of view-count updates.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::errors::{Result, StashError};
use crate::storage::{
    Content, ContentPayload, ContentStore, FileStorage, Lifecycle, NewContent,
};
use crate::tasks::{CounterUpdater, ExpirySweeper, SweepReport};
use crate::utils::{MAX_ATTEMPTS, ensure_unique, generate_content_id};

/// Extensions accepted for upload (lower-case, with leading dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    ".txt", ".pdf", ".doc", ".docx", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".tar", ".gz",
    ".mp4", ".mp3", ".wav", ".csv", ".xlsx", ".xls", ".json", ".xml", ".md",
];

// ============ Request/Response DTOs ============

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub bytes: Vec<u8>,
    /// Client-supplied original filename
    pub filename: String,
    /// Bytes seen by the reader; may exceed `bytes.len()` when reading stopped at the limit
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NoteRequest {
    pub title: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentStats {
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A file ready to be streamed to the client
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub path: PathBuf,
    pub filename: String,
    pub size: i64,
}

/// Limits applied to new content
#[derive(Debug, Clone, Copy)]
pub struct ContentLimits {
    pub max_file_size: u64,
    pub max_note_bytes: usize,
    pub retention: chrono::Duration,
}

impl From<&StorageConfig> for ContentLimits {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes(),
            max_note_bytes: config.max_note_bytes,
            retention: chrono::Duration::days(config.expiration_days.max(1)),
        }
    }
}

/// Lower-cased extension including the dot, or empty when there is none
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

// ============ Service ============

#[derive(Clone)]
pub struct ContentService {
    store: ContentStore,
    files: FileStorage,
    counters: CounterUpdater,
    sweeper: ExpirySweeper,
    limits: ContentLimits,
}

impl ContentService {
    pub fn new(
        store: ContentStore,
        files: FileStorage,
        counters: CounterUpdater,
        limits: ContentLimits,
    ) -> Self {
        let sweeper = ExpirySweeper::new(store.clone(), files.clone());
        Self {
            store,
            files,
            counters,
            sweeper,
            limits,
        }
    }

    pub fn limits(&self) -> ContentLimits {
        self.limits
    }

    /// Store an uploaded file and register it.
    ///
    /// The row is inserted inside a transaction and the blob is written
    /// before commit, so a failed write leaves no row behind and a failed
    /// insert or commit leaves no blob behind.
    pub async fn upload(&self, req: UploadRequest) -> Result<Content> {
        // 流式读取超限时 bytes 被截断，此时以声明的 size 为准
        let actual_size = req.bytes.len() as u64;
        let checked_size = actual_size.max(req.size);
        if checked_size > self.limits.max_file_size {
            warn!(
                file_size = checked_size,
                max_size = self.limits.max_file_size,
                "File size exceeds limit"
            );
            return Err(StashError::file_too_large(format!(
                "file size exceeds {}MB limit",
                self.limits.max_file_size / (1024 * 1024)
            )));
        }

        let ext = file_extension(&req.filename);
        if !ext.is_empty() && !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            warn!(extension = %ext, "File type not allowed");
            return Err(StashError::file_type_not_allowed("file type not allowed"));
        }

        let bytes: Arc<[u8]> = Arc::from(req.bytes);
        let filename = req.filename;
        let size = actual_size as i64;

        let content = self
            .create_with_fresh_id(|id| {
                let path = self.files.path_for(&id, &ext);
                let new = NewContent::new(
                    id,
                    ContentPayload::File {
                        filename: filename.clone(),
                        storage_path: path.to_string_lossy().into_owned(),
                        size,
                    },
                    self.limits.retention,
                );
                self.insert_file(new, path, bytes.clone())
            })
            .await?;

        info!(content_id = %content.id, filename = %filename, size, "File uploaded");
        Ok(content)
    }

    async fn insert_file(&self, new: NewContent, path: PathBuf, bytes: Arc<[u8]>) -> Result<Content> {
        let written = Arc::new(AtomicBool::new(false));

        let result = {
            let store = self.store.clone();
            let files = self.files.clone();
            let path = path.clone();
            let written = written.clone();
            self.store
                .with_transaction(move |txn| {
                    Box::pin(async move {
                        let content = store.create_in(txn, &new).await?;
                        files.write(&path, &bytes).await?;
                        written.store(true, Ordering::SeqCst);
                        Ok(content)
                    })
                })
                .await
        };

        if result.is_err()
            && written.load(Ordering::SeqCst)
            && let Err(e) = self.files.remove(&path).await
        {
            warn!(path = %path.display(), "Failed to remove orphaned upload: {}", e);
        }

        result
    }

    /// Create a text note
    pub async fn create_note(&self, req: NoteRequest) -> Result<Content> {
        if req.body.is_empty() {
            return Err(StashError::bad_request("note content is required"));
        }
        if req.body.len() > self.limits.max_note_bytes {
            warn!(size = req.body.len(), "Note content too large");
            return Err(StashError::content_too_large(format!(
                "note content exceeds {} bytes limit",
                self.limits.max_note_bytes
            )));
        }

        let title = req.title.filter(|t| !t.trim().is_empty());
        let body = req.body;

        let content = self
            .create_with_fresh_id(|id| {
                let new = NewContent::new(
                    id,
                    ContentPayload::Note {
                        title: title.clone(),
                        body: body.clone(),
                    },
                    self.limits.retention,
                );
                async move { self.store.create(&new).await }
            })
            .await?;

        info!(content_id = %content.id, has_title = title.is_some(), "Note created");
        Ok(content)
    }

    /// Generate an unused id and insert with it; a unique violation on
    /// insert (lost race with a concurrent writer) draws a new id.
    async fn create_with_fresh_id<F, Fut>(&self, mut insert: F) -> Result<Content>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Content>>,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let id = ensure_unique(
                "content id",
                generate_content_id,
                |candidate| async move { self.store.id_exists(&candidate).await },
                MAX_ATTEMPTS,
            )
            .await?;

            match insert(id).await {
                Err(StashError::Conflict(msg)) => {
                    warn!(attempt, "Content id taken at insert time: {}", msg);
                }
                other => return other,
            }
        }

        Err(StashError::internal("failed to generate unique id after retries"))
    }

    /// Fetch active content and schedule a view increment
    pub async fn get(&self, id: &str) -> Result<Content> {
        let content = self.store.find_active_by_id(id).await?;

        if let ContentPayload::File { storage_path, .. } = &content.payload
            && !self.files.exists(Path::new(storage_path)).await
        {
            warn!(content_id = %id, path = %storage_path, "File record has no blob on disk");
            return Err(StashError::not_found("file not found"));
        }

        self.counters.record_view(id);
        Ok(content)
    }

    /// Resolve active file content for download (counts as a view)
    pub async fn download(&self, id: &str) -> Result<FileDownload> {
        let content = self.get(id).await?;
        match content.payload {
            ContentPayload::File {
                filename,
                storage_path,
                size,
            } => Ok(FileDownload {
                path: PathBuf::from(storage_path),
                filename,
                size,
            }),
            ContentPayload::Note { .. } => Err(StashError::bad_request("content is not a file")),
        }
    }

    /// View statistics; expired content still reports, soft-deleted does not
    pub async fn stats(&self, id: &str) -> Result<ContentStats> {
        let content = self.store.find_by_id(id).await?;
        if let Lifecycle::SoftDeleted { .. } = content.lifecycle(Utc::now()) {
            return Err(StashError::not_found("content not found"));
        }
        Ok(ContentStats {
            view_count: content.view_count,
            created_at: content.created_at,
            expires_at: content.expires_at,
        })
    }

    pub async fn list_all(&self) -> Result<Vec<Content>> {
        self.store.list_all().await
    }

    /// Soft delete (admin)
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.soft_delete(id).await?;
        info!(content_id = %id, "Content soft-deleted");
        Ok(())
    }

    /// Run one expiry sweep immediately
    pub async fn cleanup_expired(&self) -> Result<SweepReport> {
        self.sweeper.run_once().await
    }

    pub fn sweeper(&self) -> ExpirySweeper {
        self.sweeper.clone()
    }
}
