//! 服务层集成测试
//!
//! 覆盖笔记、文件上传、短链接和计数更新的端到端流程。

use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tempfile::TempDir;

use stashlink::config::{DatabaseConfig, StorageConfig};
use stashlink::errors::StashError;
use stashlink::services::{
    ContentLimits, ContentService, NoteRequest, ShortenRequest, UploadRequest, UrlService,
};
use stashlink::storage::{ClickMeta, ContentPayload, Database, FileStorage, NewContent, Stores};
use stashlink::tasks::{CounterHandle, CounterUpdater};
use stashlink::utils::{CONTENT_ID_LENGTH, SHORT_CODE_LENGTH};

// =============================================================================
// 测试环境
// =============================================================================

struct TestEnv {
    _dir: TempDir,
    stores: Stores,
    files: FileStorage,
    content: ContentService,
    urls: UrlService,
    counter_handle: CounterHandle,
}

async fn setup() -> TestEnv {
    setup_with(ContentLimits::from(&StorageConfig::default())).await
}

async fn setup_with(limits: ContentLimits) -> TestEnv {
    let dir = TempDir::new().expect("创建临时目录失败");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", dir.path().join("svc.db").display()),
        max_connections: 5,
        min_connections: 1,
        ..Default::default()
    };
    let db = Database::connect(&config).await.expect("连接 SQLite 失败");
    let stores = Stores::new(db);

    let files = FileStorage::new(dir.path().join("uploads"));
    files.ensure_root().await.unwrap();

    let (counters, counter_handle) = CounterUpdater::spawn(Arc::new(stores.clone()), 64);
    let content = ContentService::new(
        stores.content.clone(),
        files.clone(),
        counters.clone(),
        limits,
    );
    let urls = UrlService::new(stores.urls.clone(), counters, "http://localhost:8080/");

    TestEnv {
        _dir: dir,
        stores,
        files,
        content,
        urls,
        counter_handle,
    }
}

fn upload(filename: &str, bytes: &[u8]) -> UploadRequest {
    UploadRequest {
        bytes: bytes.to_vec(),
        filename: filename.to_string(),
        size: bytes.len() as u64,
    }
}

// =============================================================================
// 笔记
// =============================================================================

#[tokio::test]
async fn test_note_lifecycle_and_view_count() {
    let env = setup().await;

    let note = env
        .content
        .create_note(NoteRequest {
            title: None,
            body: "hello".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(note.id.len(), CONTENT_ID_LENGTH);
    assert!(note.id.chars().all(|c| c.is_ascii_alphanumeric()));
    let retention = note.expires_at - note.created_at;
    assert!((retention - Duration::days(7)).num_seconds().abs() <= 1);

    let fetched = env.content.get(&note.id).await.unwrap();
    assert_eq!(
        fetched.payload,
        ContentPayload::Note {
            title: None,
            body: "hello".to_string()
        }
    );
    // 读取时返回的是递增前的计数
    assert_eq!(fetched.view_count, 0);

    // 排空计数队列后计数可见
    let stats = env.counter_handle.shutdown().await;
    assert_eq!(stats.applied, 1);
    assert_eq!(env.content.stats(&note.id).await.unwrap().view_count, 1);
}

#[tokio::test]
async fn test_note_validation() {
    let env = setup().await;

    let empty = env.content.create_note(NoteRequest::default()).await;
    assert!(matches!(empty, Err(StashError::BadRequest(_))));

    let too_large = env
        .content
        .create_note(NoteRequest {
            title: None,
            body: "x".repeat(1024 * 1024 + 1),
        })
        .await;
    assert!(matches!(too_large, Err(StashError::ContentTooLarge(_))));

    // 空标题视为无标题
    let note = env
        .content
        .create_note(NoteRequest {
            title: Some("  ".to_string()),
            body: "body".to_string(),
        })
        .await
        .unwrap();
    assert!(matches!(note.payload, ContentPayload::Note { title: None, .. }));
}

#[tokio::test]
async fn test_content_eight_days_old_is_not_found() {
    let env = setup().await;
    let created_at = Utc::now() - Duration::days(8);
    env.stores
        .content
        .create(&NewContent {
            id: "Stale001".to_string(),
            payload: ContentPayload::Note {
                title: None,
                body: "old".to_string(),
            },
            created_at,
            expires_at: created_at + Duration::days(7),
        })
        .await
        .unwrap();

    assert!(matches!(
        env.content.get("Stale001").await,
        Err(StashError::NotFound(_))
    ));
    // 过期但未清理的内容仍可查看统计
    assert!(env.content.stats("Stale001").await.is_ok());
}

#[tokio::test]
async fn test_deleted_content_is_gone_for_reads_and_stats() {
    let env = setup().await;
    let note = env
        .content
        .create_note(NoteRequest {
            title: Some("t".to_string()),
            body: "secret".to_string(),
        })
        .await
        .unwrap();

    env.content.delete(&note.id).await.unwrap();

    assert!(matches!(
        env.content.get(&note.id).await,
        Err(StashError::NotFound(_))
    ));
    assert!(matches!(
        env.content.stats(&note.id).await,
        Err(StashError::NotFound(_))
    ));
    assert!(env.content.list_all().await.unwrap().is_empty());
}

// =============================================================================
// 文件
// =============================================================================

#[tokio::test]
async fn test_upload_and_download() {
    let env = setup().await;

    let content = env
        .content
        .upload(upload("Report.TXT", b"quarterly numbers"))
        .await
        .unwrap();

    let ContentPayload::File {
        filename,
        storage_path,
        size,
    } = &content.payload
    else {
        panic!("expected file payload");
    };
    assert_eq!(filename, "Report.TXT");
    assert_eq!(*size, 17);
    assert!(storage_path.ends_with(&format!("{}.txt", content.id)));
    assert_eq!(
        tokio::fs::read(storage_path).await.unwrap(),
        b"quarterly numbers"
    );

    let download = env.content.download(&content.id).await.unwrap();
    assert_eq!(download.filename, "Report.TXT");
    assert_eq!(download.path, Path::new(storage_path));
}

#[tokio::test]
async fn test_upload_without_extension_is_allowed() {
    let env = setup().await;
    let content = env.content.upload(upload("Makefile", b"all:")).await.unwrap();
    let ContentPayload::File { storage_path, .. } = &content.payload else {
        panic!("expected file payload");
    };
    assert!(storage_path.ends_with(&content.id));
}

#[tokio::test]
async fn test_upload_rejections_leave_nothing_behind() {
    let limits = ContentLimits {
        max_file_size: 8,
        ..ContentLimits::from(&StorageConfig::default())
    };
    let env = setup_with(limits).await;

    let too_large = env.content.upload(upload("big.txt", b"0123456789")).await;
    assert!(matches!(too_large, Err(StashError::FileTooLarge(_))));

    let bad_type = env.content.upload(upload("tool.exe", b"MZ")).await;
    assert!(matches!(bad_type, Err(StashError::FileTypeNotAllowed(_))));

    let mut entries = tokio::fs::read_dir(env.files.root()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
    assert!(env.content.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_size_follows_received_bytes() {
    let limits = ContentLimits {
        max_file_size: 8,
        ..ContentLimits::from(&StorageConfig::default())
    };
    let env = setup_with(limits).await;

    // 声明的 size 偏小时仍按实际字节数校验
    let understated = env
        .content
        .upload(UploadRequest {
            bytes: b"0123456789".to_vec(),
            filename: "big.txt".to_string(),
            size: 1,
        })
        .await;
    assert!(matches!(understated, Err(StashError::FileTooLarge(_))));

    // 记录的大小是实际写入的字节数
    let content = env
        .content
        .upload(UploadRequest {
            bytes: b"abc".to_vec(),
            filename: "small.txt".to_string(),
            size: 0,
        })
        .await
        .unwrap();
    assert!(matches!(content.payload, ContentPayload::File { size: 3, .. }));
}

#[tokio::test]
async fn test_file_with_missing_blob_is_not_found() {
    let env = setup().await;
    let content = env.content.upload(upload("a.md", b"# hi")).await.unwrap();
    let ContentPayload::File { storage_path, .. } = &content.payload else {
        panic!("expected file payload");
    };
    tokio::fs::remove_file(storage_path).await.unwrap();

    assert!(matches!(
        env.content.get(&content.id).await,
        Err(StashError::NotFound(msg)) if msg == "file not found"
    ));
}

#[tokio::test]
async fn test_download_note_is_bad_request() {
    let env = setup().await;
    let note = env
        .content
        .create_note(NoteRequest {
            title: None,
            body: "text".to_string(),
        })
        .await
        .unwrap();

    assert!(matches!(
        env.content.download(&note.id).await,
        Err(StashError::BadRequest(msg)) if msg == "content is not a file"
    ));
}

#[tokio::test]
async fn test_cleanup_expired_removes_uploaded_file() {
    let env = setup().await;
    let path = env.files.path_for("Sweep001", ".txt");
    env.files.write(&path, b"old").await.unwrap();

    let created_at = Utc::now() - Duration::days(10);
    env.stores
        .content
        .create(&NewContent {
            id: "Sweep001".to_string(),
            payload: ContentPayload::File {
                filename: "old.txt".to_string(),
                storage_path: path.to_string_lossy().into_owned(),
                size: 3,
            },
            created_at,
            expires_at: created_at + Duration::days(7),
        })
        .await
        .unwrap();

    let report = env.content.cleanup_expired().await.unwrap();
    assert_eq!(report.records_deleted, 1);
    assert_eq!(report.files_removed, 1);
    assert!(!env.files.exists(&path).await);
}

// =============================================================================
// 短链接
// =============================================================================

fn shorten(url: &str) -> ShortenRequest {
    ShortenRequest {
        url: url.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_shorten_twice_gives_distinct_codes() {
    let env = setup().await;

    let a = env.urls.shorten(shorten("https://example.com")).await.unwrap();
    let b = env.urls.shorten(shorten("https://example.com")).await.unwrap();

    assert_ne!(a.short_code, b.short_code);
    for url in [&a, &b] {
        assert_eq!(url.short_code.len(), SHORT_CODE_LENGTH);
        assert!(url.expires_at.is_none());
        let target = env
            .urls
            .redirect(&url.short_code, ClickMeta::default())
            .await
            .unwrap();
        assert_eq!(target, "https://example.com");
    }

    assert_eq!(
        env.urls.short_url(&a.short_code),
        format!("http://localhost:8080/s/{}", a.short_code)
    );
}

#[tokio::test]
async fn test_custom_alias() {
    let env = setup().await;

    let created = env
        .urls
        .shorten(ShortenRequest {
            url: "https://example.com/promo".to_string(),
            custom_alias: Some("promo2026".to_string()),
            expires_in_days: Some(3),
        })
        .await
        .unwrap();
    assert_eq!(created.short_code, "promo2026");
    assert_eq!(created.custom_alias.as_deref(), Some("promo2026"));
    let expires_at = created.expires_at.expect("expiry set");
    assert!(((expires_at - Utc::now()) - Duration::days(3)).num_seconds().abs() <= 5);

    let taken = env
        .urls
        .shorten(ShortenRequest {
            url: "https://example.org".to_string(),
            custom_alias: Some("promo2026".to_string()),
            expires_in_days: None,
        })
        .await;
    assert!(matches!(taken, Err(StashError::Conflict(msg)) if msg == "custom alias already taken"));

    for alias in ["ab", "has space", "way-too-long-alias-value"] {
        let result = env
            .urls
            .shorten(ShortenRequest {
                url: "https://example.org".to_string(),
                custom_alias: Some(alias.to_string()),
                expires_in_days: None,
            })
            .await;
        assert!(matches!(result, Err(StashError::BadRequest(_))), "{}", alias);
    }
}

#[tokio::test]
async fn test_shorten_validation() {
    let env = setup().await;

    for bad in ["", "not a url", "ftp://example.com/file", "javascript:alert(1)"] {
        assert!(
            matches!(
                env.urls.shorten(shorten(bad)).await,
                Err(StashError::BadRequest(_))
            ),
            "{}",
            bad
        );
    }

    // 非正数天数表示不过期
    let url = env
        .urls
        .shorten(ShortenRequest {
            url: "https://example.com".to_string(),
            custom_alias: None,
            expires_in_days: Some(0),
        })
        .await
        .unwrap();
    assert!(url.expires_at.is_none());
}

#[tokio::test]
async fn test_redirect_records_click_and_stats() {
    let env = setup().await;
    let url = env
        .urls
        .shorten(shorten("https://example.com/docs"))
        .await
        .unwrap();

    env.urls
        .redirect(
            &url.short_code,
            ClickMeta {
                ip_address: Some("198.51.100.7".to_string()),
                user_agent: Some("test-agent".to_string()),
                referrer: Some("https://ref.example".to_string()),
            },
        )
        .await
        .unwrap();

    env.counter_handle.shutdown().await;

    let stats = env.urls.stats(&url.short_code).await.unwrap();
    assert_eq!(stats.url.click_count, 1);
    assert_eq!(stats.recent_clicks.len(), 1);
    assert_eq!(stats.recent_clicks[0].user_agent.as_deref(), Some("test-agent"));
    assert_eq!(stats.recent_clicks[0].url_id, url.id);
}

#[tokio::test]
async fn test_delete_short_url() {
    let env = setup().await;
    let url = env.urls.shorten(shorten("https://example.com")).await.unwrap();

    env.urls.delete(&url.short_code).await.unwrap();
    assert!(matches!(
        env.urls.redirect(&url.short_code, ClickMeta::default()).await,
        Err(StashError::NotFound(_))
    ));
    assert!(matches!(
        env.urls.delete(&url.short_code).await,
        Err(StashError::NotFound(_))
    ));
    assert!(matches!(
        env.urls.delete("nosuch").await,
        Err(StashError::NotFound(_))
    ));
}
