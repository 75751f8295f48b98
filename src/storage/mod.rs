//! 存储层
//!
//! - `dialect`：SQLite / PostgreSQL 方言抽象
//! - `connection`：连接池、迁移和共享的 `Database` 句柄
//! - `content` / `url`：两类记录的生命周期操作
//! - `files`：上传文件的磁盘存储

pub mod connection;
pub mod content;
mod counter_sink;
pub mod dialect;
pub mod files;
pub mod models;
pub mod retry;
pub mod url;

pub use connection::{Database, connect_postgres, connect_sqlite, run_migrations};
pub use content::{ContentStore, TxFuture};
pub use dialect::{Dialect, PostgresDialect, SqliteDialect, dialect_for_url};
pub use files::{FileStorage, RemoveOutcome};
pub use models::*;
pub use url::UrlStore;

/// 所有 Store 的集合，共享同一个 `Database`
#[derive(Clone)]
pub struct Stores {
    pub content: ContentStore,
    pub urls: UrlStore,
}

impl Stores {
    pub fn new(db: Database) -> Self {
        Self {
            content: ContentStore::new(db.clone()),
            urls: UrlStore::new(db),
        }
    }

    pub fn database(&self) -> &Database {
        self.content.database()
    }
}
