//! 短链接存储
//!
//! 与内容存储结构一致，但没有物理删除路径：过期的短链接只是不再可访问

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbErr, FromQueryResult, Value};
use tracing::{debug, error};

use super::connection::Database;
use super::content::CountRow;
use super::models::{NewClick, NewShortenedUrl, ShortenedUrl, UrlClick};
use super::retry::{is_unique_violation, with_retry};
use crate::errors::{Result, StashError};

const URL_COLUMNS: &str =
    "id, short_code, original_url, custom_alias, created_at, expires_at, click_count, deleted_at";

#[derive(Debug, FromQueryResult)]
struct UrlRow {
    id: i64,
    short_code: String,
    original_url: String,
    custom_alias: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    click_count: i64,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<UrlRow> for ShortenedUrl {
    fn from(row: UrlRow) -> Self {
        ShortenedUrl {
            id: row.id,
            short_code: row.short_code,
            original_url: row.original_url,
            custom_alias: row.custom_alias,
            created_at: row.created_at,
            expires_at: row.expires_at,
            click_count: row.click_count,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct ClickRow {
    id: i64,
    url_id: i64,
    clicked_at: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    referrer: Option<String>,
}

impl From<ClickRow> for UrlClick {
    fn from(row: ClickRow) -> Self {
        UrlClick {
            id: row.id,
            url_id: row.url_id,
            clicked_at: row.clicked_at,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            referrer: row.referrer,
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct InsertedRow {
    id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct UrlStore {
    db: Database,
}

impl UrlStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// 写入新短链接
    ///
    /// PostgreSQL 通过 RETURNING 取回 id 和 created_at；
    /// SQLite 使用 last_insert_id，created_at 取本地时间
    pub async fn create(&self, new: &NewShortenedUrl) -> Result<ShortenedUrl> {
        let dialect = self.db.dialect();
        let conn = self.db.conn();
        let created_at = Utc::now();

        let values = vec![
            Value::from(new.short_code.clone()),
            Value::from(new.original_url.clone()),
            Value::from(new.custom_alias.clone()),
            dialect.timestamp(created_at),
            dialect.optional_timestamp(new.expires_at),
        ];
        const INSERT: &str = "INSERT INTO shortened_urls (short_code, original_url, custom_alias, created_at, expires_at, click_count) \
                              VALUES (?, ?, ?, ?, ?, 0)";

        let result = if dialect.supports_returning() {
            let stmt = dialect.statement(&format!("{} RETURNING id, created_at", INSERT), values);
            with_retry("url.create", self.db.retry_config(), || {
                InsertedRow::find_by_statement(stmt.clone()).one(conn)
            })
            .await
            .and_then(|row| {
                row.map(|r| (r.id, r.created_at))
                    .ok_or_else(|| DbErr::RecordNotInserted)
            })
        } else {
            let stmt = dialect.statement(INSERT, values);
            with_retry("url.create", self.db.retry_config(), || {
                conn.execute_raw(stmt.clone())
            })
            .await
            .map(|res| (res.last_insert_id() as i64, created_at))
        };

        let (id, created_at) = result.map_err(|e| {
            if is_unique_violation(&e) {
                StashError::conflict(format!("short code {} already taken", new.short_code))
            } else {
                error!(short_code = %new.short_code, "Failed to insert shortened url: {}", e);
                StashError::internal(format!("创建短链接失败: {}", e))
            }
        })?;

        debug!(short_code = %new.short_code, url_id = id, "Shortened url inserted");

        Ok(ShortenedUrl {
            id,
            short_code: new.short_code.clone(),
            original_url: new.original_url.clone(),
            custom_alias: new.custom_alias.clone(),
            created_at,
            expires_at: new.expires_at,
            click_count: 0,
            deleted_at: None,
        })
    }

    async fn fetch_one(&self, op: &str, sql: &str, code: &str) -> Result<Option<UrlRow>> {
        let stmt = self
            .db
            .dialect()
            .statement(sql, vec![Value::from(code.to_string())]);
        let conn = self.db.conn();
        with_retry(op, self.db.retry_config(), || {
            UrlRow::find_by_statement(stmt.clone()).one(conn)
        })
        .await
        .map_err(|e| StashError::internal(format!("查询短链接失败: {}", e)))
    }

    /// 按代码查找，包含已过期但未软删除的记录
    pub async fn find_by_short_code(&self, code: &str) -> Result<ShortenedUrl> {
        let sql = format!(
            "SELECT {} FROM shortened_urls WHERE short_code = ? AND (deleted_at IS NULL OR deleted_at > {{now}})",
            URL_COLUMNS
        );
        self.fetch_one("url.find_by_short_code", &sql, code)
            .await?
            .map(ShortenedUrl::from)
            .ok_or_else(|| StashError::not_found("short url not found"))
    }

    /// 只返回可访问的短链接（expires_at 为空视为永不过期）
    pub async fn find_active_by_short_code(&self, code: &str) -> Result<ShortenedUrl> {
        let sql = format!(
            "SELECT {} FROM shortened_urls WHERE short_code = ? \
             AND (expires_at IS NULL OR expires_at > {{now}}) \
             AND (deleted_at IS NULL OR deleted_at > {{now}})",
            URL_COLUMNS
        );
        self.fetch_one("url.find_active_by_short_code", &sql, code)
            .await?
            .map(ShortenedUrl::from)
            .ok_or_else(|| StashError::not_found("short url not found or expired"))
    }

    /// 代码是否被占用（软删除的代码也不会复用）
    pub async fn short_code_exists(&self, code: &str) -> Result<bool> {
        let stmt = self.db.dialect().statement(
            "SELECT COUNT(*) AS total FROM shortened_urls WHERE short_code = ?",
            vec![Value::from(code.to_string())],
        );
        let conn = self.db.conn();
        let row = with_retry("url.short_code_exists", self.db.retry_config(), || {
            CountRow::find_by_statement(stmt.clone()).one(conn)
        })
        .await
        .map_err(|e| StashError::internal(format!("检查短链接代码失败: {}", e)))?;

        Ok(row.is_some_and(|r| r.total > 0))
    }

    pub async fn increment_click_count(&self, id: i64) -> Result<()> {
        let stmt = self.db.dialect().statement(
            "UPDATE shortened_urls SET click_count = click_count + 1 WHERE id = ?",
            vec![Value::from(id)],
        );
        self.execute("url.increment_click_count", stmt)
            .await
            .map(|_| ())
    }

    /// 追加一条点击记录
    pub async fn record_click(&self, click: &NewClick) -> Result<()> {
        let stmt = self.db.dialect().statement(
            "INSERT INTO url_clicks (url_id, clicked_at, ip_address, user_agent, referrer) \
             VALUES (?, {now}, ?, ?, ?)",
            vec![
                Value::from(click.url_id),
                Value::from(click.meta.ip_address.clone()),
                Value::from(click.meta.user_agent.clone()),
                Value::from(click.meta.referrer.clone()),
            ],
        );
        self.execute("url.record_click", stmt).await.map(|_| ())
    }

    /// 最近的点击记录，按时间倒序
    pub async fn get_recent_clicks(&self, url_id: i64, limit: u64) -> Result<Vec<UrlClick>> {
        let stmt = self.db.dialect().statement(
            "SELECT id, url_id, clicked_at, ip_address, user_agent, referrer FROM url_clicks \
             WHERE url_id = ? ORDER BY clicked_at DESC, id DESC LIMIT ?",
            vec![Value::from(url_id), Value::from(limit as i64)],
        );
        let conn = self.db.conn();
        let rows = with_retry("url.get_recent_clicks", self.db.retry_config(), || {
            ClickRow::find_by_statement(stmt.clone()).all(conn)
        })
        .await
        .map_err(|e| StashError::internal(format!("查询点击记录失败: {}", e)))?;

        Ok(rows.into_iter().map(UrlClick::from).collect())
    }

    pub async fn soft_delete(&self, id: i64) -> Result<()> {
        let stmt = self.db.dialect().statement(
            "UPDATE shortened_urls SET deleted_at = {now} WHERE id = ? AND (deleted_at IS NULL OR deleted_at > {now})",
            vec![Value::from(id)],
        );
        let affected = self.execute("url.soft_delete", stmt).await?;
        if affected == 0 {
            return Err(StashError::not_found("short url not found"));
        }
        Ok(())
    }

    async fn execute(&self, op: &str, stmt: sea_orm::Statement) -> Result<u64> {
        let conn = self.db.conn();
        let result = with_retry(op, self.db.retry_config(), || conn.execute_raw(stmt.clone()))
            .await
            .map_err(|e| {
                error!("Operation '{}' failed: {}", op, e);
                StashError::internal(format!("数据库操作失败: {}", e))
            })?;
        Ok(result.rows_affected())
    }
}
