//! 内容存储（文件与笔记）
//!
//! 所有 SQL 以规范形式书写（`?` 占位符 + `{now}`），由 `Dialect` 改写后执行。

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbErr, FromQueryResult, TransactionTrait, Value,
};
use tracing::{debug, error, warn};

use super::connection::Database;
use super::dialect::Dialect;
use super::models::{Content, ContentKind, ContentPayload, ExpiredFile, NewContent};
use super::retry::{is_unique_violation, with_retry};
use crate::errors::{Result, StashError};

const CONTENT_COLUMNS: &str = "id, kind, title, filename, storage_path, size, body, created_at, expires_at, view_count, deleted_at";

const NOT_DELETED: &str = "(deleted_at IS NULL OR deleted_at > {now})";

#[derive(Debug, FromQueryResult)]
struct ContentRow {
    id: String,
    kind: String,
    title: Option<String>,
    filename: Option<String>,
    storage_path: Option<String>,
    size: Option<i64>,
    body: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    view_count: i64,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromQueryResult)]
struct ExpiredFileRow {
    id: String,
    storage_path: Option<String>,
}

#[derive(Debug, FromQueryResult)]
pub(crate) struct CountRow {
    pub(crate) total: i64,
}

impl TryFrom<ContentRow> for Content {
    type Error = StashError;

    /// 行数据必须与其 kind 匹配，否则拒绝转换
    fn try_from(row: ContentRow) -> Result<Self> {
        let kind: ContentKind = row.kind.parse().map_err(|_| {
            StashError::internal(format!("内容 {} 的类型无效: {}", row.id, row.kind))
        })?;

        let payload = match kind {
            ContentKind::File => match (row.filename, row.storage_path, row.size, row.body) {
                (Some(filename), Some(storage_path), Some(size), None) => ContentPayload::File {
                    filename,
                    storage_path,
                    size,
                },
                _ => {
                    return Err(StashError::internal(format!(
                        "内容 {} 标记为 file 但文件字段不完整",
                        row.id
                    )));
                }
            },
            ContentKind::Note => match (row.body, row.filename, row.storage_path) {
                (Some(body), None, None) => ContentPayload::Note {
                    title: row.title,
                    body,
                },
                _ => {
                    return Err(StashError::internal(format!(
                        "内容 {} 标记为 note 但字段不匹配",
                        row.id
                    )));
                }
            },
        };

        Ok(Content {
            id: row.id,
            payload,
            created_at: row.created_at,
            expires_at: row.expires_at,
            view_count: row.view_count,
            deleted_at: row.deleted_at,
        })
    }
}

/// 拆分载荷为列值：(title, filename, storage_path, size, body)
fn payload_values(payload: &ContentPayload) -> [Value; 5] {
    match payload {
        ContentPayload::File {
            filename,
            storage_path,
            size,
        } => [
            Value::from(None::<String>),
            Value::from(Some(filename.clone())),
            Value::from(Some(storage_path.clone())),
            Value::from(Some(*size)),
            Value::from(None::<String>),
        ],
        ContentPayload::Note { title, body } => [
            Value::from(title.clone()),
            Value::from(None::<String>),
            Value::from(None::<String>),
            Value::from(None::<i64>),
            Value::from(Some(body.clone())),
        ],
    }
}

async fn insert_content<C: ConnectionTrait>(
    conn: &C,
    dialect: &dyn Dialect,
    new: &NewContent,
) -> std::result::Result<(), DbErr> {
    let [title, filename, storage_path, size, body] = payload_values(&new.payload);
    let stmt = dialect.statement(
        "INSERT INTO content (id, kind, title, filename, storage_path, size, body, created_at, expires_at, view_count) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        vec![
            Value::from(new.id.clone()),
            Value::from(new.payload.kind().as_ref().to_string()),
            title,
            filename,
            storage_path,
            size,
            body,
            dialect.timestamp(new.created_at),
            dialect.timestamp(new.expires_at),
        ],
    );
    conn.execute_raw(stmt).await?;
    Ok(())
}

fn insert_error(id: &str, err: DbErr) -> StashError {
    if is_unique_violation(&err) {
        StashError::conflict(format!("content id {} already exists", id))
    } else {
        error!(content_id = %id, "Failed to insert content: {}", err);
        StashError::internal(format!("创建内容失败: {}", err))
    }
}

fn created(new: &NewContent) -> Content {
    Content {
        id: new.id.clone(),
        payload: new.payload.clone(),
        created_at: new.created_at,
        expires_at: new.expires_at,
        view_count: 0,
        deleted_at: None,
    }
}

/// 事务闭包返回的 future
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>;

#[derive(Clone)]
pub struct ContentStore {
    db: Database,
}

impl ContentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// 写入新内容，view_count 从 0 开始
    pub async fn create(&self, new: &NewContent) -> Result<Content> {
        let conn = self.db.conn();
        let dialect = self.db.dialect();
        with_retry("content.create", self.db.retry_config(), move || {
            insert_content(conn, dialect, new)
        })
        .await
        .map_err(|e| insert_error(&new.id, e))?;

        debug!(content_id = %new.id, kind = %new.payload.kind(), "Content row inserted");
        Ok(created(new))
    }

    /// 在给定事务内写入新内容（不重试）
    pub async fn create_in(&self, txn: &DatabaseTransaction, new: &NewContent) -> Result<Content> {
        insert_content(txn, self.db.dialect(), new)
            .await
            .map_err(|e| insert_error(&new.id, e))?;
        Ok(created(new))
    }

    async fn fetch_one(
        &self,
        op: &str,
        sql: &str,
        values: Vec<Value>,
    ) -> Result<Option<ContentRow>> {
        let stmt = self.db.dialect().statement(sql, values);
        let conn = self.db.conn();
        with_retry(op, self.db.retry_config(), || {
            ContentRow::find_by_statement(stmt.clone()).one(conn)
        })
        .await
        .map_err(|e| StashError::internal(format!("查询内容失败: {}", e)))
    }

    /// 按 ID 查找，不考虑过期和软删除状态（已被物理清除的记录返回 NotFound）
    pub async fn find_by_id(&self, id: &str) -> Result<Content> {
        let sql = format!("SELECT {} FROM content WHERE id = ?", CONTENT_COLUMNS);
        match self
            .fetch_one("content.find_by_id", &sql, vec![Value::from(id.to_string())])
            .await?
        {
            Some(row) => Content::try_from(row),
            None => Err(StashError::not_found("content not found")),
        }
    }

    /// 只返回未过期且未软删除的内容
    pub async fn find_active_by_id(&self, id: &str) -> Result<Content> {
        let sql = format!(
            "SELECT {} FROM content WHERE id = ? AND expires_at > {{now}} AND {}",
            CONTENT_COLUMNS, NOT_DELETED
        );
        match self
            .fetch_one(
                "content.find_active_by_id",
                &sql,
                vec![Value::from(id.to_string())],
            )
            .await?
        {
            Some(row) => Content::try_from(row),
            None => Err(StashError::not_found("content not found or expired")),
        }
    }

    /// ID 是否已被占用（包括已过期、已软删除的记录）
    pub async fn id_exists(&self, id: &str) -> Result<bool> {
        let stmt = self.db.dialect().statement(
            "SELECT COUNT(*) AS total FROM content WHERE id = ?",
            vec![Value::from(id.to_string())],
        );
        let conn = self.db.conn();
        let row = with_retry("content.id_exists", self.db.retry_config(), || {
            CountRow::find_by_statement(stmt.clone()).one(conn)
        })
        .await
        .map_err(|e| StashError::internal(format!("检查内容 ID 失败: {}", e)))?;

        Ok(row.is_some_and(|r| r.total > 0))
    }

    pub async fn increment_view_count(&self, id: &str) -> Result<()> {
        let stmt = self.db.dialect().statement(
            "UPDATE content SET view_count = view_count + 1 WHERE id = ?",
            vec![Value::from(id.to_string())],
        );
        self.execute("content.increment_view_count", stmt)
            .await
            .map(|_| ())
    }

    /// 未软删除的内容，按创建时间倒序；无法转换的行记录日志后跳过
    pub async fn list_all(&self) -> Result<Vec<Content>> {
        let sql = format!(
            "SELECT {} FROM content WHERE {} ORDER BY created_at DESC",
            CONTENT_COLUMNS, NOT_DELETED
        );
        let stmt = self.db.dialect().statement(&sql, vec![]);
        let conn = self.db.conn();
        let rows = with_retry("content.list_all", self.db.retry_config(), || {
            ContentRow::find_by_statement(stmt.clone()).all(conn)
        })
        .await
        .map_err(|e| StashError::internal(format!("获取内容列表失败: {}", e)))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match Content::try_from(row) {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!("Skipping malformed content row: {}", e);
                    None
                }
            })
            .collect())
    }

    /// `cutoff` 之前过期的文件内容（含已软删除的），供清理任务删除磁盘文件
    pub async fn find_expired_file_content(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ExpiredFile>> {
        let dialect = self.db.dialect();
        let stmt = dialect.statement(
            "SELECT id, storage_path FROM content WHERE expires_at < ? AND kind = ?",
            vec![
                dialect.timestamp(cutoff),
                Value::from(ContentKind::File.as_ref().to_string()),
            ],
        );
        let conn = self.db.conn();
        let rows = with_retry(
            "content.find_expired_file_content",
            self.db.retry_config(),
            || ExpiredFileRow::find_by_statement(stmt.clone()).all(conn),
        )
        .await
        .map_err(|e| StashError::internal(format!("查询过期文件失败: {}", e)))?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match row.storage_path {
                Some(storage_path) => Some(ExpiredFile {
                    id: row.id,
                    storage_path,
                }),
                None => {
                    warn!(content_id = %row.id, "Expired file row has no storage path");
                    None
                }
            })
            .collect())
    }

    /// 软删除：设置 deleted_at 为当前时间
    pub async fn soft_delete(&self, id: &str) -> Result<()> {
        let sql = format!(
            "UPDATE content SET deleted_at = {{now}} WHERE id = ? AND {}",
            NOT_DELETED
        );
        let stmt = self
            .db
            .dialect()
            .statement(&sql, vec![Value::from(id.to_string())]);
        let affected = self.execute("content.soft_delete", stmt).await?;
        if affected == 0 {
            return Err(StashError::not_found("content not found"));
        }
        Ok(())
    }

    /// 物理删除 `cutoff` 之前过期的记录，返回删除行数
    ///
    /// 调用方须与 `find_expired_file_content` 使用同一个 `cutoff`
    pub async fn delete_expired(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let dialect = self.db.dialect();
        let stmt = dialect.statement(
            "DELETE FROM content WHERE expires_at < ?",
            vec![dialect.timestamp(cutoff)],
        );
        self.execute("content.delete_expired", stmt).await
    }

    /// 在事务中执行闭包：Ok 提交，Err 回滚
    ///
    /// 闭包 panic 时事务随 `DatabaseTransaction` 一起被丢弃并回滚
    pub async fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> TxFuture<'c, T>,
    {
        let txn = self
            .db
            .conn()
            .begin()
            .await
            .map_err(|e| StashError::internal(format!("开启事务失败: {}", e)))?;

        match f(&txn).await {
            Ok(value) => {
                txn.commit()
                    .await
                    .map_err(|e| StashError::internal(format!("提交事务失败: {}", e)))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
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
