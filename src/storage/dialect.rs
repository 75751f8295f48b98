//! SQL dialect abstraction
//!
//! Stores write every query once, in a canonical form:
//! - `?` positional placeholders
//! - the `{now}` token wherever the current database time is needed
//!
//! A `Dialect` rewrites that canonical SQL for its backend and encodes
//! timestamps so that comparisons against `{now}` behave the same on
//! SQLite and PostgreSQL.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{DbBackend, Statement, Value};

use crate::errors::{Result, StashError};

/// 当前时间占位符
pub const NOW_TOKEN: &str = "{now}";

/// SQLite 时间戳文本格式，与 `strftime('%Y-%m-%d %H:%M:%f', 'now')` 一致，可按字典序比较
pub const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn backend(&self) -> DbBackend;

    /// 第 `index` 个参数的占位符（从 1 开始）
    fn placeholder(&self, index: usize) -> String;

    /// 数据库端当前时间表达式
    fn now(&self) -> &'static str;

    /// 绑定时间参数
    fn timestamp(&self, value: DateTime<Utc>) -> Value;

    /// 绑定可空时间参数（NULL 也需要带上正确的类型）
    fn optional_timestamp(&self, value: Option<DateTime<Utc>>) -> Value;

    fn supports_returning(&self) -> bool;

    /// 改写规范 SQL：替换单引号字面量之外的 `?` 和 `{now}`
    fn rebind(&self, sql: &str) -> String {
        let mut out = String::with_capacity(sql.len() + 32);
        let mut index = 0;
        let mut in_literal = false;
        let mut rest = sql;

        while let Some(ch) = rest.chars().next() {
            if !in_literal && let Some(tail) = rest.strip_prefix(NOW_TOKEN) {
                out.push_str(self.now());
                rest = tail;
                continue;
            }

            match ch {
                '\'' => {
                    in_literal = !in_literal;
                    out.push(ch);
                }
                '?' if !in_literal => {
                    index += 1;
                    out.push_str(&self.placeholder(index));
                }
                _ => out.push(ch),
            }
            rest = &rest[ch.len_utf8()..];
        }

        out
    }

    fn statement(&self, sql: &str, values: Vec<Value>) -> Statement {
        Statement::from_sql_and_values(self.backend(), self.rebind(sql), values)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn backend(&self) -> DbBackend {
        DbBackend::Sqlite
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn now(&self) -> &'static str {
        "strftime('%Y-%m-%d %H:%M:%f', 'now')"
    }

    fn timestamp(&self, value: DateTime<Utc>) -> Value {
        Value::from(value.format(SQLITE_TIMESTAMP_FORMAT).to_string())
    }

    fn optional_timestamp(&self, value: Option<DateTime<Utc>>) -> Value {
        Value::from(value.map(|v| v.format(SQLITE_TIMESTAMP_FORMAT).to_string()))
    }

    fn supports_returning(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn backend(&self) -> DbBackend {
        DbBackend::Postgres
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn now(&self) -> &'static str {
        "NOW()"
    }

    fn timestamp(&self, value: DateTime<Utc>) -> Value {
        Value::from(value)
    }

    fn optional_timestamp(&self, value: Option<DateTime<Utc>>) -> Value {
        Value::from(value)
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<&'static str> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite")
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")
    {
        Ok("postgres")
    } else {
        Err(StashError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, postgres://",
            database_url
        )))
    }
}

/// 根据数据库 URL 选择方言实现
pub fn dialect_for_url(database_url: &str) -> Result<Arc<dyn Dialect>> {
    match infer_backend_from_url(database_url)? {
        "postgres" => Ok(Arc::new(PostgresDialect)),
        _ => Ok(Arc::new(SqliteDialect)),
    }
}
