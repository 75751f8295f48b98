use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tracing::{debug, info};

use super::dialect::{Dialect, dialect_for_url};
use super::retry::RetryConfig;
use crate::config::DatabaseConfig;
use crate::errors::{Result, StashError};
use migration::{Migrator, MigratorTrait};

/// 连接 SQLite 数据库（带自动创建和性能优化）
pub async fn connect_sqlite(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    use sea_orm::SqlxSqliteConnector;
    use sea_orm::sqlx::sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
    };

    let opt = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| StashError::database_config(format!("SQLite URL 解析失败: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true)
        .pragma("cache_size", "-64000")
        .pragma("temp_store", "memory");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(8))
        .max_lifetime(None)
        .connect_with(opt)
        .await
        .map_err(|e| {
            StashError::database_connection(format!("无法连接到 SQLite 数据库: {}", e))
        })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接 PostgreSQL 数据库
pub async fn connect_postgres(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    use sea_orm::SqlxPostgresConnector;
    use sea_orm::sqlx::postgres::{PgConnectOptions, PgPoolOptions};

    let opt = PgConnectOptions::from_str(&config.database_url)
        .map_err(|e| StashError::database_config(format!("PostgreSQL URL 解析失败: {}", e)))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(None)
        .connect_with(opt)
        .await
        .map_err(|e| {
            StashError::database_connection(format!("无法连接到 POSTGRES 数据库: {}", e))
        })?;

    Ok(SqlxPostgresConnector::from_sqlx_postgres_pool(pool))
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| StashError::database_connection(format!("迁移失败: {}", e)))?;

    info!("Database migrations completed");
    Ok(())
}

/// 共享的数据库句柄
///
/// 连接池、方言和重试策略打包在一起，由各个 Store 克隆持有
#[derive(Clone)]
pub struct Database {
    conn: DatabaseConnection,
    dialect: Arc<dyn Dialect>,
    retry: RetryConfig,
}

impl Database {
    /// 连接数据库并执行迁移，任一步失败都返回错误
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.database_url.is_empty() {
            return Err(StashError::database_config("DATABASE_URL 未设置"));
        }

        let dialect = dialect_for_url(&config.database_url)?;
        debug!("Connecting to {} database", dialect.name());

        let conn = match dialect.name() {
            "postgres" => connect_postgres(config).await?,
            _ => connect_sqlite(config).await?,
        };

        run_migrations(&conn).await?;

        info!(
            backend = dialect.name(),
            max_connections = config.max_connections,
            "{} storage initialized",
            dialect.name().to_uppercase()
        );

        Ok(Self {
            conn,
            dialect,
            retry: RetryConfig::from(config),
        })
    }

    pub fn from_parts(conn: DatabaseConnection, dialect: Arc<dyn Dialect>, retry: RetryConfig) -> Self {
        Self {
            conn,
            dialect,
            retry,
        }
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    /// 健康检查
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .ping()
            .await
            .map_err(|e| StashError::database_connection(format!("数据库不可用: {}", e)))
    }

    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| StashError::database_connection(format!("关闭数据库连接失败: {}", e)))
    }
}
