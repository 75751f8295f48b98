use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::startup::BackgroundTasks;
use crate::storage::Database;

/// 单个任务超时时间（秒）
const TASK_TIMEOUT_SECS: u64 = 10;

/// 停止后台任务并关闭数据库连接
///
/// 顺序：先停清理任务，再排空计数队列，最后关闭连接池
pub async fn shutdown_background_tasks(tasks: BackgroundTasks, db: Database) {
    let task_timeout = Duration::from_secs(TASK_TIMEOUT_SECS);

    if let Some(sweeper) = tasks.sweeper {
        if timeout(task_timeout, sweeper.stop()).await.is_err() {
            error!("Expiry sweeper stop timed out after {} seconds", TASK_TIMEOUT_SECS);
        } else {
            info!("Expiry sweeper stopped");
        }
    }

    match timeout(task_timeout, tasks.counter.shutdown()).await {
        Ok(stats) => info!(
            applied = stats.applied,
            failed = stats.failed,
            "Counter queue drained"
        ),
        Err(_) => error!("Counter drain timed out after {} seconds", TASK_TIMEOUT_SECS),
    }

    if let Err(e) = db.close().await {
        warn!("Failed to close database connection: {}", e);
    }

    info!("Shutdown complete");
}
