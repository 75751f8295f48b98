//! 过期内容清理任务
//!
//! 每轮先删除过期文件的磁盘数据，再批量物理删除过期记录。
//! 单个文件删除失败只记录日志，不会中断本轮清理。

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::storage::files::{FileStorage, RemoveOutcome};
use crate::storage::ContentStore;

/// 单轮清理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub expired_files: usize,
    pub files_removed: usize,
    pub files_missing: usize,
    pub file_errors: usize,
    pub records_deleted: u64,
}

#[derive(Clone)]
pub struct ExpirySweeper {
    content: ContentStore,
    files: FileStorage,
}

impl ExpirySweeper {
    pub fn new(content: ContentStore, files: FileStorage) -> Self {
        Self { content, files }
    }

    /// 执行一轮清理
    ///
    /// 查询过期文件失败时本轮直接返回错误，不删除任何记录
    pub async fn run_once(&self) -> Result<SweepReport> {
        self.run_once_at(Utc::now()).await
    }

    /// 以 `cutoff` 为界执行一轮清理
    ///
    /// 两次查询共用同一个 `cutoff`，之后才过期的记录留给下一轮
    pub async fn run_once_at(&self, cutoff: DateTime<Utc>) -> Result<SweepReport> {
        let expired = self.content.find_expired_file_content(cutoff).await?;
        let mut report = SweepReport {
            expired_files: expired.len(),
            ..Default::default()
        };

        for file in &expired {
            match self.files.remove(Path::new(&file.storage_path)).await {
                Ok(RemoveOutcome::Removed) => report.files_removed += 1,
                Ok(RemoveOutcome::Missing) => {
                    debug!(content_id = %file.id, path = %file.storage_path, "Expired file already gone");
                    report.files_missing += 1;
                }
                Err(e) => {
                    error!(content_id = %file.id, path = %file.storage_path, "Failed to delete expired file: {}", e);
                    report.file_errors += 1;
                }
            }
        }

        report.records_deleted = match self.content.delete_expired(cutoff).await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!(
                    expired_files = report.expired_files,
                    files_removed = report.files_removed,
                    files_missing = report.files_missing,
                    file_errors = report.file_errors,
                    "Failed to delete expired records after file cleanup: {}",
                    e
                );
                return Err(e);
            }
        };

        info!(
            expired_files = report.expired_files,
            files_removed = report.files_removed,
            files_missing = report.files_missing,
            file_errors = report.file_errors,
            records_deleted = report.records_deleted,
            "Expired content sweep completed"
        );

        Ok(report)
    }

    /// 启动定时清理任务，第一次执行在一个周期之后
    pub fn spawn(self, period: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once().await {
                            warn!("Expired content sweep failed: {}", e);
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Expiry sweeper stopped");
        });

        info!(interval_secs = period.as_secs(), "Expiry sweeper started");
        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// 清理任务句柄
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// 通知任务停止并等待退出
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Expiry sweeper terminated abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
