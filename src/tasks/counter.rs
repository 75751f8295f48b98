//! 计数更新器
//!
//! 请求路径只做 `try_send`，永不阻塞也不失败；独立的 worker 任务逐条写入存储。
//! 队列满或已关闭时事件被丢弃并记录日志。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::storage::models::ClickMeta;

/// 待写入的计数事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterEvent {
    View { content_id: String },
    Click { url_id: i64, meta: ClickMeta },
}

/// 计数写入目标
#[async_trait::async_trait]
pub trait CounterSink: Send + Sync {
    async fn record_view(&self, content_id: &str) -> anyhow::Result<()>;

    async fn record_click(&self, url_id: i64, meta: &ClickMeta) -> anyhow::Result<()>;
}

/// worker 退出时的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterStats {
    pub applied: u64,
    pub failed: u64,
}

/// 计数事件发送端，克隆开销很小
#[derive(Clone)]
pub struct CounterUpdater {
    tx: mpsc::Sender<CounterEvent>,
    dropped: Arc<AtomicU64>,
}

/// worker 任务句柄
pub struct CounterHandle {
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<CounterStats>,
}

impl CounterUpdater {
    /// 启动 worker 任务，返回发送端和任务句柄
    pub fn spawn(sink: Arc<dyn CounterSink>, capacity: usize) -> (Self, CounterHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = tokio::spawn(run_worker(sink, rx, shutdown_rx));
        debug!(capacity, "Counter updater started");

        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            CounterHandle {
                shutdown: shutdown_tx,
                worker,
            },
        )
    }

    pub fn record_view(&self, content_id: &str) {
        self.enqueue(CounterEvent::View {
            content_id: content_id.to_string(),
        });
    }

    pub fn record_click(&self, url_id: i64, meta: ClickMeta) {
        self.enqueue(CounterEvent::Click { url_id, meta });
    }

    fn enqueue(&self, event: CounterEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(?event, "Counter queue full, dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(?event, "Counter queue closed, dropping event");
            }
        }
    }

    /// 被丢弃的事件数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl CounterHandle {
    /// 关闭队列并处理完剩余事件后返回
    pub async fn shutdown(self) -> CounterStats {
        let _ = self.shutdown.send(());
        match self.worker.await {
            Ok(stats) => {
                info!(
                    applied = stats.applied,
                    failed = stats.failed,
                    "Counter updater drained"
                );
                stats
            }
            Err(e) => {
                warn!("Counter worker terminated abnormally: {}", e);
                CounterStats::default()
            }
        }
    }
}

async fn run_worker(
    sink: Arc<dyn CounterSink>,
    mut rx: mpsc::Receiver<CounterEvent>,
    mut shutdown: oneshot::Receiver<()>,
) -> CounterStats {
    let mut stats = CounterStats::default();

    loop {
        tokio::select! {
            biased;
            // 句柄被 drop 时同样视为关闭
            _ = &mut shutdown => {
                rx.close();
                while let Some(event) = rx.recv().await {
                    apply(sink.as_ref(), event, &mut stats).await;
                }
                break;
            }
            event = rx.recv() => match event {
                Some(event) => apply(sink.as_ref(), event, &mut stats).await,
                None => break,
            },
        }
    }

    stats
}

async fn apply(sink: &dyn CounterSink, event: CounterEvent, stats: &mut CounterStats) {
    let result = match &event {
        CounterEvent::View { content_id } => sink.record_view(content_id).await,
        CounterEvent::Click { url_id, meta } => sink.record_click(*url_id, meta).await,
    };

    match result {
        Ok(()) => {
            stats.applied += 1;
            trace!(?event, "Counter event applied");
        }
        Err(e) => {
            stats.failed += 1;
            warn!(?event, "Failed to apply counter event: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingSink {
        views: Mutex<Vec<String>>,
        clicks: Mutex<Vec<i64>>,
        delay: Option<Duration>,
        fail_views: bool,
    }

    #[async_trait::async_trait]
    impl CounterSink for RecordingSink {
        async fn record_view(&self, content_id: &str) -> anyhow::Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_views {
                anyhow::bail!("view write failed");
            }
            self.views.lock().unwrap().push(content_id.to_string());
            Ok(())
        }

        async fn record_click(&self, url_id: i64, _meta: &ClickMeta) -> anyhow::Result<()> {
            self.clicks.lock().unwrap().push(url_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_events_are_applied_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let (updater, handle) = CounterUpdater::spawn(sink.clone(), 16);

        updater.record_view("aaaa1111");
        updater.record_click(7, ClickMeta::default());
        updater.record_view("bbbb2222");

        let stats = handle.shutdown().await;
        assert_eq!(stats.applied, 3);
        assert_eq!(*sink.views.lock().unwrap(), vec!["aaaa1111", "bbbb2222"]);
        assert_eq!(*sink.clicks.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let sink = Arc::new(RecordingSink {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        });
        let (updater, handle) = CounterUpdater::spawn(sink.clone(), 1);

        for _ in 0..20 {
            updater.record_view("hot00000");
        }
        assert!(updater.dropped() > 0);

        let stats = handle.shutdown().await;
        assert_eq!(stats.applied + updater.dropped(), 20);
    }

    #[tokio::test]
    async fn test_shutdown_drains_pending_events() {
        let sink = Arc::new(RecordingSink {
            delay: Some(Duration::from_millis(5)),
            ..Default::default()
        });
        let (updater, handle) = CounterUpdater::spawn(sink.clone(), 64);

        for i in 0..10 {
            updater.record_view(&format!("id{:06}", i));
        }
        let stats = handle.shutdown().await;

        assert_eq!(stats.applied, 10);
        assert_eq!(sink.views.lock().unwrap().len(), 10);

        // 关闭后的事件直接丢弃
        updater.record_view("late0000");
        assert_eq!(updater.dropped(), 1);
    }

    #[tokio::test]
    async fn test_sink_failures_are_counted() {
        let sink = Arc::new(RecordingSink {
            fail_views: true,
            ..Default::default()
        });
        let (updater, handle) = CounterUpdater::spawn(sink, 8);

        updater.record_view("broken00");
        updater.record_click(1, ClickMeta::default());

        let stats = handle.shutdown().await;
        assert_eq!(stats, CounterStats { applied: 1, failed: 1 });
    }
}
