use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::StaticConfig;
use crate::services::{ContentLimits, ContentService, UrlService};
use crate::storage::{Database, FileStorage, Stores};
use crate::tasks::{CounterHandle, CounterUpdater, SweeperHandle};

/// 启动后常驻的后台任务
pub struct BackgroundTasks {
    pub(crate) counter: CounterHandle,
    pub(crate) sweeper: Option<SweeperHandle>,
}

pub struct StartupContext {
    pub database: Database,
    pub content_service: ContentService,
    pub url_service: UrlService,
    pub counters: CounterUpdater,
    pub tasks: BackgroundTasks,
}

impl StartupContext {
    /// 启动定时清理任务（重复调用无效果）
    pub fn start_sweeper(&mut self, period: Duration) {
        if self.tasks.sweeper.is_none() {
            let sweeper = self.content_service.sweeper();
            self.tasks.sweeper = Some(sweeper.spawn(period));
        }
    }
}

/// 准备运行所需的上下文
///
/// 数据库连接、迁移或上传目录创建失败都是致命错误
pub async fn prepare_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let database = Database::connect(&config.database)
        .await
        .context("Failed to initialize database")?;

    let files = FileStorage::new(&config.storage.upload_dir);
    files
        .ensure_root()
        .await
        .context("Failed to prepare upload directory")?;
    info!(upload_dir = %files.root().display(), "Upload directory ready");

    let stores = Stores::new(database.clone());
    let (counters, counter_handle) = CounterUpdater::spawn(
        Arc::new(stores.clone()),
        config.tasks.counter_queue_capacity,
    );

    let content_service = ContentService::new(
        stores.content.clone(),
        files,
        counters.clone(),
        ContentLimits::from(&config.storage),
    );
    let url_service = UrlService::new(
        stores.urls.clone(),
        counters.clone(),
        config.server.base_url.clone(),
    );

    info!("Pre-startup completed in {:?}", start_time.elapsed());

    Ok(StartupContext {
        database,
        content_service,
        url_service,
        counters,
        tasks: BackgroundTasks {
            counter: counter_handle,
            sweeper: None,
        },
    })
}
