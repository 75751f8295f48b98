use anyhow::Context;

use super::Stores;
use super::models::{ClickMeta, NewClick};
use crate::tasks::CounterSink;

#[async_trait::async_trait]
impl CounterSink for Stores {
    async fn record_view(&self, content_id: &str) -> anyhow::Result<()> {
        self.content
            .increment_view_count(content_id)
            .await
            .with_context(|| format!("increment view count for {}", content_id))
    }

    /// 先追加点击明细再累加计数，两步互不影响
    async fn record_click(&self, url_id: i64, meta: &ClickMeta) -> anyhow::Result<()> {
        let logged = self
            .urls
            .record_click(&NewClick {
                url_id,
                meta: meta.clone(),
            })
            .await;

        self.urls
            .increment_click_count(url_id)
            .await
            .with_context(|| format!("increment click count for url {}", url_id))?;

        logged.with_context(|| format!("record click for url {}", url_id))
    }
}
