//! URL shortener service
//!
//! Validates targets, allocates short codes (generated or custom alias),
//! resolves redirects and reports click statistics.

use chrono::Utc;
use tracing::{info, warn};

use crate::errors::{Result, StashError};
use crate::storage::{ClickMeta, NewShortenedUrl, ShortenedUrl, UrlClick, UrlStore};
use crate::utils::url_validator::validate_target_url;
use crate::utils::{MAX_ATTEMPTS, ensure_unique, generate_short_code, validate_custom_alias};

/// Number of click records returned with URL statistics
pub const RECENT_CLICKS_LIMIT: u64 = 100;

// ============ Request/Response DTOs ============

#[derive(Debug, Clone, Default)]
pub struct ShortenRequest {
    pub url: String,
    pub custom_alias: Option<String>,
    /// Lifetime in days; ignored unless positive
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UrlStats {
    pub url: ShortenedUrl,
    pub recent_clicks: Vec<UrlClick>,
}

// ============ Service ============

#[derive(Clone)]
pub struct UrlService {
    store: UrlStore,
    counters: crate::tasks::CounterUpdater,
    base_url: String,
}

impl UrlService {
    pub fn new(
        store: UrlStore,
        counters: crate::tasks::CounterUpdater,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            counters,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public short URL for a code
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/s/{}", self.base_url, code)
    }

    pub async fn shorten(&self, req: ShortenRequest) -> Result<ShortenedUrl> {
        let original_url = req.url.trim().to_string();
        validate_target_url(&original_url)?;

        let expires_at = match req.expires_in_days.filter(|days| *days > 0) {
            Some(days) => Some(
                chrono::Duration::try_days(days)
                    .and_then(|d| Utc::now().checked_add_signed(d))
                    .ok_or_else(|| StashError::bad_request("expiresIn is out of range"))?,
            ),
            None => None,
        };

        let custom_alias = req.custom_alias.filter(|a| !a.is_empty());

        let url = match custom_alias {
            Some(alias) => {
                validate_custom_alias(&alias)?;
                if self.store.short_code_exists(&alias).await? {
                    return Err(StashError::conflict("custom alias already taken"));
                }
                let new = NewShortenedUrl {
                    short_code: alias.clone(),
                    original_url,
                    custom_alias: Some(alias),
                    expires_at,
                };
                // 检查之后被并发抢占同样报冲突
                self.store.create(&new).await.map_err(|e| match e {
                    StashError::Conflict(_) => StashError::conflict("custom alias already taken"),
                    other => other,
                })?
            }
            None => self.create_with_generated_code(original_url, expires_at).await?,
        };

        info!(
            short_code = %url.short_code,
            custom = url.custom_alias.is_some(),
            "Short url created"
        );
        Ok(url)
    }

    async fn create_with_generated_code(
        &self,
        original_url: String,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> Result<ShortenedUrl> {
        for attempt in 1..=MAX_ATTEMPTS {
            let code = ensure_unique(
                "short code",
                generate_short_code,
                |candidate| async move { self.store.short_code_exists(&candidate).await },
                MAX_ATTEMPTS,
            )
            .await?;

            let new = NewShortenedUrl {
                short_code: code,
                original_url: original_url.clone(),
                custom_alias: None,
                expires_at,
            };
            match self.store.create(&new).await {
                Err(StashError::Conflict(msg)) => {
                    warn!(attempt, "Short code taken at insert time: {}", msg);
                }
                other => return other,
            }
        }

        Err(StashError::internal(
            "failed to generate unique short code after retries",
        ))
    }

    /// Resolve an active short code to its target and schedule click recording
    pub async fn redirect(&self, code: &str, meta: ClickMeta) -> Result<String> {
        let url = self.store.find_active_by_short_code(code).await?;
        self.counters.record_click(url.id, meta);
        Ok(url.original_url)
    }

    /// Statistics for a short code; click history failures degrade to an empty list
    pub async fn stats(&self, code: &str) -> Result<UrlStats> {
        let url = self.store.find_by_short_code(code).await?;
        let recent_clicks = match self
            .store
            .get_recent_clicks(url.id, RECENT_CLICKS_LIMIT)
            .await
        {
            Ok(clicks) => clicks,
            Err(e) => {
                warn!(short_code = %code, "Failed to load recent clicks: {}", e);
                Vec::new()
            }
        };
        Ok(UrlStats { url, recent_clicks })
    }

    pub async fn delete(&self, code: &str) -> Result<()> {
        let url = self.store.find_by_short_code(code).await?;
        self.store.soft_delete(url.id).await?;
        info!(short_code = %code, "Short url soft-deleted");
        Ok(())
    }
}
