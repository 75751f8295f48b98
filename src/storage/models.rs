//! 存储层领域模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// 记录的生命周期状态
///
/// 物理删除只发生在 `Expired` 之后（清理任务按 `expires_at < now` 删除），
/// 因此已清除的记录必然曾经过期或被软删除。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    SoftDeleted { at: DateTime<Utc> },
    Expired { at: DateTime<Utc> },
}

impl Lifecycle {
    /// 软删除优先于过期：既被软删除又已过期的记录报告为 `SoftDeleted`
    pub fn evaluate(
        deleted_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if let Some(at) = deleted_at
            && at <= now
        {
            return Lifecycle::SoftDeleted { at };
        }
        if let Some(at) = expires_at
            && at <= now
        {
            return Lifecycle::Expired { at };
        }
        Lifecycle::Active
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContentKind {
    File,
    Note,
}

/// 按类型区分的内容载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPayload {
    File {
        filename: String,
        storage_path: String,
        size: i64,
    },
    Note {
        title: Option<String>,
        body: String,
    },
}

impl ContentPayload {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentPayload::File { .. } => ContentKind::File,
            ContentPayload::Note { .. } => ContentKind::Note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub id: String,
    pub payload: ContentPayload,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub view_count: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }

    pub fn lifecycle(&self, now: DateTime<Utc>) -> Lifecycle {
        Lifecycle::evaluate(self.deleted_at, Some(self.expires_at), now)
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.lifecycle(now).is_active()
    }
}

/// 待写入的内容
#[derive(Debug, Clone)]
pub struct NewContent {
    pub id: String,
    pub payload: ContentPayload,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewContent {
    pub fn new(id: String, payload: ContentPayload, retention: chrono::Duration) -> Self {
        let created_at = Utc::now();
        Self {
            id,
            payload,
            created_at,
            expires_at: created_at + retention,
        }
    }
}

/// 清理任务需要的过期文件信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredFile {
    pub id: String,
    pub storage_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortenedUrl {
    pub id: i64,
    pub short_code: String,
    pub original_url: String,
    pub custom_alias: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub click_count: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortenedUrl {
    /// `expires_at` 为空表示永不过期
    pub fn lifecycle(&self, now: DateTime<Utc>) -> Lifecycle {
        Lifecycle::evaluate(self.deleted_at, self.expires_at, now)
    }
}

#[derive(Debug, Clone)]
pub struct NewShortenedUrl {
    pub short_code: String,
    pub original_url: String,
    pub custom_alias: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 点击来源信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlClick {
    pub id: i64,
    pub url_id: i64,
    pub clicked_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewClick {
    pub url_id: i64,
    pub meta: ClickMeta,
}
