//! 短标识生成
//!
//! - 内容 ID：8 位，来自加密安全随机数，base64url 编码后只保留字母数字
//! - 短链接代码：6 位 base62
//!
//! 生成器本身不保证唯一，唯一性由 `ensure_unique` 结合存储层检查完成。

use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use tracing::{debug, warn};

use crate::errors::{Result, StashError};

pub const CONTENT_ID_LENGTH: usize = 8;
pub const SHORT_CODE_LENGTH: usize = 6;
pub const MAX_ATTEMPTS: usize = 5;

pub const ALIAS_MIN_LENGTH: usize = 3;
pub const ALIAS_MAX_LENGTH: usize = 20;

const BASE62_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// 生成 8 位内容 ID
///
/// 每轮取 8 个随机字节做 base64url 编码（11 个字符），过滤掉 `-` 和 `_`。
/// 剩余不足 8 位时重新抽取，不做填充。
pub fn generate_content_id() -> String {
    let mut rng = rand::rng();
    loop {
        let mut bytes = [0u8; 8];
        rng.fill(&mut bytes);

        let id: String = URL_SAFE_NO_PAD
            .encode(bytes)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(CONTENT_ID_LENGTH)
            .collect();

        if id.len() == CONTENT_ID_LENGTH {
            return id;
        }
    }
}

/// 生成 6 位 base62 短链接代码
pub fn generate_short_code() -> String {
    std::iter::repeat_with(|| BASE62_CHARS[rand::random_range(0..BASE62_CHARS.len())] as char)
        .take(SHORT_CODE_LENGTH)
        .collect()
}

/// 校验自定义别名：3-20 位 ASCII 字母数字
pub fn validate_custom_alias(alias: &str) -> Result<()> {
    if alias.len() < ALIAS_MIN_LENGTH || alias.len() > ALIAS_MAX_LENGTH {
        return Err(StashError::bad_request(format!(
            "custom alias must be {}-{} characters",
            ALIAS_MIN_LENGTH, ALIAS_MAX_LENGTH
        )));
    }
    if !alias.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StashError::bad_request("custom alias must be alphanumeric"));
    }
    Ok(())
}

/// 生成一个存储中尚不存在的标识
///
/// 生成 → 检查 → 最多重试 `max_attempts` 次。检查与后续插入之间
/// 不是原子的，插入时的唯一约束冲突由调用方处理。
pub async fn ensure_unique<G, E, Fut>(
    kind: &str,
    mut generate: G,
    mut exists: E,
    max_attempts: usize,
) -> Result<String>
where
    G: FnMut() -> String,
    E: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    for attempt in 1..=max_attempts {
        let candidate = generate();
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        debug!(kind, attempt, candidate = %candidate, "Identifier collision, retrying");
    }

    warn!(kind, max_attempts, "Identifier generation exhausted retry budget");
    Err(StashError::internal(format!(
        "failed to generate unique {} after retries",
        kind
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_content_id_shape() {
        for _ in 0..500 {
            let id = generate_content_id();
            assert_eq!(id.len(), CONTENT_ID_LENGTH);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()), "{}", id);
        }
    }

    #[test]
    fn test_short_code_shape() {
        for _ in 0..500 {
            let code = generate_short_code();
            assert_eq!(code.len(), SHORT_CODE_LENGTH);
            assert!(code.bytes().all(|b| BASE62_CHARS.contains(&b)), "{}", code);
        }
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_content_id()).collect();
        assert!(ids.len() > 990);
    }

    #[test]
    fn test_validate_custom_alias() {
        assert!(validate_custom_alias("abc").is_ok());
        assert!(validate_custom_alias("Promo2026").is_ok());
        assert!(validate_custom_alias(&"a".repeat(20)).is_ok());

        assert!(matches!(
            validate_custom_alias("ab"),
            Err(StashError::BadRequest(_))
        ));
        assert!(matches!(
            validate_custom_alias(&"a".repeat(21)),
            Err(StashError::BadRequest(_))
        ));
        assert!(matches!(
            validate_custom_alias("my-link"),
            Err(StashError::BadRequest(_))
        ));
        assert!(matches!(
            validate_custom_alias("café1"),
            Err(StashError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_unique_retries_on_collision() {
        let calls = AtomicUsize::new(0);
        let result = ensure_unique(
            "id",
            || format!("cand{}", calls.fetch_add(1, Ordering::SeqCst)),
            |candidate| async move { Ok(candidate != "cand2") },
            MAX_ATTEMPTS,
        )
        .await
        .unwrap();

        assert_eq!(result, "cand2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_ensure_unique_exhausted() {
        let calls = AtomicUsize::new(0);
        let result = ensure_unique(
            "short code",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                "taken".to_string()
            },
            |_| async { Ok(true) },
            MAX_ATTEMPTS,
        )
        .await;

        assert!(matches!(result, Err(StashError::Internal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_ensure_unique_propagates_probe_error() {
        let result = ensure_unique(
            "id",
            generate_content_id,
            |_| async { Err(StashError::internal("db down")) },
            MAX_ATTEMPTS,
        )
        .await;

        assert!(matches!(result, Err(StashError::Internal(msg)) if msg == "db down"));
    }
}
