use crate::domain::model::{EnhancedTerm, LanguageCode};
use crate::domain::ports::CacheStore;
use crate::utils::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);
pub const DEFAULT_NAMESPACE: &str = "web_enhancement";

/// 用語正規化：去除前後空白並轉小寫
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// 快取鍵：`{namespace}:{正規化用語}:{語言組合與版本的雜湊}`
///
/// 語言排序去重後才計算雜湊，因此請求語言的順序不影響鍵值。
pub fn cache_key(
    namespace: &str,
    term: &str,
    languages: &[LanguageCode],
    discriminator: Option<&str>,
) -> String {
    let mut codes: Vec<&str> = languages.iter().map(LanguageCode::as_str).collect();
    codes.sort_unstable();
    codes.dedup();

    let mut hasher = Sha256::new();
    hasher.update(codes.join(",").as_bytes());
    if let Some(tag) = discriminator {
        hasher.update(b"|");
        hasher.update(tag.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());

    format!("{}:{}:{}", namespace, normalize_term(term), &digest[..16])
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    pub hit_rate: f64,
    pub total_keys: usize,
}

/// Cache-aside 層：包裝外部儲存，負責鍵值推導、序列化與命中統計
///
/// 儲存錯誤一律降級為 cache miss（讀）或略過寫入（寫），不會中斷請求。
pub struct EnhancementCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    namespace: String,
    discriminator: Option<String>,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl EnhancementCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_TTL,
            namespace: DEFAULT_NAMESPACE.to_string(),
            discriminator: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_discriminator(mut self, discriminator: Option<String>) -> Self {
        self.discriminator = discriminator;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn key_for(&self, term: &str, languages: &[LanguageCode]) -> String {
        cache_key(&self.namespace, term, languages, self.discriminator.as_deref())
    }

    pub async fn get(&self, term: &str, languages: &[LanguageCode]) -> Option<EnhancedTerm> {
        let key = self.key_for(term, languages);

        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                tracing::warn!("⚠️ Cache read failed for '{}', treating as miss: {}", key, e);
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match serde_json::from_str::<EnhancedTerm>(&raw) {
            Ok(term) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(term)
            }
            Err(e) => {
                tracing::warn!("⚠️ Dropping unreadable cache entry '{}': {}", key, e);
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = self.store.delete(&key).await {
                    tracing::debug!("Cache delete failed for '{}': {}", key, e);
                }
                None
            }
        }
    }

    /// 寫入快取，回傳是否成功；last-writer-wins
    pub async fn put(&self, term: &EnhancedTerm, languages: &[LanguageCode]) -> bool {
        let key = self.key_for(term.term(), languages);

        let payload = match serde_json::to_string(term) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("⚠️ Could not serialize '{}' for cache: {}", term.term(), e);
                self.errors.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };

        match self.store.set(&key, payload, self.ttl).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("⚠️ Cache write failed for '{}': {}", key, e);
                self.errors.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub async fn contains(&self, term: &str, languages: &[LanguageCode]) -> Result<bool> {
        self.store.exists(&self.key_for(term, languages)).await
    }

    pub async fn invalidate(&self, term: &str, languages: &[LanguageCode]) -> Result<bool> {
        self.store.delete(&self.key_for(term, languages)).await
    }

    /// 依樣式清除；未指定時清除整個 namespace
    pub async fn clear(&self, pattern: Option<&str>) -> Result<usize> {
        let pattern = match pattern {
            Some(p) => p.to_string(),
            None => format!("{}:*", self.namespace),
        };
        let deleted = self.store.clear(&pattern).await?;
        tracing::info!("🧹 Cleared {} cache entries matching '{}'", deleted, pattern);
        Ok(deleted)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        Ok(CacheStats {
            hits,
            misses,
            errors: self.errors.load(Ordering::Relaxed),
            hit_rate,
            total_keys: self.store.key_count().await?,
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        self.store.ping().await
    }
}
