use crate::domain::ports::CacheStore;
use crate::utils::error::{EnhanceError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: String,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// 記憶體快取：每次讀取時檢查 TTL，過期項目延遲刪除
///
/// 行程重啟後資料即消失，正式環境請換成 Redis 之類的外部儲存。
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 將 `*` glob 轉成錨定的正規表達式
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let escaped = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", escaped))
        .map_err(|e| EnhanceError::cache(format!("invalid pattern '{}': {}", pattern, e)))
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // 取得寫鎖前可能已被覆寫，再檢查一次
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            tracing::debug!("Cache entry '{}' expired", key);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn clear(&self, pattern: &str) -> Result<usize> {
        let matcher = glob_to_regex(pattern)?;
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !matcher.is_match(key));
        Ok(before - entries.len())
    }

    async fn key_count(&self) -> Result<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(entries.len())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
