use crate::domain::model::{EnhancedTerm, LanguageCode, TermInfo};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 外部推論服務的統一介面，每個廠商一個實作
///
/// 必須為每個輸入用語回傳恰好一個結果且順序一致，
/// 否則回傳單一錯誤（不允許部分成功）。
#[async_trait]
pub trait EnhancementProvider: Send + Sync {
    async fn enhance(
        &self,
        terms: &[TermInfo],
        languages: &[LanguageCode],
    ) -> Result<Vec<EnhancedTerm>>;

    fn source_name(&self) -> &str;
}

/// 快取儲存後端（Redis 或記憶體），值為序列化後的字串
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn exists(&self, key: &str) -> Result<bool>;
    /// 依 glob 樣式（`*`）刪除，回傳刪除數量
    async fn clear(&self, pattern: &str) -> Result<usize>;
    async fn key_count(&self) -> Result<usize>;
    async fn ping(&self) -> Result<()>;
}
