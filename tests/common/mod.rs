#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use term_enhancer::core::fallback::{FallbackChain, Tier, TierKind};
use term_enhancer::domain::ports::{CacheStore, EnhancementProvider};
use term_enhancer::utils::error::{EnhanceError, Result};
use term_enhancer::{EnhancedTerm, LanguageCode, TermInfo};

pub const LANGUAGES: [LanguageCode; 3] = [
    LanguageCode::Korean,
    LanguageCode::Japanese,
    LanguageCode::English,
];

pub fn term(name: &str) -> TermInfo {
    TermInfo::create(name, "entity", "general", None, vec![]).unwrap()
}

pub fn terms(n: usize) -> Vec<TermInfo> {
    (0..n).map(|i| term(&format!("term-{}", i))).collect()
}

/// 可控行為的測試供應商
pub struct MockProvider {
    name: String,
    fail_terms: Vec<String>,
    incomplete_terms: Vec<String>,
    with_sources: bool,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail_terms: Vec::new(),
            incomplete_terms: Vec::new(),
            with_sources: true,
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// batch 中含有這些用語時整批失敗
    pub fn failing_on(mut self, names: &[&str]) -> Self {
        self.fail_terms = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// 這些用語少回一個語言
    pub fn incomplete_on(mut self, names: &[&str]) -> Self {
        self.incomplete_terms = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn without_sources(mut self) -> Self {
        self.with_sources = false;
        self
    }

    pub fn delayed_on(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnhancementProvider for MockProvider {
    async fn enhance(&self, terms: &[TermInfo], languages: &[LanguageCode]) -> Result<Vec<EnhancedTerm>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .extend(terms.iter().map(|t| t.term().to_string()));

        let delay = terms
            .iter()
            .filter_map(|t| self.delays.get(t.term()))
            .max()
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if terms.iter().any(|t| self.fail_terms.iter().any(|f| f == t.term())) {
            return Err(EnhanceError::provider(&self.name, "rate limited"));
        }

        terms
            .iter()
            .map(|info| {
                let mut enhanced = EnhancedTerm::from_term_info(info, &self.name, 0.9)?;
                let skip_last = self.incomplete_terms.iter().any(|t| t == info.term());
                let count = if skip_last { languages.len() - 1 } else { languages.len() };
                for language in &languages[..count] {
                    enhanced.add_translation(*language, &format!("{}@{}", info.term(), language))?;
                }
                if self.with_sources {
                    enhanced.add_web_source(&format!("https://example.com/{}", info.term()))?;
                }
                Ok(enhanced)
            })
            .collect()
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

pub fn chain(tiers: Vec<(&str, TierKind, Arc<MockProvider>)>) -> FallbackChain {
    FallbackChain::new(
        tiers
            .into_iter()
            .map(|(name, kind, provider)| Tier::new(name, kind, provider))
            .collect(),
    )
    .unwrap()
}

/// 每個操作都失敗的快取儲存
pub struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(EnhanceError::cache("connection refused"))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Err(EnhanceError::cache("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(EnhanceError::cache("connection refused"))
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Err(EnhanceError::cache("connection refused"))
    }

    async fn clear(&self, _pattern: &str) -> Result<usize> {
        Err(EnhanceError::cache("connection refused"))
    }

    async fn key_count(&self) -> Result<usize> {
        Err(EnhanceError::cache("connection refused"))
    }

    async fn ping(&self) -> Result<()> {
        Err(EnhanceError::cache("connection refused"))
    }
}
