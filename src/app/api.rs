use crate::adapters::providers::build_chain;
use crate::app::dto::{
    BatchPlan, ClearCacheResponse, EnhanceRequest, EnhanceResponse, HealthReport, HealthStatus,
};
use crate::config::toml_config::AppConfig;
use crate::core::cache::{CacheStats, EnhancementCache};
use crate::core::service::{EnhanceOptions, EnhancementService};
use crate::domain::model::LanguageCode;
use crate::domain::ports::CacheStore;
use crate::utils::error::{EnhanceError, Result};
use std::sync::Arc;

/// 傳輸層無關的對外介面：增強、快取管理與健康檢查
pub struct EnhancementApi {
    service: EnhancementService,
    defaults: EnhanceOptions,
    default_languages: Vec<LanguageCode>,
}

impl EnhancementApi {
    pub fn new(service: EnhancementService) -> Self {
        Self {
            service,
            defaults: EnhanceOptions::default(),
            default_languages: LanguageCode::ALL.to_vec(),
        }
    }

    pub fn with_defaults(mut self, defaults: EnhanceOptions, languages: Vec<LanguageCode>) -> Self {
        self.defaults = defaults;
        self.default_languages = languages;
        self
    }

    /// 依設定檔組裝完整服務；快取停用時不使用 `store`
    pub fn from_config(config: &AppConfig, store: Arc<dyn CacheStore>) -> Result<Self> {
        let chain = build_chain(config)?;

        let cache = config.cache.enabled.then(|| {
            Arc::new(
                EnhancementCache::new(store)
                    .with_ttl(config.cache_ttl())
                    .with_namespace(config.cache.namespace.clone())
                    .with_discriminator(config.cache.discriminator.clone()),
            )
        });

        let service = EnhancementService::new(chain, cache).with_limits(config.service_limits());
        Ok(Self::new(service).with_defaults(
            config.default_options(),
            config.service.default_languages.clone(),
        ))
    }

    pub fn service(&self) -> &EnhancementService {
        &self.service
    }

    pub async fn enhance(&self, request: &EnhanceRequest) -> Result<EnhanceResponse> {
        let terms = request.to_term_infos()?;
        let languages = request.languages(&self.default_languages)?;
        let options = request.options(self.defaults);

        let outcome = self.service.enhance(&terms, &languages, options).await?;
        Ok(EnhanceResponse::from_outcome(terms.len(), &outcome))
    }

    /// 只驗證請求並計算分批計畫，不呼叫供應商
    pub fn plan(&self, request: &EnhanceRequest) -> Result<BatchPlan> {
        let terms = request.to_term_infos()?;
        let languages = request.languages(&self.default_languages)?;
        let options = request.options(self.defaults);
        self.service.validate_request(&terms, &languages, &options)?;

        Ok(BatchPlan::new(terms.len(), languages, &options))
    }

    fn cache(&self) -> Result<&EnhancementCache> {
        self.service.cache().map(Arc::as_ref).ok_or_else(|| EnhanceError::Config {
            message: "cache is disabled".to_string(),
        })
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.cache()?.stats().await
    }

    pub async fn clear_cache(&self, pattern: Option<&str>) -> Result<ClearCacheResponse> {
        let cache = self.cache()?;
        let pattern = pattern
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}:*", cache.namespace()));
        let deleted_keys = cache.clear(Some(&pattern)).await?;
        Ok(ClearCacheResponse {
            pattern,
            deleted_keys,
        })
    }

    /// 刪除單一用語在指定語言組合下的快取
    pub async fn invalidate(&self, term: &str, languages: &[LanguageCode]) -> Result<bool> {
        let languages = if languages.is_empty() {
            self.default_languages.as_slice()
        } else {
            languages
        };
        self.cache()?.invalidate(term, languages).await
    }

    pub async fn health_check(&self) -> HealthReport {
        let chain = self.service.chain();
        let enabled_tiers = chain
            .tiers()
            .iter()
            .filter(|tier| tier.is_enabled())
            .map(|tier| tier.name().to_string())
            .collect();
        let disabled_tiers = chain
            .disabled_tiers()
            .into_iter()
            .map(str::to_string)
            .collect();

        let (status, cache, cache_error) = match self.service.cache() {
            None => (HealthStatus::Healthy, "disabled".to_string(), None),
            Some(cache) => match cache.health_check().await {
                Ok(()) => (HealthStatus::Healthy, "connected".to_string(), None),
                Err(e) => {
                    tracing::warn!("⚠️ Cache store did not answer ping: {}", e);
                    (
                        HealthStatus::Degraded,
                        "disconnected".to_string(),
                        Some(e.to_string()),
                    )
                }
            },
        };

        HealthReport {
            status,
            cache,
            cache_error,
            enabled_tiers,
            disabled_tiers,
        }
    }
}
