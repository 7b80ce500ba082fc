use crate::core::fallback::TierKind;
use crate::core::service::{EnhanceOptions, ServiceLimits};
use crate::domain::model::LanguageCode;
use crate::utils::error::{EnhanceError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub cache: CacheConfig,
    pub tiers: Vec<TierConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub default_batch_size: usize,
    pub default_concurrent_batches: usize,
    pub max_batch_size: usize,
    pub max_concurrent_batches: usize,
    pub inter_tier_delay_ms: u64,
    pub provider_timeout_seconds: u64,
    pub default_languages: Vec<LanguageCode>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_batch_size: 5,
            default_concurrent_batches: 3,
            max_batch_size: 20,
            max_concurrent_batches: 15,
            inter_tier_delay_ms: 0,
            provider_timeout_seconds: 60,
            default_languages: LanguageCode::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub namespace: String,
    /// 提示模板或版本標記，變更後舊的快取自然失效
    pub discriminator: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 86_400,
            namespace: "web_enhancement".to_string(),
            discriminator: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub name: String,
    pub kind: TierKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub timeout_seconds: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

fn default_temperature() -> f64 {
    0.3
}

fn default_max_tokens() -> u32 {
    4000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EnhanceError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EnhanceError::Config {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn enabled_tiers(&self) -> impl Iterator<Item = &TierConfig> {
        self.tiers.iter().filter(|tier| tier.enabled)
    }

    pub fn service_limits(&self) -> ServiceLimits {
        ServiceLimits {
            max_batch_size: self.service.max_batch_size,
            max_concurrent_batches: self.service.max_concurrent_batches,
        }
    }

    pub fn default_options(&self) -> EnhanceOptions {
        EnhanceOptions {
            use_cache: self.cache.enabled,
            batch_size: self.service.default_batch_size,
            concurrent_batches: self.service.default_concurrent_batches,
        }
    }

    pub fn inter_tier_delay(&self) -> Duration {
        Duration::from_millis(self.service.inter_tier_delay_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.service.provider_timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        let service = &self.service;
        validate_range("service.max_batch_size", service.max_batch_size, 1, 20)?;
        validate_range("service.max_concurrent_batches", service.max_concurrent_batches, 1, 15)?;
        validate_range(
            "service.default_batch_size",
            service.default_batch_size,
            1,
            service.max_batch_size,
        )?;
        validate_range(
            "service.default_concurrent_batches",
            service.default_concurrent_batches,
            1,
            service.max_concurrent_batches,
        )?;
        validate_range("service.provider_timeout_seconds", service.provider_timeout_seconds, 1, 600)?;
        if service.default_languages.is_empty() {
            return Err(EnhanceError::InvalidConfigValue {
                field: "service.default_languages".to_string(),
                value: "[]".to_string(),
                reason: "At least one language is required".to_string(),
            });
        }

        validate_non_empty_string("cache.namespace", &self.cache.namespace)?;
        if self.cache.ttl_seconds == 0 {
            return Err(EnhanceError::InvalidConfigValue {
                field: "cache.ttl_seconds".to_string(),
                value: "0".to_string(),
                reason: "TTL must be positive".to_string(),
            });
        }

        let mut names = HashSet::new();
        for tier in &self.tiers {
            tier.validate()?;
            if !names.insert(tier.name.as_str()) {
                return Err(EnhanceError::InvalidConfigValue {
                    field: "tiers.name".to_string(),
                    value: tier.name.clone(),
                    reason: "Tier names must be unique".to_string(),
                });
            }
        }

        if self.enabled_tiers().next().is_none() {
            return Err(EnhanceError::Config {
                message: "At least one enabled [[tiers]] entry is required".to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for TierConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("tiers.name", &self.name)?;
        let field = |key: &str| format!("tiers.{}.{}", self.name, key);

        validate_url(&field("endpoint"), &self.endpoint)?;
        validate_non_empty_string(&field("model"), &self.model)?;
        validate_range(&field("temperature"), self.temperature, 0.0, 2.0)?;
        validate_range(&field("max_tokens"), self.max_tokens, 1, 128_000)?;
        if let Some(timeout) = self.timeout_seconds {
            validate_range(&field("timeout_seconds"), timeout, 1, 600)?;
        }

        // 停用的 tier 不需要金鑰
        if self.enabled {
            validate_non_empty_string(&field("api_key"), &self.api_key)?;
            if self.api_key.starts_with("${") {
                return Err(EnhanceError::InvalidConfigValue {
                    field: field("api_key"),
                    value: self.api_key.clone(),
                    reason: "Environment variable is not set".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
