use crate::core::batch::{batch_count, estimate_processing_time, round_count};
use crate::core::service::{EnhanceOptions, EnhancementOutcome};
use crate::domain::model::{EnhancedTerm, LanguageCode, TermInfo};
use crate::utils::error::{EnhanceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 每個 batch 的平均處理秒數，用於預估
pub const AVG_BATCH_SECONDS: f64 = 6.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermInput {
    pub term: String,
    #[serde(rename = "type")]
    pub term_type: String,
    pub primary_domain: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceRequest {
    pub terms: Vec<TermInput>,
    /// 未指定時使用設定檔的預設語言
    #[serde(default)]
    pub target_languages: Option<Vec<String>>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub concurrent_batches: Option<usize>,
}

fn default_use_cache() -> bool {
    true
}

impl EnhanceRequest {
    pub fn new(terms: Vec<TermInput>) -> Self {
        Self {
            terms,
            target_languages: None,
            use_cache: true,
            batch_size: None,
            concurrent_batches: None,
        }
    }

    pub fn to_term_infos(&self) -> Result<Vec<TermInfo>> {
        self.terms
            .iter()
            .enumerate()
            .map(|(i, input)| {
                TermInfo::create(
                    &input.term,
                    &input.term_type,
                    &input.primary_domain,
                    input.context.as_deref(),
                    input.tags.clone(),
                )
                .map_err(|e| match e {
                    EnhanceError::InputValidation { field, message } => {
                        EnhanceError::input(format!("terms[{}].{}", i, field), message)
                    }
                    other => other,
                })
            })
            .collect()
    }

    pub fn languages(&self, defaults: &[LanguageCode]) -> Result<Vec<LanguageCode>> {
        match &self.target_languages {
            Some(codes) => LanguageCode::parse_list(codes),
            None => Ok(defaults.to_vec()),
        }
    }

    pub fn options(&self, defaults: EnhanceOptions) -> EnhanceOptions {
        EnhanceOptions {
            use_cache: self.use_cache && defaults.use_cache,
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            concurrent_batches: self.concurrent_batches.unwrap_or(defaults.concurrent_batches),
        }
    }
}

/// 對外輸出的用語格式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedTermDto {
    pub original_term: String,
    pub term_type: String,
    pub primary_domain: String,
    pub context: String,
    pub tags: Vec<String>,
    pub translations: BTreeMap<LanguageCode, String>,
    pub web_sources: Vec<String>,
    pub source: String,
    pub confidence_score: f64,
    pub search_timestamp: String,
}

impl From<&EnhancedTerm> for EnhancedTermDto {
    fn from(term: &EnhancedTerm) -> Self {
        Self {
            original_term: term.term().to_string(),
            term_type: term.term_type().to_string(),
            primary_domain: term.primary_domain().to_string(),
            context: term.context().unwrap_or_default().to_string(),
            tags: term.tags().to_vec(),
            translations: term.translations().clone(),
            web_sources: term.web_sources().to_vec(),
            source: term.source().to_string(),
            confidence_score: term.confidence_score(),
            search_timestamp: term.created_at().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_terms: usize,
    pub enhanced_terms: usize,
    pub failed_terms: usize,
    pub cache_hits: usize,
    pub cache_hit_rate: f64,
    pub total_batches: usize,
    pub fallback_count: usize,
    /// 秒
    pub processing_time: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Summary {
    pub fn new(total_terms: usize, outcome: &EnhancementOutcome) -> Self {
        let cache_hit_rate = if total_terms == 0 {
            0.0
        } else {
            outcome.cache_hits as f64 / total_terms as f64
        };

        Self {
            total_terms,
            enhanced_terms: outcome.terms.len(),
            failed_terms: outcome.failed_terms.len(),
            cache_hits: outcome.cache_hits,
            cache_hit_rate: round2(cache_hit_rate),
            total_batches: outcome.total_batches,
            fallback_count: outcome.fallback_count,
            processing_time: round2(outcome.elapsed.as_secs_f64()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceResponse {
    pub enhanced_terms: Vec<EnhancedTermDto>,
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl EnhanceResponse {
    pub fn from_outcome(total_terms: usize, outcome: &EnhancementOutcome) -> Self {
        Self {
            enhanced_terms: outcome.terms.iter().map(EnhancedTermDto::from).collect(),
            summary: Summary::new(total_terms, outcome),
            errors: outcome.errors.clone(),
        }
    }
}

/// `--dry-run` 的執行計畫
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchPlan {
    pub total_terms: usize,
    pub languages: Vec<LanguageCode>,
    pub batch_size: usize,
    pub concurrent_batches: usize,
    pub total_batches: usize,
    pub rounds: usize,
    pub estimated_seconds: f64,
}

impl BatchPlan {
    pub fn new(total_terms: usize, languages: Vec<LanguageCode>, options: &EnhanceOptions) -> Self {
        let total_batches = batch_count(total_terms, options.batch_size);
        Self {
            total_terms,
            languages,
            batch_size: options.batch_size,
            concurrent_batches: options.concurrent_batches,
            total_batches,
            rounds: round_count(total_batches, options.concurrent_batches),
            estimated_seconds: estimate_processing_time(
                total_terms,
                options.batch_size,
                options.concurrent_batches,
                AVG_BATCH_SECONDS,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    /// connected / disconnected / disabled
    pub cache: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_error: Option<String>,
    pub enabled_tiers: Vec<String>,
    pub disabled_tiers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    pub pattern: String,
    pub deleted_keys: usize,
}
