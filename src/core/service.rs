use crate::core::batch::{split_batches, Batch, RoundRobinScheduler};
use crate::core::cache::EnhancementCache;
use crate::core::fallback::FallbackChain;
use crate::domain::model::{BatchResult, EnhancedTerm, LanguageCode, TermInfo, TierFailure};
use crate::utils::error::{EnhanceError, Result};
use crate::utils::validation::require_in_range;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_CONCURRENT_BATCHES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnhanceOptions {
    pub use_cache: bool,
    pub batch_size: usize,
    pub concurrent_batches: usize,
}

impl Default for EnhanceOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrent_batches: DEFAULT_CONCURRENT_BATCHES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceLimits {
    pub max_batch_size: usize,
    pub max_concurrent_batches: usize,
}

impl Default for ServiceLimits {
    fn default() -> Self {
        Self {
            max_batch_size: 20,
            max_concurrent_batches: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnhancementOutcome {
    /// 成功的用語，依原始輸入順序
    pub terms: Vec<EnhancedTerm>,
    pub failed_terms: Vec<String>,
    pub cache_hits: usize,
    pub fallback_count: usize,
    pub total_batches: usize,
    pub errors: Vec<String>,
    pub elapsed: Duration,
}

/// 組合根：快取查詢 → 分批排程 → 回寫快取 → 合併結果
pub struct EnhancementService {
    chain: Arc<FallbackChain>,
    cache: Option<Arc<EnhancementCache>>,
    limits: ServiceLimits,
}

impl EnhancementService {
    pub fn new(chain: FallbackChain, cache: Option<Arc<EnhancementCache>>) -> Self {
        Self {
            chain: Arc::new(chain),
            cache,
            limits: ServiceLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ServiceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    pub fn cache(&self) -> Option<&Arc<EnhancementCache>> {
        self.cache.as_ref()
    }

    pub fn validate_request(
        &self,
        terms: &[TermInfo],
        languages: &[LanguageCode],
        options: &EnhanceOptions,
    ) -> Result<()> {
        if terms.is_empty() {
            return Err(EnhanceError::input("terms", "term list is empty"));
        }
        if languages.is_empty() {
            return Err(EnhanceError::input("target_languages", "no target language requested"));
        }
        require_in_range("batch_size", options.batch_size, 1, self.limits.max_batch_size)?;
        require_in_range(
            "concurrent_batches",
            options.concurrent_batches,
            1,
            self.limits.max_concurrent_batches,
        )?;
        Ok(())
    }

    pub async fn enhance(
        &self,
        terms: &[TermInfo],
        languages: &[LanguageCode],
        options: EnhanceOptions,
    ) -> Result<EnhancementOutcome> {
        let started = Instant::now();
        self.validate_request(terms, languages, &options)?;

        let cache = self.cache.as_deref().filter(|_| options.use_cache);

        // 1. 快取查詢，分出命中與未命中
        let mut slots: Vec<Option<EnhancedTerm>> = vec![None; terms.len()];
        let mut pending: Vec<usize> = Vec::with_capacity(terms.len());
        let mut cache_hits = 0usize;

        match cache {
            Some(cache) => {
                let lookups = join_all(terms.iter().map(|t| cache.get(t.term(), languages))).await;
                for (index, hit) in lookups.into_iter().enumerate() {
                    match hit {
                        Some(term) => {
                            slots[index] = Some(term.with_term_info(&terms[index]));
                            cache_hits += 1;
                        }
                        None => pending.push(index),
                    }
                }
            }
            None => pending.extend(0..terms.len()),
        }

        tracing::info!(
            "🔍 {} terms requested: {} cache hits, {} to enhance",
            terms.len(),
            cache_hits,
            pending.len()
        );

        // 2. 未命中的用語分批執行
        let uncached: Vec<TermInfo> = pending.iter().map(|&i| terms[i].clone()).collect();
        let batches = split_batches(&uncached, options.batch_size)?;
        let total_batches = batches.len();
        let scheduler = RoundRobinScheduler::new(options.concurrent_batches)?;

        let results = scheduler
            .schedule(batches, |batch| self.run_batch(batch, languages))
            .await;

        // 3. 只回寫需要佐證的 tier 所產生的結果
        if let Some(cache) = cache {
            let cacheable: Vec<&EnhancedTerm> = results
                .iter()
                .filter(|r| r.accepted.as_ref().is_some_and(|tier| tier.requires_evidence))
                .flat_map(|r| r.terms.iter().flatten())
                .collect();
            let written = join_all(cacheable.iter().map(|term| cache.put(term, languages)))
                .await
                .into_iter()
                .filter(|ok| *ok)
                .count();
            tracing::debug!("💾 Cached {}/{} enhanced terms", written, cacheable.len());
        }

        // 4. 依原始位置合併
        let fallback_count = results.iter().filter(|r| r.used_fallback()).count();
        let mut errors = Vec::new();

        for result in results {
            if !result.is_success() {
                errors.push(describe_failure(&result, &uncached));
            }
            for (position, term) in result.terms.into_iter().enumerate() {
                if let Some(&original) = pending.get(result.offset + position) {
                    slots[original] = term;
                }
            }
        }

        let failed_terms: Vec<String> = slots
            .iter()
            .zip(terms)
            .filter(|(slot, _)| slot.is_none())
            .map(|(_, info)| info.term().to_string())
            .collect();
        let enhanced: Vec<EnhancedTerm> = slots.into_iter().flatten().collect();
        let elapsed = started.elapsed();

        tracing::info!(
            "✅ Enhanced {}/{} terms in {:?} (cache hits: {}, batches: {}, fallbacks: {}, failed: {})",
            enhanced.len(),
            terms.len(),
            elapsed,
            cache_hits,
            total_batches,
            fallback_count,
            failed_terms.len()
        );

        Ok(EnhancementOutcome {
            terms: enhanced,
            failed_terms,
            cache_hits,
            fallback_count,
            total_batches,
            errors,
            elapsed,
        })
    }

    async fn run_batch(&self, batch: Batch, languages: &[LanguageCode]) -> BatchResult {
        match self.chain.run(&batch.terms, languages).await {
            Ok(outcome) => BatchResult::accepted(
                batch.index,
                batch.offset,
                outcome.terms,
                outcome.accepted,
                outcome.failures,
            ),
            Err(EnhanceError::FallbackExhausted { attempts }) => {
                BatchResult::failed(batch.index, batch.offset, batch.len(), attempts)
            }
            Err(other) => BatchResult::failed(
                batch.index,
                batch.offset,
                batch.len(),
                vec![TierFailure::new("fallback_chain", other.to_string())],
            ),
        }
    }
}

fn describe_failure(result: &BatchResult, uncached: &[TermInfo]) -> String {
    let names: Vec<&str> = uncached
        .iter()
        .skip(result.offset)
        .take(result.len())
        .map(TermInfo::term)
        .collect();
    let reasons: Vec<String> = result.failures.iter().map(ToString::to_string).collect();
    format!(
        "Batch {} failed for [{}]: {}",
        result.batch_index + 1,
        names.join(", "),
        reasons.join(" | ")
    )
}
