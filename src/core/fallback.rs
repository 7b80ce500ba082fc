use crate::core::validator::validate;
use crate::domain::model::{AcceptedTier, EnhancedTerm, LanguageCode, TermInfo, TierFailure};
use crate::domain::ports::EnhancementProvider;
use crate::utils::error::{EnhanceError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Tier 的能力：網路搜尋（需要出處佐證）或純翻譯
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    WebSearch,
    Translation,
}

impl TierKind {
    pub fn requires_evidence(&self) -> bool {
        matches!(self, TierKind::WebSearch)
    }
}

#[derive(Clone)]
pub struct Tier {
    name: String,
    kind: TierKind,
    provider: Arc<dyn EnhancementProvider>,
    enabled: bool,
}

impl Tier {
    pub fn new(name: impl Into<String>, kind: TierKind, provider: Arc<dyn EnhancementProvider>) -> Self {
        Self {
            name: name.into(),
            kind,
            provider,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TierKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn requires_evidence(&self) -> bool {
        self.kind.requires_evidence()
    }
}

impl std::fmt::Debug for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tier")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("provider", &self.provider.source_name())
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    Trying(usize),
    Validating(usize),
    Success(usize),
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    pub terms: Vec<EnhancedTerm>,
    pub accepted: AcceptedTier,
    /// 被接受之前失敗的 tier
    pub failures: Vec<TierFailure>,
}

/// 依序嘗試各 tier，直到某個 tier 的結果通過驗證
#[derive(Debug, Clone)]
pub struct FallbackChain {
    tiers: Vec<Tier>,
    inter_tier_delay: Duration,
    provider_timeout: Option<Duration>,
}

impl FallbackChain {
    pub fn new(tiers: Vec<Tier>) -> Result<Self> {
        if !tiers.iter().any(Tier::is_enabled) {
            return Err(EnhanceError::Config {
                message: "fallback chain needs at least one enabled tier".to_string(),
            });
        }

        for (index, tier) in tiers.iter().enumerate().filter(|(_, t)| !t.is_enabled()) {
            tracing::warn!(
                "⚠️ Tier {} ({}) is disabled; fallback chain runs in degraded mode",
                index + 1,
                tier.name()
            );
        }

        Ok(Self {
            tiers,
            inter_tier_delay: Duration::ZERO,
            provider_timeout: None,
        })
    }

    pub fn with_inter_tier_delay(mut self, delay: Duration) -> Self {
        self.inter_tier_delay = delay;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn disabled_tiers(&self) -> Vec<&str> {
        self.tiers
            .iter()
            .filter(|t| !t.is_enabled())
            .map(Tier::name)
            .collect()
    }

    pub async fn run(&self, terms: &[TermInfo], languages: &[LanguageCode]) -> Result<FallbackOutcome> {
        if terms.is_empty() {
            return Err(EnhanceError::input("terms", "batch is empty"));
        }

        let mut failures: Vec<TierFailure> = Vec::new();
        let mut candidate: Vec<EnhancedTerm> = Vec::new();
        let mut attempted = 0usize;
        let mut state = self.first_enabled_from(0);

        loop {
            match state {
                FallbackState::Trying(index) => {
                    let tier = &self.tiers[index];
                    if attempted > 0 && !self.inter_tier_delay.is_zero() {
                        tokio::time::sleep(self.inter_tier_delay).await;
                    }
                    attempted += 1;

                    tracing::debug!(
                        "🔄 Tier {} ({}) enhancing {} terms",
                        index + 1,
                        tier.name(),
                        terms.len()
                    );

                    match self.invoke(tier, terms, languages).await {
                        Ok(result) => {
                            candidate = result;
                            state = FallbackState::Validating(index);
                        }
                        Err(reason) => {
                            tracing::warn!("❌ Tier {} ({}) failed: {}", index + 1, tier.name(), reason);
                            failures.push(TierFailure::new(tier.name(), reason));
                            state = self.first_enabled_from(index + 1);
                        }
                    }
                }
                FallbackState::Validating(index) => {
                    let tier = &self.tiers[index];
                    match validate(&candidate, languages, tier.requires_evidence()) {
                        Ok(()) => state = FallbackState::Success(index),
                        Err(e) => {
                            tracing::warn!(
                                "⚠️ Tier {} ({}) result rejected: {}",
                                index + 1,
                                tier.name(),
                                e
                            );
                            failures.push(TierFailure::new(
                                tier.name(),
                                format!("validation failed: {}", e),
                            ));
                            candidate.clear();
                            state = self.first_enabled_from(index + 1);
                        }
                    }
                }
                FallbackState::Success(index) => {
                    let tier = &self.tiers[index];
                    if index > 0 {
                        tracing::info!("✅ Fallback tier {} ({}) succeeded", index + 1, tier.name());
                    }
                    return Ok(FallbackOutcome {
                        terms: std::mem::take(&mut candidate),
                        accepted: AcceptedTier {
                            index,
                            name: tier.name().to_string(),
                            requires_evidence: tier.requires_evidence(),
                        },
                        failures,
                    });
                }
                FallbackState::Exhausted => {
                    let err = EnhanceError::FallbackExhausted { attempts: failures };
                    tracing::error!("💥 {}", err);
                    return Err(err);
                }
            }
        }
    }

    // 停用的 tier 直接略過，鏈因此縮短
    fn first_enabled_from(&self, start: usize) -> FallbackState {
        self.tiers
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, tier)| tier.is_enabled())
            .map(|(index, _)| FallbackState::Trying(index))
            .unwrap_or(FallbackState::Exhausted)
    }

    async fn invoke(
        &self,
        tier: &Tier,
        terms: &[TermInfo],
        languages: &[LanguageCode],
    ) -> std::result::Result<Vec<EnhancedTerm>, String> {
        let call = tier.provider.enhance(terms, languages);
        let result = match self.provider_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(format!("timed out after {:?}", limit)),
            },
            None => call.await,
        };

        let enhanced = result.map_err(|e| e.to_string())?;
        if enhanced.len() != terms.len() {
            return Err(format!(
                "returned {} results for {} terms",
                enhanced.len(),
                terms.len()
            ));
        }
        Ok(enhanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[derive(Clone, Copy)]
    enum Behavior {
        Complete,
        MissingLanguage,
        NoSources,
        Fail,
        Slow,
        WrongCount,
    }

    struct ScriptedProvider {
        name: String,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(name: &str, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EnhancementProvider for ScriptedProvider {
        async fn enhance(&self, terms: &[TermInfo], languages: &[LanguageCode]) -> Result<Vec<EnhancedTerm>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Fail => return Err(EnhanceError::provider(&self.name, "rate limited")),
                Behavior::Slow => tokio::time::sleep(Duration::from_millis(200)).await,
                _ => {}
            }

            let mut out = Vec::new();
            for info in terms {
                let mut term = EnhancedTerm::from_term_info(info, &self.name, 0.9)?;
                let langs = match self.behavior {
                    Behavior::MissingLanguage => &languages[..languages.len() - 1],
                    _ => languages,
                };
                for lang in langs {
                    term.add_translation(*lang, &format!("{}-{}", info.term(), lang))?;
                }
                if !matches!(self.behavior, Behavior::NoSources) {
                    term.add_web_source("https://example.org/source")?;
                }
                out.push(term);
            }
            if matches!(self.behavior, Behavior::WrongCount) {
                out.pop();
            }
            Ok(out)
        }

        fn source_name(&self) -> &str {
            &self.name
        }
    }

    fn terms() -> Vec<TermInfo> {
        vec![
            TermInfo::create("Toyota", "company", "automotive", None, vec![]).unwrap(),
            TermInfo::create("Real Madrid", "organization", "sports", None, vec![]).unwrap(),
        ]
    }

    const LANGS: [LanguageCode; 3] = [LanguageCode::Korean, LanguageCode::English, LanguageCode::Japanese];

    #[tokio::test]
    async fn test_primary_success_uses_first_tier() {
        let primary = ScriptedProvider::new("primary", Behavior::Complete);
        let secondary = ScriptedProvider::new("secondary", Behavior::Complete);
        let chain = FallbackChain::new(vec![
            Tier::new("primary", TierKind::WebSearch, primary.clone()),
            Tier::new("secondary", TierKind::WebSearch, secondary.clone()),
        ])
        .unwrap();

        let outcome = chain.run(&terms(), &LANGS).await.unwrap();
        assert!(outcome.accepted.is_primary());
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.terms.len(), 2);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_validation_failure_falls_back_to_secondary() {
        let primary = ScriptedProvider::new("primary", Behavior::MissingLanguage);
        let secondary = ScriptedProvider::new("secondary", Behavior::Complete);
        let chain = FallbackChain::new(vec![
            Tier::new("primary", TierKind::WebSearch, primary.clone()),
            Tier::new("secondary", TierKind::WebSearch, secondary),
        ])
        .unwrap();

        let outcome = chain.run(&terms(), &LANGS).await.unwrap();
        assert_eq!(outcome.accepted.name, "secondary");
        assert_eq!(outcome.accepted.index, 1);
        assert!(outcome.terms.iter().all(|t| t.source() == "secondary"));
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].reason.contains("ja"));
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_chain_reports_every_tier_in_order() {
        let chain = FallbackChain::new(vec![
            Tier::new("primary", TierKind::WebSearch, ScriptedProvider::new("primary", Behavior::Fail)),
            Tier::new(
                "secondary",
                TierKind::WebSearch,
                ScriptedProvider::new("secondary", Behavior::NoSources),
            ),
            Tier::new(
                "tertiary",
                TierKind::Translation,
                ScriptedProvider::new("tertiary", Behavior::WrongCount),
            ),
        ])
        .unwrap();

        let err = chain.run(&terms(), &LANGS).await.unwrap_err();
        match err {
            EnhanceError::FallbackExhausted { attempts } => {
                let tiers: Vec<&str> = attempts.iter().map(|a| a.tier.as_str()).collect();
                assert_eq!(tiers, vec!["primary", "secondary", "tertiary"]);
                assert!(attempts[0].reason.contains("rate limited"));
                assert!(attempts[1].reason.contains("no web sources"));
                assert!(attempts[2].reason.contains("returned 1 results for 2 terms"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_translation_tier_does_not_need_sources() {
        let chain = FallbackChain::new(vec![
            Tier::new("primary", TierKind::WebSearch, ScriptedProvider::new("primary", Behavior::Fail)),
            Tier::new(
                "plain",
                TierKind::Translation,
                ScriptedProvider::new("plain", Behavior::NoSources),
            ),
        ])
        .unwrap();

        let outcome = chain.run(&terms(), &LANGS).await.unwrap();
        assert_eq!(outcome.accepted.name, "plain");
        assert!(!outcome.accepted.requires_evidence);
    }

    #[tokio::test]
    async fn test_disabled_tier_is_skipped() {
        let disabled = ScriptedProvider::new("secondary", Behavior::Complete);
        let chain = FallbackChain::new(vec![
            Tier::new("primary", TierKind::WebSearch, ScriptedProvider::new("primary", Behavior::Fail)),
            Tier::new("secondary", TierKind::WebSearch, disabled.clone()).with_enabled(false),
            Tier::new(
                "plain",
                TierKind::Translation,
                ScriptedProvider::new("plain", Behavior::Complete),
            ),
        ])
        .unwrap();

        assert_eq!(chain.disabled_tiers(), vec!["secondary"]);
        let outcome = chain.run(&terms(), &LANGS).await.unwrap();
        assert_eq!(outcome.accepted.index, 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(disabled.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_an_ordinary_tier_failure() {
        let chain = FallbackChain::new(vec![
            Tier::new("primary", TierKind::WebSearch, ScriptedProvider::new("primary", Behavior::Slow)),
            Tier::new(
                "secondary",
                TierKind::WebSearch,
                ScriptedProvider::new("secondary", Behavior::Complete),
            ),
        ])
        .unwrap()
        .with_provider_timeout(Some(Duration::from_millis(20)));

        let outcome = chain.run(&terms(), &LANGS).await.unwrap();
        assert_eq!(outcome.accepted.name, "secondary");
        assert!(outcome.failures[0].reason.contains("timed out"));
    }

    #[tokio::test]
    async fn test_inter_tier_delay_applies_before_fallback() {
        let chain = FallbackChain::new(vec![
            Tier::new("primary", TierKind::WebSearch, ScriptedProvider::new("primary", Behavior::Fail)),
            Tier::new(
                "secondary",
                TierKind::WebSearch,
                ScriptedProvider::new("secondary", Behavior::Complete),
            ),
        ])
        .unwrap()
        .with_inter_tier_delay(Duration::from_millis(150));

        let started = Instant::now();
        let outcome = chain.run(&terms(), &LANGS).await.unwrap();
        assert_eq!(outcome.accepted.name, "secondary");
        assert!(started.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_inter_tier_delay_skipped_when_primary_succeeds() {
        let chain = FallbackChain::new(vec![
            Tier::new(
                "primary",
                TierKind::WebSearch,
                ScriptedProvider::new("primary", Behavior::Complete),
            ),
            Tier::new(
                "secondary",
                TierKind::WebSearch,
                ScriptedProvider::new("secondary", Behavior::Complete),
            ),
        ])
        .unwrap()
        .with_inter_tier_delay(Duration::from_millis(150));

        let started = Instant::now();
        let outcome = chain.run(&terms(), &LANGS).await.unwrap();
        assert!(outcome.accepted.is_primary());
        assert!(started.elapsed() < Duration::from_millis(150));
    }

    #[test]
    fn test_chain_without_enabled_tier_is_rejected() {
        let provider = ScriptedProvider::new("only", Behavior::Complete);
        let result = FallbackChain::new(vec![
            Tier::new("only", TierKind::WebSearch, provider).with_enabled(false)
        ]);
        assert!(matches!(result, Err(EnhanceError::Config { .. })));
    }
}
