pub mod chat_completion;
pub mod response_parser;

pub use chat_completion::ChatCompletionProvider;

use crate::config::toml_config::{AppConfig, TierConfig};
use crate::core::fallback::{FallbackChain, Tier};
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// 依 `[[tiers]]` 設定建立單一 tier
pub fn build_tier(config: &TierConfig, default_timeout: Duration) -> Tier {
    let timeout = config
        .timeout_seconds
        .map(Duration::from_secs)
        .unwrap_or(default_timeout);

    let provider = ChatCompletionProvider::new(
        config.name.clone(),
        config.endpoint.clone(),
        config.api_key.clone(),
        config.model.clone(),
    )
    .with_temperature(config.temperature)
    .with_max_tokens(config.max_tokens)
    .with_web_search(config.kind.requires_evidence())
    .with_timeout(Some(timeout));

    Tier::new(config.name.clone(), config.kind, Arc::new(provider)).with_enabled(config.enabled)
}

pub fn build_tiers(configs: &[TierConfig], default_timeout: Duration) -> Vec<Tier> {
    configs
        .iter()
        .map(|config| build_tier(config, default_timeout))
        .collect()
}

/// 依設定順序組出 fallback chain
pub fn build_chain(config: &AppConfig) -> Result<FallbackChain> {
    let tiers = build_tiers(&config.tiers, config.provider_timeout());
    tracing::info!(
        "🔗 Fallback chain: {}",
        tiers
            .iter()
            .map(|tier| format!("{}({:?})", tier.name(), tier.kind()))
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    Ok(FallbackChain::new(tiers)?
        .with_inter_tier_delay(config.inter_tier_delay())
        .with_provider_timeout(Some(config.provider_timeout())))
}
