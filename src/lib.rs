pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::memory_cache::MemoryCacheStore;
pub use app::{EnhanceRequest, EnhanceResponse, EnhancementApi};
pub use config::AppConfig;
pub use core::fallback::{FallbackChain, Tier, TierKind};
pub use core::service::{EnhanceOptions, EnhancementService};
pub use domain::model::{EnhancedTerm, LanguageCode, TermInfo};
pub use domain::ports::{CacheStore, EnhancementProvider};
pub use utils::error::{EnhanceError, Result};
