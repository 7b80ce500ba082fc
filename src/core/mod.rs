pub mod batch;
pub mod cache;
pub mod fallback;
pub mod service;
pub mod validator;

pub use crate::domain::model::{EnhancedTerm, LanguageCode, TermInfo};
pub use crate::domain::ports::{CacheStore, EnhancementProvider};
pub use crate::utils::error::Result;
