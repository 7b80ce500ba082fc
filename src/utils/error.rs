use crate::core::validator::ValidationError;
use crate::domain::model::TierFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("Invalid input for '{field}': {message}")]
    InputValidation { field: String, message: String },

    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Result validation failed: {0}")]
    ResultValidation(#[from] ValidationError),

    #[error("All fallback tiers failed. {}", format_failures(.attempts))]
    FallbackExhausted { attempts: Vec<TierFailure> },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration value for '{field}' ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

fn format_failures(attempts: &[TierFailure]) -> String {
    if attempts.is_empty() {
        return "No tier was attempted".to_string();
    }
    attempts
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Provider,
    Cache,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EnhanceError {
    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InputValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InputValidation { .. } => ErrorCategory::Input,
            Self::Provider { .. }
            | Self::ResultValidation(_)
            | Self::FallbackExhausted { .. }
            | Self::Http(_) => ErrorCategory::Provider,
            Self::Cache { .. } => ErrorCategory::Cache,
            Self::Config { .. } | Self::InvalidConfigValue { .. } => ErrorCategory::Configuration,
            Self::Io(_) | Self::Serialization(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 快取錯誤只會降級成 cache miss
            Self::Cache { .. } => ErrorSeverity::Low,
            Self::Provider { .. } | Self::ResultValidation(_) | Self::Http(_) => {
                ErrorSeverity::Medium
            }
            Self::InputValidation { .. }
            | Self::FallbackExhausted { .. }
            | Self::Config { .. }
            | Self::InvalidConfigValue { .. } => ErrorSeverity::High,
            Self::Io(_) | Self::Serialization(_) => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.severity(), ErrorSeverity::Medium)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::InputValidation { .. } => {
                "Check the request: terms must be non-empty and languages must be supported codes"
            }
            Self::Provider { .. } | Self::Http(_) => {
                "Check provider endpoint, API key and rate limits, then retry"
            }
            Self::ResultValidation(_) => {
                "The provider answered with incomplete data; retry or enable another fallback tier"
            }
            Self::FallbackExhausted { .. } => {
                "Every configured tier failed; enable more tiers or reduce the batch size"
            }
            Self::Cache { .. } => "Check the cache store connectivity; processing continues without cache",
            Self::Config { .. } | Self::InvalidConfigValue { .. } => {
                "Fix the configuration file and run again"
            }
            Self::Io(_) => "Check file paths and permissions",
            Self::Serialization(_) => "Check that the input is valid JSON",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::InputValidation { field, message } => {
                format!("Request rejected ({}): {}", field, message)
            }
            Self::FallbackExhausted { attempts } => format!(
                "Enhancement failed after trying {} tier(s)",
                attempts.len()
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnhanceError>;
