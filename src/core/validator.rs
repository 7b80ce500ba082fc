use crate::domain::model::{EnhancedTerm, LanguageCode};
use thiserror::Error;

pub const MIN_CONFIDENCE: f64 = 0.5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("provider returned no enhanced terms")]
    Empty,

    #[error("term '{term}' is missing translations: {}", join_codes(.missing))]
    MissingTranslations {
        term: String,
        missing: Vec<LanguageCode>,
    },

    #[error("term '{term}' has low confidence: {score:.2} (minimum 0.50)")]
    LowConfidence { term: String, score: f64 },

    #[error("term '{term}' has no web sources")]
    MissingEvidence { term: String },
}

fn join_codes(codes: &[LanguageCode]) -> String {
    codes
        .iter()
        .map(LanguageCode::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn term(&self) -> Option<&str> {
        match self {
            ValidationError::Empty => None,
            ValidationError::MissingTranslations { term, .. }
            | ValidationError::LowConfidence { term, .. }
            | ValidationError::MissingEvidence { term } => Some(term),
        }
    }
}

/// 檢查 provider 回傳的結果，遇到第一個違規即回傳
///
/// 順序：非空 → 每個用語涵蓋所有請求語言 → 信心分數 >= 0.5 →
/// （需要佐證時）至少一個網路出處。
pub fn validate(
    terms: &[EnhancedTerm],
    requested_languages: &[LanguageCode],
    require_evidence: bool,
) -> Result<(), ValidationError> {
    if terms.is_empty() {
        return Err(ValidationError::Empty);
    }

    for term in terms {
        let missing = term.missing_languages(requested_languages);
        if !missing.is_empty() {
            return Err(ValidationError::MissingTranslations {
                term: term.term().to_string(),
                missing,
            });
        }

        if term.confidence_score() < MIN_CONFIDENCE {
            return Err(ValidationError::LowConfidence {
                term: term.term().to_string(),
                score: term.confidence_score(),
            });
        }

        if require_evidence && term.web_sources().is_empty() {
            return Err(ValidationError::MissingEvidence {
                term: term.term().to_string(),
            });
        }
    }

    Ok(())
}
