use crate::utils::error::{EnhanceError, Result};
use crate::utils::validation::{is_web_url, require_max_chars, require_non_blank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const MAX_TERM_CHARS: usize = 100;
pub const MAX_DOMAIN_CHARS: usize = 100;
pub const MAX_TAGS: usize = 5;

/// 支援的翻譯語言（固定 11 種）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LanguageCode {
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "zh-CN")]
    ChineseSimplified,
    #[serde(rename = "zh-TW")]
    ChineseTraditional,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "vi")]
    Vietnamese,
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "es")]
    Spanish,
}

impl LanguageCode {
    pub const ALL: [LanguageCode; 11] = [
        LanguageCode::Korean,
        LanguageCode::ChineseSimplified,
        LanguageCode::ChineseTraditional,
        LanguageCode::English,
        LanguageCode::Japanese,
        LanguageCode::French,
        LanguageCode::Russian,
        LanguageCode::Italian,
        LanguageCode::Vietnamese,
        LanguageCode::Arabic,
        LanguageCode::Spanish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageCode::Korean => "ko",
            LanguageCode::ChineseSimplified => "zh-CN",
            LanguageCode::ChineseTraditional => "zh-TW",
            LanguageCode::English => "en",
            LanguageCode::Japanese => "ja",
            LanguageCode::French => "fr",
            LanguageCode::Russian => "ru",
            LanguageCode::Italian => "it",
            LanguageCode::Vietnamese => "vi",
            LanguageCode::Arabic => "ar",
            LanguageCode::Spanish => "es",
        }
    }

    /// 顯示用名稱
    pub fn display_name(&self) -> &'static str {
        match self {
            LanguageCode::Korean => "한국어",
            LanguageCode::ChineseSimplified => "中文(简体)",
            LanguageCode::ChineseTraditional => "中文(繁體)",
            LanguageCode::English => "English",
            LanguageCode::Japanese => "日本語",
            LanguageCode::French => "Français",
            LanguageCode::Russian => "Русский",
            LanguageCode::Italian => "Italiano",
            LanguageCode::Vietnamese => "Tiếng Việt",
            LanguageCode::Arabic => "العربية",
            LanguageCode::Spanish => "Español",
        }
    }

    pub fn supported_codes() -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = Self::ALL.iter().map(|l| l.as_str()).collect();
        codes.sort_unstable();
        codes
    }

    /// 解析語言代碼列表，保留順序並去除重複
    pub fn parse_list<S: AsRef<str>>(codes: &[S]) -> Result<Vec<LanguageCode>> {
        let mut languages = Vec::with_capacity(codes.len());
        for code in codes {
            let language: LanguageCode = code.as_ref().parse()?;
            if !languages.contains(&language) {
                languages.push(language);
            }
        }
        Ok(languages)
    }
}

impl FromStr for LanguageCode {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        if code.is_empty() {
            return Err(EnhanceError::input("target_languages", "language code is empty"));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|lang| lang.as_str() == code)
            .ok_or_else(|| {
                EnhanceError::input(
                    "target_languages",
                    format!(
                        "unsupported language code '{}'. Supported: {}",
                        code,
                        Self::supported_codes().join(", ")
                    ),
                )
            })
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 用戶端提交的原始用語資訊（建立後不可變）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermInfo {
    term: String,
    #[serde(rename = "type")]
    term_type: String,
    primary_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
    tags: Vec<String>,
}

impl TermInfo {
    pub fn create(
        term: &str,
        term_type: &str,
        primary_domain: &str,
        context: Option<&str>,
        tags: Vec<String>,
    ) -> Result<Self> {
        require_non_blank("term", term)?;
        require_non_blank("type", term_type)?;
        require_non_blank("primary_domain", primary_domain)?;

        let term = term.trim();
        require_max_chars("term", term, MAX_TERM_CHARS)?;

        let primary_domain = primary_domain.trim().to_lowercase();
        require_max_chars("primary_domain", &primary_domain, MAX_DOMAIN_CHARS)?;

        if tags.len() > MAX_TAGS {
            return Err(EnhanceError::input(
                "tags",
                format!("at most {} tags allowed, got {}", MAX_TAGS, tags.len()),
            ));
        }

        let context = context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            term: term.to_string(),
            term_type: term_type.trim().to_lowercase(),
            primary_domain,
            context,
            tags,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn term_type(&self) -> &str {
        &self.term_type
    }

    pub fn primary_domain(&self) -> &str {
        &self.primary_domain
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl fmt::Display for TermInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.term, self.term_type, self.primary_domain)
    }
}

/// 經由 provider 強化後的用語：多語翻譯、網路出處與信心分數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedTerm {
    term: String,
    term_type: String,
    primary_domain: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    translations: BTreeMap<LanguageCode, String>,
    #[serde(default)]
    web_sources: Vec<String>,
    source: String,
    confidence_score: f64,
    created_at: DateTime<Utc>,
}

impl EnhancedTerm {
    pub fn from_term_info(info: &TermInfo, source: &str, confidence_score: f64) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(EnhanceError::provider(source, "source identifier is empty"));
        }
        if !(0.0..=1.0).contains(&confidence_score) || confidence_score.is_nan() {
            return Err(EnhanceError::provider(
                source,
                format!("confidence score must be within 0.0-1.0: {}", confidence_score),
            ));
        }

        Ok(Self {
            term: info.term.clone(),
            term_type: info.term_type.clone(),
            primary_domain: info.primary_domain.clone(),
            context: info.context.clone(),
            tags: info.tags.clone(),
            translations: BTreeMap::new(),
            web_sources: Vec::new(),
            source: source.to_string(),
            confidence_score,
            created_at: Utc::now(),
        })
    }

    pub fn add_translation(&mut self, language: LanguageCode, translation: &str) -> Result<()> {
        let translation = translation.trim();
        if translation.is_empty() {
            return Err(EnhanceError::provider(
                &self.source,
                format!("empty {} translation for '{}'", language, self.term),
            ));
        }
        self.translations.insert(language, translation.to_string());
        Ok(())
    }

    pub fn add_web_source(&mut self, url: &str) -> Result<()> {
        let url = url.trim();
        if !is_web_url(url) {
            return Err(EnhanceError::provider(
                &self.source,
                format!("invalid web source URL: '{}'", url),
            ));
        }
        if !self.web_sources.iter().any(|existing| existing == url) {
            self.web_sources.push(url.to_string());
        }
        Ok(())
    }

    pub fn with_translation(mut self, language: LanguageCode, translation: &str) -> Result<Self> {
        self.add_translation(language, translation)?;
        Ok(self)
    }

    /// 快取命中時以本次請求的用語資訊覆蓋，翻譯與出處不變
    pub fn with_term_info(mut self, info: &TermInfo) -> Self {
        self.term = info.term.clone();
        self.term_type = info.term_type.clone();
        self.primary_domain = info.primary_domain.clone();
        self.context = info.context.clone();
        self.tags = info.tags.clone();
        self
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn term_type(&self) -> &str {
        &self.term_type
    }

    pub fn primary_domain(&self) -> &str {
        &self.primary_domain
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn translations(&self) -> &BTreeMap<LanguageCode, String> {
        &self.translations
    }

    pub fn web_sources(&self) -> &[String] {
        &self.web_sources
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn confidence_score(&self) -> f64 {
        self.confidence_score
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn translation(&self, language: LanguageCode) -> Option<&str> {
        self.translations.get(&language).map(String::as_str)
    }

    pub fn has_translation(&self, language: LanguageCode) -> bool {
        self.translations.contains_key(&language)
    }

    /// 依請求順序列出缺少的語言
    pub fn missing_languages(&self, requested: &[LanguageCode]) -> Vec<LanguageCode> {
        requested
            .iter()
            .copied()
            .filter(|lang| !self.has_translation(*lang))
            .collect()
    }

    pub fn completion_rate(&self) -> f64 {
        self.translations.len() as f64 / LanguageCode::ALL.len() as f64
    }

    pub fn is_complete(&self) -> bool {
        LanguageCode::ALL.iter().all(|lang| self.has_translation(*lang))
    }
}

/// 單一 tier 的失敗紀錄
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFailure {
    pub tier: String,
    pub reason: String,
}

impl TierFailure {
    pub fn new(tier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.tier, self.reason)
    }
}

/// 被接受的 tier（index 從 0 起算，0 即為 primary）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedTier {
    pub index: usize,
    pub name: String,
    pub requires_evidence: bool,
}

impl AcceptedTier {
    pub fn is_primary(&self) -> bool {
        self.index == 0
    }
}

/// 一個 batch 的處理結果，回合結束後立即被合併步驟消化
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub batch_index: usize,
    /// batch 第一個用語在輸入列表中的位置
    pub offset: usize,
    pub terms: Vec<Option<EnhancedTerm>>,
    pub accepted: Option<AcceptedTier>,
    pub failures: Vec<TierFailure>,
}

impl BatchResult {
    pub fn accepted(
        batch_index: usize,
        offset: usize,
        terms: Vec<EnhancedTerm>,
        accepted: AcceptedTier,
        failures: Vec<TierFailure>,
    ) -> Self {
        Self {
            batch_index,
            offset,
            terms: terms.into_iter().map(Some).collect(),
            accepted: Some(accepted),
            failures,
        }
    }

    pub fn failed(
        batch_index: usize,
        offset: usize,
        size: usize,
        failures: Vec<TierFailure>,
    ) -> Self {
        Self {
            batch_index,
            offset,
            terms: vec![None; size],
            accepted: None,
            failures,
        }
    }

    pub fn is_success(&self) -> bool {
        self.accepted.is_some()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn used_fallback(&self) -> bool {
        self.accepted.as_ref().is_some_and(|tier| !tier.is_primary())
    }
}
