use crate::domain::model::{EnhancedTerm, LanguageCode, TermInfo};
use crate::utils::error::{EnhanceError, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// 回覆未提供信心分數時使用
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Deserialize)]
struct ProviderReply {
    enhanced_terms: Vec<ReplyTerm>,
}

#[derive(Debug, Deserialize)]
struct ReplyTerm {
    original_term: String,
    translations: HashMap<String, String>,
    #[serde(default)]
    web_sources: Vec<String>,
    #[serde(default)]
    confidence_score: Option<f64>,
}

/// 去掉 LLM 常見的 ```json 區塊包裝
pub fn strip_code_fence(content: &str) -> &str {
    let mut body = content.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

/// 將供應商的 JSON 回覆轉成 `EnhancedTerm`，與輸入一一對應
///
/// 用語的基本欄位一律取自輸入的 `TermInfo`；不支援的語言代碼與無效網址會被略過，
/// 交由 validator 判斷結果是否完整。
pub fn parse_reply(content: &str, inputs: &[TermInfo], source: &str) -> Result<Vec<EnhancedTerm>> {
    let body = strip_code_fence(content);
    let reply: ProviderReply = serde_json::from_str(body).map_err(|e| {
        EnhanceError::provider(
            source,
            format!("unparseable reply: {} (reply: {})", e, preview(body)),
        )
    })?;

    if reply.enhanced_terms.len() != inputs.len() {
        return Err(EnhanceError::provider(
            source,
            format!(
                "reply has {} terms for {} inputs",
                reply.enhanced_terms.len(),
                inputs.len()
            ),
        ));
    }

    reply
        .enhanced_terms
        .into_iter()
        .zip(inputs)
        .enumerate()
        .map(|(position, (item, info))| build_term(position, item, info, source))
        .collect()
}

fn build_term(position: usize, item: ReplyTerm, info: &TermInfo, source: &str) -> Result<EnhancedTerm> {
    if !item.original_term.trim().eq_ignore_ascii_case(info.term()) {
        tracing::debug!(
            "[{}] term {} answered as '{}' for input '{}'",
            source,
            position + 1,
            item.original_term,
            info.term()
        );
    }

    let confidence = item.confidence_score.unwrap_or(DEFAULT_CONFIDENCE);
    let mut term = EnhancedTerm::from_term_info(info, source, confidence).map_err(|e| {
        EnhanceError::provider(source, format!("term {} ('{}'): {}", position + 1, info.term(), e))
    })?;

    for (code, text) in &item.translations {
        let language = match code.parse::<LanguageCode>() {
            Ok(language) => language,
            Err(_) => {
                tracing::debug!("[{}] ignoring unsupported language '{}' for '{}'", source, code, info.term());
                continue;
            }
        };
        if let Err(e) = term.add_translation(language, text) {
            tracing::debug!("[{}] dropping translation {} for '{}': {}", source, code, info.term(), e);
        }
    }

    for url in &item.web_sources {
        if let Err(e) = term.add_web_source(url) {
            tracing::debug!("[{}] dropping web source for '{}': {}", source, info.term(), e);
        }
    }

    Ok(term)
}
