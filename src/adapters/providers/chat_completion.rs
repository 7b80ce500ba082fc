use crate::adapters::providers::response_parser::parse_reply;
use crate::domain::model::{EnhancedTerm, LanguageCode, TermInfo};
use crate::domain::ports::EnhancementProvider;
use crate::utils::error::{EnhanceError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    // 搜尋模型不接受 temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_search_options: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI 相容的 `/chat/completions` 供應商
///
/// 一次請求處理整個 batch：提示中列出所有用語與目標語言，
/// 回覆需為 `{"enhanced_terms": [...]}` 格式的 JSON。
#[derive(Debug, Clone)]
pub struct ChatCompletionProvider {
    client: Client,
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    web_search: bool,
    timeout: Option<Duration>,
}

impl ChatCompletionProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            web_search: false,
            timeout: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_web_search(mut self, web_search: bool) -> Self {
        self.web_search = web_search;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn build_request(&self, terms: &[TermInfo], languages: &[LanguageCode]) -> ChatRequest<'_> {
        let (temperature, web_search_options) = if self.web_search {
            (None, Some(serde_json::json!({})))
        } else {
            (Some(self.temperature), None)
        };

        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(terms, languages, self.web_search),
            }],
            temperature,
            max_tokens: self.max_tokens,
            web_search_options,
        }
    }
}

/// 單次提示：列出用語與語言，要求固定 JSON 結構
pub fn build_prompt(terms: &[TermInfo], languages: &[LanguageCode], web_search: bool) -> String {
    let mut prompt = String::new();

    if web_search {
        prompt.push_str(
            "Search the web for the official or most widely used name of each term below, \
             then translate it into every requested language. \
             Cite the pages you relied on in \"web_sources\".\n\n",
        );
    } else {
        prompt.push_str("Translate each term below into every requested language.\n\n");
    }

    prompt.push_str("Terms:\n");
    for (i, term) in terms.iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} (type: {}, domain: {}",
            i + 1,
            term.term(),
            term.term_type(),
            term.primary_domain()
        ));
        if let Some(context) = term.context() {
            prompt.push_str(&format!(", context: {}", context));
        }
        if !term.tags().is_empty() {
            prompt.push_str(&format!(", tags: {}", term.tags().join(", ")));
        }
        prompt.push_str(")\n");
    }

    prompt.push_str("\nLanguages:\n");
    for language in languages {
        prompt.push_str(&format!("- {} ({})\n", language.as_str(), language.display_name()));
    }

    prompt.push_str(
        "\nAnswer with JSON only, one entry per term in the same order:\n\
         {\"enhanced_terms\": [{\"original_term\": \"...\", \
         \"translations\": {\"<language code>\": \"...\"}, \
         \"web_sources\": [\"https://...\"], \"confidence_score\": 0.0}]}\n",
    );
    prompt
}

#[async_trait]
impl EnhancementProvider for ChatCompletionProvider {
    async fn enhance(&self, terms: &[TermInfo], languages: &[LanguageCode]) -> Result<Vec<EnhancedTerm>> {
        let url = self.completions_url();
        let body = self.build_request(terms, languages);

        tracing::debug!(
            "🔄 [{}] Requesting {} terms x {} languages from {}",
            self.name,
            terms.len(),
            languages.len(),
            url
        );

        let mut request = self.client.post(&url).bearer_auth(&self.api_key).json(&body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("[{}] API response status: {}", self.name, status);

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail: String = detail.chars().take(200).collect();
            return Err(EnhanceError::provider(
                &self.name,
                format!("HTTP {}: {}", status, detail),
            ));
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| EnhanceError::provider(&self.name, "reply has no message content"))?;

        parse_reply(&content, terms, &self.name)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
