//! Language-model completion capability
//!
//! The semantic extractor only needs "system prompt + user prompt in,
//! text + token usage out". [`CompletionClient`] is that seam;
//! [`OpenAiCompatibleClient`] speaks the `/chat/completions` protocol that
//! OpenAI and most self-hosted gateways expose.

use std::ops::{Add, AddAssign};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::CompletionError;

/// Token accounting for one or more completion calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Usage with total derived from the parts
    #[must_use]
    pub const fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Text returned by a completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Capability: answer a system + user prompt pair
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, CompletionError>;

    /// Model identifier, for logs and cache keys
    fn model(&self) -> &str;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for std::sync::Arc<T> {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, CompletionError> {
        (**self).complete(system, user).await
    }

    fn model(&self) -> &str {
        (**self).model()
    }
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleClient {
    /// Default request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    /// Create a client for `base_url` (e.g. `https://api.openai.com/v1`)
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            temperature: 0.0,
            max_tokens: 16_384,
        })
    }

    /// Bearer token sent with every request
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Completion token cap
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, CompletionError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "response_format": { "type": "json_object" },
        });

        tracing::info!(
            model = %self.model,
            prompt_chars = system.chars().count() + user.chars().count(),
            "sending completion request"
        );

        let mut request = self.http.post(self.endpoint()).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response.json().await?;
        let content = extract_content(&json["choices"][0]["message"]["content"])
            .filter(|c| !c.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)?;

        let usage = &json["usage"];
        let usage = TokenUsage {
            prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0),
            completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
            total_tokens: usage["total_tokens"].as_u64().unwrap_or(0),
        };

        Ok(Completion { content, usage })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Message content is either a string or a list of `{text}` segments
fn extract_content(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(segments) => Some(
            segments
                .iter()
                .filter_map(|segment| segment["text"].as_str())
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_adds_componentwise() {
        let mut total = TokenUsage::new(10, 5);
        total += TokenUsage::new(1, 2);
        assert_eq!(total, TokenUsage::new(11, 7));
        assert_eq!(total.total_tokens, 18);
    }

    #[test]
    fn content_accepts_segment_lists() {
        let value = json!([{ "type": "text", "text": "{\"changes\"" }, { "text": ": []}" }]);
        assert_eq!(extract_content(&value).as_deref(), Some("{\"changes\": []}"));
        assert_eq!(extract_content(&json!("x")).as_deref(), Some("x"));
        assert!(extract_content(&json!(null)).is_none());
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client =
            OpenAiCompatibleClient::new("http://localhost:8080/v1/", "gpt-4o", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(client.model(), "gpt-4o");
    }
}
