use std::sync::Arc;

use omniread_types::models::{mask_key, SecondaryProviderConfig};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::{read_json, UpstreamError};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Provider B chat-completion client bound to one API key.
#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    config: Arc<SecondaryProviderConfig>,
    api_key: String,
}

impl GroqClient {
    pub fn new(http: Client, config: Arc<SecondaryProviderConfig>, api_key: impl Into<String>) -> Self {
        Self { http, config, api_key: api_key.into() }
    }

    /// One chat completion; `system` overrides the configured instruction.
    /// An answer without choices reads as an empty string.
    pub async fn chat(&self, prompt: &str, system: Option<&str>) -> Result<String, UpstreamError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.unwrap_or(&self.config.system_instruction),
                },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/openai/v1/chat/completions", self.config.base_url.trim_end_matches('/'));
        tracing::debug!("POST {} with key {}", url, mask_key(&self.api_key));

        let response = self.http.post(&url).bearer_auth(&self.api_key).json(&request).send().await?;
        let body = read_json(response).await?;

        Ok(body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}
