//! HTTP clients for the two generative providers.

mod gemini;
mod groq;

pub use gemini::{GeminiClient, GroundedAnswer, SpeechVoice, WebSource};
pub use groq::GroqClient;

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Failure of a single provider request, before classification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// Non-2xx response
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Prompt or candidate stopped by provider safety filters
    #[error("Blocked by {reason}")]
    Blocked { reason: String },

    /// Connection, TLS, or timeout failure
    #[error("Request failed: {0}")]
    Transport(String),

    /// 2xx response whose body could not be used
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Long-running operation did not finish within its poll budget
    #[error("{operation} did not complete after {polls} polls")]
    Timeout { operation: String, polls: u32 },
}

impl UpstreamError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build from a failed response body, preferring the provider's own
    /// `error.message` over the raw text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = extract_error_message(body).unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.chars().take(500).collect()
            }
        });
        Self::Http { status, message }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Http { status: status.as_u16(), message: e.to_string() },
            None if e.is_decode() => Self::Malformed(e.to_string()),
            None => Self::Transport(e.to_string()),
        }
    }
}

/// `{"error": {"message": ..., "status": ...}}`, shared by both providers.
fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;
    let message = error.get("message").and_then(Value::as_str).or_else(|| error.as_str())?;

    match error.get("status").and_then(Value::as_str) {
        Some(status) if !message.contains(status) => Some(format!("{}: {}", status, message)),
        _ => Some(message.to_string()),
    }
}

/// Build the shared HTTP client used by both providers.
pub fn build_http_client(timeout_secs: u64) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(5)))
        .tcp_nodelay(true)
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

/// Check the status of `response` and decode its JSON body.
async fn read_json(response: reqwest::Response) -> Result<Value, UpstreamError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(UpstreamError::from_response(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| UpstreamError::Malformed(e.to_string()))
}
