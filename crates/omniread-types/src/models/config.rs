//! Application, gateway, and provider configuration models.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::FeatureThresholds;

// ============================================================================
// Gateway
// ============================================================================

/// Retry budget and daily cap of the AI gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GatewayConfig {
    /// Attempts per logical call, first try included
    #[validate(range(min = 1, max = 20))]
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * unit` before retrying
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
    /// User-initiated calls allowed per calendar day
    #[validate(range(min = 1))]
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,
    /// Model used for text and structured calls
    #[validate(length(min = 1))]
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_daily_cap() -> u32 {
    50
}

fn default_primary_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit_ms: default_backoff_unit_ms(),
            daily_cap: default_daily_cap(),
            primary_model: default_primary_model(),
        }
    }
}

// ============================================================================
// Key pool
// ============================================================================

/// Cooldown window applied to rate-limited keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct KeyPoolConfig {
    /// Seconds a rate-limited key is skipped
    #[validate(range(min = 1))]
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_cooldown_secs() -> u64 {
    60
}

impl Default for KeyPoolConfig {
    fn default() -> Self {
        Self { cooldown_secs: default_cooldown_secs() }
    }
}

// ============================================================================
// Providers
// ============================================================================

/// Provider A (generative API with text, image, speech, video, search).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct PrimaryProviderConfig {
    /// API base URL
    #[validate(url)]
    #[serde(default = "default_primary_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[validate(range(min = 1))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Text-to-speech model
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    /// Image generation model
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Video generation model
    #[serde(default = "default_video_model")]
    pub video_model: String,
    /// Seconds between long-running operation polls
    #[serde(default = "default_video_poll_interval_secs")]
    pub video_poll_interval_secs: u64,
    /// Polls before a video operation is abandoned
    #[validate(range(min = 1))]
    #[serde(default = "default_video_max_polls")]
    pub video_max_polls: u32,
}

fn default_primary_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_video_model() -> String {
    "veo-3.1-fast-generate-preview".to_string()
}

fn default_video_poll_interval_secs() -> u64 {
    5
}

fn default_video_max_polls() -> u32 {
    120
}

impl Default for PrimaryProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_primary_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            tts_model: default_tts_model(),
            image_model: default_image_model(),
            video_model: default_video_model(),
            video_poll_interval_secs: default_video_poll_interval_secs(),
            video_max_polls: default_video_max_polls(),
        }
    }
}

/// Provider B (chat-completion fallback).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SecondaryProviderConfig {
    /// API base URL
    #[validate(url)]
    #[serde(default = "default_secondary_base_url")]
    pub base_url: String,
    /// Chat model name
    #[validate(length(min = 1))]
    #[serde(default = "default_secondary_model")]
    pub model: String,
    /// Sampling temperature
    #[validate(range(min = 0.0, max = 2.0))]
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Completion token cap
    #[validate(range(min = 1))]
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// System message sent with every request
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
}

fn default_secondary_base_url() -> String {
    "https://api.groq.com".to_string()
}

fn default_secondary_model() -> String {
    "mixtral-8x7b-32768".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    3000
}

fn default_system_instruction() -> String {
    "You are a creative web novel writer.".to_string()
}

impl Default for SecondaryProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_secondary_base_url(),
            model: default_secondary_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_instruction: default_system_instruction(),
        }
    }
}

// ============================================================================
// Application
// ============================================================================

/// Top-level configuration persisted in the data directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct AppConfig {
    /// Gateway retry budget and daily cap
    #[serde(default)]
    #[validate(nested)]
    pub gateway: GatewayConfig,
    /// Key cooldown settings
    #[serde(default)]
    #[validate(nested)]
    pub key_pool: KeyPoolConfig,
    /// Health thresholds per feature
    #[serde(default)]
    #[validate(nested)]
    pub features: FeatureThresholds,
    /// Provider A settings
    #[serde(default)]
    #[validate(nested)]
    pub primary: PrimaryProviderConfig,
    /// Provider B settings
    #[serde(default)]
    #[validate(nested)]
    pub secondary: SecondaryProviderConfig,
}

impl AppConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap_or_default();
        assert_eq!(config.gateway.max_attempts, 5);
        assert_eq!(config.gateway.daily_cap, 50);
        assert_eq!(config.key_pool.cooldown_secs, 60);
        assert_eq!(config.secondary.max_tokens, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let raw = r#"{"gateway":{"daily_cap":2}}"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap_or_default();
        assert_eq!(config.gateway.daily_cap, 2);
        assert_eq!(config.gateway.backoff_unit_ms, 1000);
    }

    #[test]
    fn test_zero_attempts_fails_validation() {
        let mut config = AppConfig::new();
        config.gateway.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
