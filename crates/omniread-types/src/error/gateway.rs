//! Generative call errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy of a logical generative call.
///
/// `RateLimited` and `ServiceUnavailable` are retried inside the gateway up to
/// the retry budget; everything else surfaces on the first occurrence.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum GatewayError {
    /// Provider rejected the key with 429 / quota exhaustion
    #[error("Rate limited: {message}")]
    RateLimited {
        /// Last provider message seen
        message: String,
    },

    /// Provider is temporarily unavailable (503, search tool 500)
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        /// Last provider message seen
        message: String,
    },

    /// Prompt or output blocked by provider safety filters
    #[error("Content blocked by safety filters: {message}")]
    SafetyFiltered {
        /// Block reason reported by the provider
        message: String,
    },

    /// Local per-day usage cap reached, no provider was contacted
    #[error("Daily AI limit of {cap} calls reached")]
    QuotaExceeded {
        /// Configured daily cap
        cap: u32,
    },

    /// Neither pooled keys nor a fallback key are available
    #[error("No API key available")]
    NoKeyAvailable,

    /// Any other failure (network, malformed request, provider 4xx)
    #[error("{0}")]
    Generic(String),
}

impl GatewayError {
    /// Errors the gateway retries locally.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::ServiceUnavailable { .. })
    }

    /// Quota-type failures that justify re-issuing a call on the secondary provider.
    pub const fn is_quota(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Categorized message shown to the reader as a transient notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "Neural network overloaded. Switching nodes...",
            Self::ServiceUnavailable { .. } => "AI service temporarily unavailable.",
            Self::SafetyFiltered { .. } => "Content filtered by safety protocols.",
            Self::QuotaExceeded { .. } => {
                "Daily AI Limit Reached. OmniRead conserves resources by limiting daily generations. Please try again tomorrow."
            },
            Self::NoKeyAvailable => {
                "No API Key found. Please add a key in Profile > Core to enable AI features."
            },
            Self::Generic(_) => "An error occurred in the neural link.",
        }
    }
}
