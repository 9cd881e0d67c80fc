//! Failure classification and backoff for gateway retries.

use std::time::Duration;

use omniread_types::models::GatewayConfig;
use omniread_types::GatewayError;

use super::upstream::UpstreamError;

const RATE_LIMIT_MARKERS: [&str; 3] = ["429", "Quota exceeded", "RESOURCE_EXHAUSTED"];

/// How the gateway reacts to one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Cool the key down and retry with another one
    RateLimited,
    /// Back off and retry, the key is not at fault
    Transient,
    /// Safety block, never retried
    Safety,
    /// Anything else, propagated as is
    Other,
}

impl FailureClass {
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::Transient)
    }
}

/// Classify a provider failure. A 500 only counts as transient on
/// search-augmented calls, where the search tool fails intermittently.
pub fn classify(error: &UpstreamError, search_augmented: bool) -> FailureClass {
    if let UpstreamError::Blocked { .. } = error {
        return FailureClass::Safety;
    }

    let message = error.to_string();
    match error.status() {
        Some(429) => FailureClass::RateLimited,
        _ if RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m)) => FailureClass::RateLimited,
        Some(503) => FailureClass::Transient,
        Some(500) if search_augmented => FailureClass::Transient,
        _ if message.contains("SAFETY") => FailureClass::Safety,
        _ => FailureClass::Other,
    }
}

/// Map a classified failure onto the public error taxonomy.
pub fn to_gateway_error(class: FailureClass, error: &UpstreamError) -> GatewayError {
    let message = error.to_string();
    match class {
        FailureClass::RateLimited => GatewayError::RateLimited { message },
        FailureClass::Transient => GatewayError::ServiceUnavailable { message },
        FailureClass::Safety => GatewayError::SafetyFiltered { message },
        FailureClass::Other => GatewayError::Generic(message),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per logical call, first one included
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        }
    }

    /// Linear backoff after the `attempt`-th failure (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }

    pub fn has_budget(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
