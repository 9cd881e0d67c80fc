use std::future::Future;
use std::sync::Arc;

use omniread_types::models::{mask_key, PrimaryProviderConfig, SecondaryProviderConfig};
use omniread_types::{AppConfig, FeatureThresholds, GatewayError, SystemModule};
use reqwest::Client;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::key_pool::KeyPool;
use super::notice::Notice;
use super::retry::{classify, to_gateway_error, FailureClass, RetryPolicy};
use super::upstream::{GeminiClient, GroqClient, UpstreamError};
use crate::modules::daily_usage::DailyLimiter;

const NOTICE_CHANNEL_CAPACITY: usize = 32;

/// Per-call switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Do not count the call against the daily cap
    pub skip_limit_check: bool,
    /// System-initiated call; failures are not announced to the reader
    pub background: bool,
    /// Call uses the web search tool (500s become retryable)
    pub search_augmented: bool,
}

impl CallOptions {
    /// Reader-initiated call, counted and announced.
    pub fn user() -> Self {
        Self::default()
    }

    /// Scheduled system work: uncounted and silent.
    pub fn background() -> Self {
        Self { skip_limit_check: true, background: true, search_augmented: false }
    }

    pub fn with_search(mut self) -> Self {
        self.search_augmented = true;
        self
    }
}

/// Orchestrates generative calls: daily cap, key rotation, retry and
/// backoff on provider A, plus the single-shot provider B path.
pub struct AiGateway {
    http: Client,
    primary: Arc<PrimaryProviderConfig>,
    secondary: Arc<SecondaryProviderConfig>,
    model: String,
    daily_cap: u32,
    features: FeatureThresholds,
    policy: RetryPolicy,
    keys: Arc<KeyPool>,
    secondary_keys: Arc<KeyPool>,
    limiter: Arc<DailyLimiter>,
    notices: broadcast::Sender<Notice>,
}

impl AiGateway {
    pub fn new(
        config: &AppConfig,
        http: Client,
        keys: Arc<KeyPool>,
        secondary_keys: Arc<KeyPool>,
        limiter: Arc<DailyLimiter>,
    ) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            http,
            primary: Arc::new(config.primary.clone()),
            secondary: Arc::new(config.secondary.clone()),
            model: config.gateway.primary_model.clone(),
            daily_cap: config.gateway.daily_cap,
            features: config.features.clone(),
            policy: RetryPolicy::from_config(&config.gateway),
            keys,
            secondary_keys,
            limiter,
            notices,
        }
    }

    pub fn keys(&self) -> &Arc<KeyPool> {
        &self.keys
    }

    pub fn secondary_keys(&self) -> &Arc<KeyPool> {
        &self.secondary_keys
    }

    pub fn limiter(&self) -> &Arc<DailyLimiter> {
        &self.limiter
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn health(&self) -> u8 {
        self.keys.health()
    }

    /// Load-shedding gate over the primary pool's health.
    pub fn is_feature_enabled(&self, module: SystemModule) -> bool {
        self.keys.is_feature_enabled(&self.features, module)
    }

    pub fn has_secondary_key(&self) -> bool {
        self.secondary_keys.has_any_key()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn notice_stream(&self) -> BroadcastStream<Notice> {
        BroadcastStream::new(self.notices.subscribe())
    }

    pub(super) fn notify(&self, notice: Notice) {
        let _ = self.notices.send(notice);
    }

    /// Client for `key` with the default text model.
    pub fn primary_client(&self, key: &str) -> GeminiClient {
        GeminiClient::new(self.http.clone(), Arc::clone(&self.primary), &self.model, key)
    }

    /// Run `operation` against provider A with rotation and retries.
    ///
    /// The daily cap is consumed once per logical call, before the first
    /// attempt. Rate limits cool the failing key down and retry on the next
    /// one; transient errors back off linearly and keep the key. Everything
    /// else fails on the spot.
    pub async fn execute<T, F, Fut>(&self, options: CallOptions, operation: F) -> Result<T, GatewayError>
    where
        F: Fn(GeminiClient) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        if !options.skip_limit_check {
            self.check_daily_cap(!options.background)?;
        }

        let mut attempt = 0;
        let mut last_error = None;
        loop {
            attempt += 1;

            let key = self.keys.select_key();
            if key.is_empty() {
                // Every key cooled down during this call: report the rate limit
                let error = last_error.unwrap_or(GatewayError::NoKeyAvailable);
                return Err(self.fail(error, options));
            }

            let error = match operation(self.primary_client(&key)).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("Call succeeded on attempt {}/{}", attempt, self.policy.max_attempts);
                    }
                    return Ok(value);
                },
                Err(error) => error,
            };

            let class = classify(&error, options.search_augmented);
            if !class.is_retryable() {
                tracing::warn!("Non-retryable failure with key {}: {}", mask_key(&key), error);
                return Err(self.fail(to_gateway_error(class, &error), options));
            }

            if class == FailureClass::RateLimited {
                self.keys.mark_rate_limited(&key);
            }

            let gateway_error = to_gateway_error(class, &error);
            if !self.policy.has_budget(attempt) {
                tracing::warn!("Retries exhausted after {} attempt(s): {}", attempt, error);
                return Err(self.fail(gateway_error, options));
            }
            last_error = Some(gateway_error);

            tracing::info!(
                "Retrying operation (attempt {}/{}) after {:?}: {}",
                attempt + 1,
                self.policy.max_attempts,
                class,
                error
            );

            if class == FailureClass::Transient {
                tokio::time::sleep(self.policy.backoff_for(attempt)).await;
            }
        }
    }

    /// Single-shot chat completion on provider B using the secondary pool.
    /// Counts against the daily cap unless skipped; never retried.
    pub async fn execute_secondary(
        &self,
        prompt: &str,
        system: Option<&str>,
        options: CallOptions,
    ) -> Result<String, GatewayError> {
        let key = self.secondary_keys.select_key();
        if key.is_empty() {
            return Err(GatewayError::NoKeyAvailable);
        }

        if !options.skip_limit_check {
            self.check_daily_cap(false)?;
        }

        let client = GroqClient::new(self.http.clone(), Arc::clone(&self.secondary), &key);
        client.chat(prompt, system).await.map_err(|error| {
            tracing::warn!("Secondary provider failed with key {}: {}", mask_key(&key), error);
            to_gateway_error(classify(&error, false), &error)
        })
    }

    fn check_daily_cap(&self, announce: bool) -> Result<(), GatewayError> {
        match self.limiter.check_and_increment(self.daily_cap) {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!("Daily cap of {} calls reached", self.daily_cap);
                let error = GatewayError::QuotaExceeded { cap: self.daily_cap };
                if announce {
                    self.notify(Notice::error(error.user_message()));
                }
                Err(error)
            },
            Err(e) => {
                // Counter is best effort
                tracing::error!("Daily usage counter unavailable: {}", e);
                Ok(())
            },
        }
    }

    /// Announce a terminal failure unless the call is silent.
    fn fail(&self, error: GatewayError, options: CallOptions) -> GatewayError {
        if !options.background {
            self.notify(Notice::error(error.user_message()));
        }
        error
    }
}
