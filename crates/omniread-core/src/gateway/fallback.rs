use omniread_types::GatewayError;

use super::executor::{AiGateway, CallOptions};
use super::notice::Notice;

const REROUTE_NOTICE: &str = "Gemini Quota depleted. Rerouting to Groq Neural Network...";

impl AiGateway {
    /// Opt-in quota fallback for a finished primary call.
    ///
    /// When `primary` failed on a rate limit and a secondary key exists, the
    /// request is re-issued once on provider B as `prompt` and its text is
    /// turned into `T` with `map`. Other outcomes pass through untouched.
    pub async fn with_secondary_fallback<T>(
        &self,
        primary: Result<T, GatewayError>,
        prompt: &str,
        map: impl FnOnce(String) -> T,
    ) -> Result<T, GatewayError> {
        let error = match primary {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_quota() || !self.has_secondary_key() {
            return Err(error);
        }

        tracing::info!("Primary quota exhausted ({}), falling back to secondary provider", error);
        self.notify(Notice::info(REROUTE_NOTICE));

        self.execute_secondary(prompt, None, CallOptions::user()).await.map(map)
    }
}
