//! AI gateway: key rotation, retry/backoff, and the provider clients.

pub mod executor;
pub mod fallback;
pub mod key_pool;
pub mod notice;
pub mod retry;
pub mod upstream;

pub use executor::{AiGateway, CallOptions};
pub use key_pool::{KeyPool, KeyPoolOptions, PoolEvent};
pub use notice::{Notice, NoticeLevel};
pub use retry::{classify, FailureClass, RetryPolicy};
pub use upstream::{GeminiClient, GroqClient, UpstreamError};
