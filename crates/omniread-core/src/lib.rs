//! # OmniRead Core
//!
//! Core logic for the OmniRead reader backend.
//!
//! ```text
//! omniread-core/src/
//! ├── gateway/     # key pool, retry/backoff, provider clients, fallback
//! ├── modules/     # local store, daily usage cap, config, logging, paths
//! ├── services/    # chapter, scanner, and reader-assist call sites
//! └── state.rs     # bootstrap wiring
//! ```
//!
//! Every generative call goes through [`gateway::AiGateway::execute`], which
//! checks the daily cap, rotates keys out of cooldown, and retries rate
//! limits and transient provider errors.

#![cfg_attr(
    test,
    allow(clippy::panic, clippy::float_cmp, clippy::assertions_on_result_states)
)]

pub mod error;
pub mod gateway;
pub mod modules;
pub mod services;
pub mod state;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use gateway::{AiGateway, CallOptions, KeyPool, KeyPoolOptions, Notice, PoolEvent};
pub use modules::store::{LocalStore, StoreKey};
pub use state::AppState;
