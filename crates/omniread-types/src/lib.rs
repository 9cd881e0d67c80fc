//! # OmniRead Types
//!
//! Core types, models, and error definitions for OmniRead.
//!
//! This crate provides the foundational type system shared by the gateway
//! and the local data store:
//!
//! - **`error`** - Typed error taxonomy for generative calls, storage, and configuration
//! - **`models`** - Domain models (ApiKey, feature gating, config, library records)
//!
//! ## Architecture Role
//!
//! `omniread-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!     omniread-types (this crate)
//!             │
//!             ▼
//!       omniread-core
//!   (key pool, gateway, store)
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for persistence and IPC
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, GatewayError, Result, StoreError, TypedError};

// Re-export core model types
pub use models::{
    ApiKey, AppConfig, DailyUsage, FeatureThresholds, KeyStatus, Novel, PoolStatus, SystemModule,
};
