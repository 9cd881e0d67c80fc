//! Typed error definitions for OmniRead.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for IPC and UI notifications via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants
//! - **Composable** via thiserror derive macros

mod config;
mod gateway;
mod store;

pub use config::ConfigError;
pub use gateway::GatewayError;
pub use store::StoreError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a generative call failure
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Wraps a local data store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;
