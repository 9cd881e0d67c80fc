//! Core domain models for OmniRead.
//!
//! This module contains all shared data structures used by the gateway and the store.

mod api_key;
mod config;
mod feature;
mod novel;
mod usage;

// Re-export all models
pub use api_key::{mask_key, ApiKey, KeyStatus, PoolStatus};
pub use config::{
    AppConfig, GatewayConfig, KeyPoolConfig, PrimaryProviderConfig, SecondaryProviderConfig,
};
pub use feature::{FeatureThresholds, SystemModule};
pub use novel::{
    AuditLog, Chapter, Draft, LibraryStatus, Novel, NovelStatus, ReadingSettings,
};
pub use usage::DailyUsage;
