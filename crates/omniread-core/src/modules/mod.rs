//! Storage, configuration, and logging modules.

pub mod config;
pub mod daily_usage;
pub mod logger;
pub mod paths;
pub mod records;
pub mod store;
