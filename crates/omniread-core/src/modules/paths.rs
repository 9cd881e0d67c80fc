//! Path utilities for local data storage.

use std::fs;
use std::path::PathBuf;

use omniread_types::ConfigError;

/// Directory name for data storage.
pub const DATA_DIR: &str = ".omniread";
/// Filename for the record store.
pub const STORE_FILE: &str = "omniread_store.json";
/// Directory name for rolling log files.
pub const LOGS_DIR: &str = "logs";

/// Get the data directory path.
///
/// Priority:
/// 1. `OMNIREAD_DATA_DIR` environment variable (for container deployments)
/// 2. `~/.omniread` (default for desktop usage)
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = if let Ok(custom_dir) = std::env::var("OMNIREAD_DATA_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::NotFound {
            path: "home directory".to_string(),
        })?;
        home.join(DATA_DIR)
    };

    ensure_dir(data_dir)
}

/// Get the store file path inside the data directory.
pub fn get_store_path() -> Result<PathBuf, ConfigError> {
    Ok(get_data_dir()?.join(STORE_FILE))
}

/// Get the log directory path.
pub fn get_log_dir() -> Result<PathBuf, ConfigError> {
    ensure_dir(get_data_dir()?.join(LOGS_DIR))
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        fs::create_dir_all(&dir).map_err(|e| ConfigError::WriteError {
            message: format!("Failed to create directory {}: {}", dir.display(), e),
        })?;
    }
    Ok(dir)
}
