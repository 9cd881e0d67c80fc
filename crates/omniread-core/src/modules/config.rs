//! Configuration file loading with legacy-field migration.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

use omniread_types::{AppConfig, ConfigError};

use super::paths::get_data_dir;

const CONFIG_FILE: &str = "omniread_config.json";

/// Environment variable holding the statically configured primary key.
pub const PRIMARY_KEY_ENV: &str = "API_KEY";
/// Environment variable holding the last-resort secondary key.
pub const SECONDARY_KEY_ENV: &str = "GROQ_API_KEY";

/// Legacy top-level fields and the section/field they moved to.
const LEGACY_FIELDS: &[(&str, &str, &str)] = &[
    ("daily_limit", "gateway", "daily_cap"),
    ("max_retries", "gateway", "max_attempts"),
    ("cooldown_seconds", "key_pool", "cooldown_secs"),
];

/// Load the application config from the data directory.
///
/// Migrates legacy flat fields into their sections and rewrites the file
/// when a migration happened.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_data_dir()?)
}

/// Load the config stored in `dir`; a missing file yields defaults.
pub fn load_config_from(dir: &Path) -> Result<AppConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE);

    if !config_path.exists() {
        return Ok(AppConfig::new());
    }

    let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::ParseError {
        message: format!("Failed to read config file: {}", e),
    })?;

    let mut v: Value = serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
        message: format!("Failed to parse config file: {}", e),
    })?;

    let modified = migrate_legacy_fields(&mut v);

    let config: AppConfig = serde_json::from_value(v).map_err(|e| ConfigError::ParseError {
        message: format!("Failed to convert migrated config: {}", e),
    })?;

    validate_config(&config)?;

    if modified {
        tracing::info!("Migrated legacy config fields in {}", config_path.display());
        if let Err(e) = save_config_to(dir, &config) {
            tracing::warn!("Failed to rewrite migrated config: {}", e);
        }
    }

    Ok(config)
}

fn migrate_legacy_fields(v: &mut Value) -> bool {
    let Some(root) = v.as_object_mut() else {
        return false;
    };

    let mut modified = false;
    for (legacy, section, field) in LEGACY_FIELDS {
        let Some(value) = root.remove(*legacy) else {
            continue;
        };
        modified = true;

        let section_value =
            root.entry(section.to_string()).or_insert_with(|| Value::Object(Map::new()));
        if let Some(obj) = section_value.as_object_mut() {
            // An explicit sectioned value wins over the legacy one
            obj.entry(field.to_string()).or_insert(value);
        }
    }
    modified
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|errors| {
        let field = errors
            .errors()
            .keys()
            .next()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "config".to_string());
        ConfigError::ValidationError { field, message: errors.to_string() }
    })
}

/// Save the application config to the data directory.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&get_data_dir()?, config)
}

/// Save `config` into `dir` atomically.
pub fn save_config_to(dir: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let config_path = dir.join(CONFIG_FILE);
    let temp_path = dir.join(format!("{}.tmp", CONFIG_FILE));

    let content = serde_json::to_string_pretty(config).map_err(|e| ConfigError::WriteError {
        message: format!("Failed to serialize config: {}", e),
    })?;

    // Atomic write
    fs::write(&temp_path, content).map_err(|e| ConfigError::WriteError {
        message: format!("Failed to write temp config: {}", e),
    })?;
    fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
        message: format!("Failed to save config: {}", e),
    })
}

/// Update specific fields in the config.
pub fn update_config<F>(updater: F) -> Result<AppConfig, ConfigError>
where
    F: FnOnce(&mut AppConfig),
{
    let mut config = load_config()?;
    updater(&mut config);
    validate_config(&config)?;
    save_config(&config)?;
    Ok(config)
}

/// Get the data directory path.
pub fn get_data_directory() -> Result<PathBuf, ConfigError> {
    get_data_dir()
}

/// Statically configured primary key, empty when unset.
pub fn primary_fallback_key() -> String {
    std::env::var(PRIMARY_KEY_ENV).unwrap_or_default()
}

/// Secondary key from the environment, empty when unset.
pub fn secondary_fallback_key() -> String {
    std::env::var(SECONDARY_KEY_ENV).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from(dir.path()).expect("defaults");
        assert_eq!(config, AppConfig::new());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::new();
        config.gateway.daily_cap = 7;
        config.key_pool.cooldown_secs = 30;
        save_config_to(dir.path(), &config).expect("save");

        let loaded = load_config_from(dir.path()).expect("load");
        assert_eq!(loaded.gateway.daily_cap, 7);
        assert_eq!(loaded.key_pool.cooldown_secs, 30);
        assert!(!dir.path().join(format!("{}.tmp", CONFIG_FILE)).exists());
    }

    #[test]
    fn test_legacy_fields_are_migrated_and_rewritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"daily_limit": 12, "cooldown_seconds": 90}"#,
        )
        .expect("write");

        let config = load_config_from(dir.path()).expect("load");
        assert_eq!(config.gateway.daily_cap, 12);
        assert_eq!(config.key_pool.cooldown_secs, 90);

        let rewritten = fs::read_to_string(dir.path().join(CONFIG_FILE)).expect("read");
        assert!(!rewritten.contains("daily_limit"));
        assert!(rewritten.contains("daily_cap"));
    }

    #[test]
    fn test_sectioned_value_wins_over_legacy() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{"daily_limit": 12, "gateway": {"daily_cap": 3}}"#,
        )
        .expect("write");

        let config = load_config_from(dir.path()).expect("load");
        assert_eq!(config.gateway.daily_cap, 3);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join(CONFIG_FILE), r#"{"gateway": {"max_attempts": 0}}"#)
            .expect("write");

        let err = load_config_from(dir.path()).expect_err("validation");
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
