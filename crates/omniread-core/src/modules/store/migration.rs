//! On-disk schema versions of the store file.
//!
//! v1: bare `{ name: value }` map with records as plain JSON values.
//! v2: `{ "version": 2, "records": { name: "<raw json>" } }`.

use std::collections::BTreeMap;

use omniread_types::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CURRENT_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct StoreFile {
    pub version: u32,
    #[serde(default)]
    pub records: BTreeMap<String, String>,
}

/// Parsed file contents and whether a migration rewrote them.
pub(super) struct Loaded {
    pub records: BTreeMap<String, String>,
    pub migrated_from: Option<u32>,
}

pub(super) fn load(content: &str) -> Result<Loaded, StoreError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| StoreError::ParseError { message: format!("Store file: {}", e) })?;

    let version = value.get("version").and_then(Value::as_u64).map(|v| v as u32);

    match version {
        None => Ok(Loaded { records: migrate_v1(value)?, migrated_from: Some(1) }),
        Some(found) if found > CURRENT_VERSION => {
            Err(StoreError::UnsupportedVersion { found, supported: CURRENT_VERSION })
        },
        Some(CURRENT_VERSION) => {
            let file: StoreFile = serde_json::from_value(value)
                .map_err(|e| StoreError::ParseError { message: format!("Store file: {}", e) })?;
            Ok(Loaded { records: file.records, migrated_from: None })
        },
        Some(found) => Err(StoreError::MigrationFailed {
            from: found,
            to: CURRENT_VERSION,
            message: "no migration path from this version".to_string(),
        }),
    }
}

fn migrate_v1(value: Value) -> Result<BTreeMap<String, String>, StoreError> {
    let Value::Object(map) = value else {
        return Err(StoreError::MigrationFailed {
            from: 1,
            to: CURRENT_VERSION,
            message: "v1 store must be a JSON object".to_string(),
        });
    };

    let mut records = BTreeMap::new();
    for (name, record) in map {
        let raw = serde_json::to_string(&record).map_err(|e| StoreError::MigrationFailed {
            from: 1,
            to: CURRENT_VERSION,
            message: format!("record {}: {}", name, e),
        })?;
        records.insert(name, raw);
    }
    Ok(records)
}
