//! Local data store: a flat namespace of JSON records persisted as one file.
//!
//! Writes are last-write-wins whole-record overwrites. Every mutation rewrites
//! the file atomically (temp file + rename); there are no transactions.

mod keys;
mod migration;


pub use keys::StoreKey;
pub use migration::CURRENT_VERSION;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use omniread_types::StoreError;
use parking_lot::RwLock;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::value::RawValue;

use migration::StoreFile;

pub struct LocalStore {
    path: Option<PathBuf>,
    records: RwLock<BTreeMap<String, String>>,
}

impl LocalStore {
    /// Open (or create) the store file at `path`, migrating older schemas.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let records = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| StoreError::ReadFailed { message: format!("{}: {}", path.display(), e) })?;
            let loaded = migration::load(&content)?;
            if let Some(from) = loaded.migrated_from {
                tracing::info!(
                    "Migrating store {} from v{} to v{}",
                    path.display(),
                    from,
                    CURRENT_VERSION
                );
                write_file(&path, &loaded.records)?;
            }
            loaded.records
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened store {} with {} record(s)", path.display(), records.len());
        Ok(Self { path: Some(path), records: RwLock::new(records) })
    }

    /// Store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self { path: None, records: RwLock::new(BTreeMap::new()) }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw JSON text of a record.
    pub fn get_raw(&self, name: &str) -> Option<String> {
        self.records.read().get(name).cloned()
    }

    /// Typed record; missing or malformed records read as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: StoreKey) -> Option<T> {
        self.get_named(key.as_str())
    }

    pub fn get_named<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let guard = self.records.read();
        let raw = guard.get(name)?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Ignoring malformed record {}: {}", name, e);
                None
            },
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<(), StoreError> {
        self.set_named(key.as_str(), value)
    }

    pub fn set_named<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StoreError::ParseError { message: format!("{}: {}", name, e) })?;
        self.write_record(name, raw)
    }

    /// Store already-serialized JSON verbatim.
    pub fn set_raw(&self, name: &str, raw: impl Into<String>) -> Result<(), StoreError> {
        let raw = raw.into();
        serde_json::from_str::<IgnoredAny>(&raw)
            .map_err(|e| StoreError::ParseError { message: format!("{}: {}", name, e) })?;
        self.write_record(name, raw)
    }

    /// Read-modify-write of one record under the write lock. Missing or
    /// malformed records start from `T::default()`.
    pub fn update<T, R, F>(&self, key: StoreKey, f: F) -> Result<R, StoreError>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> R,
    {
        let name = key.as_str();
        let mut guard = self.records.write();
        let mut value: T =
            guard.get(name).and_then(|raw| serde_json::from_str(raw).ok()).unwrap_or_default();
        let result = f(&mut value);
        let raw = serde_json::to_string(&value)
            .map_err(|e| StoreError::ParseError { message: format!("{}: {}", name, e) })?;
        guard.insert(name.to_string(), raw);
        self.persist(&guard)?;
        Ok(result)
    }

    /// Like [`update`](Self::update), but only persists when `f` returns
    /// `true`. Returns whether the record was written.
    pub fn update_if<T, F>(&self, key: StoreKey, f: F) -> Result<bool, StoreError>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> bool,
    {
        let name = key.as_str();
        let mut guard = self.records.write();
        let mut value: T =
            guard.get(name).and_then(|raw| serde_json::from_str(raw).ok()).unwrap_or_default();
        if !f(&mut value) {
            return Ok(false);
        }
        let raw = serde_json::to_string(&value)
            .map_err(|e| StoreError::ParseError { message: format!("{}: {}", name, e) })?;
        guard.insert(name.to_string(), raw);
        self.persist(&guard)?;
        Ok(true)
    }

    pub fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let mut guard = self.records.write();
        let removed = guard.remove(name).is_some();
        if removed {
            self.persist(&guard)?;
        }
        Ok(removed)
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.records.write();
        guard.clear();
        self.persist(&guard)
    }

    /// Drop every record except `keep`.
    pub fn retain_only(&self, keep: &[StoreKey]) -> Result<usize, StoreError> {
        let mut guard = self.records.write();
        let before = guard.len();
        guard.retain(|name, _| keep.iter().any(|k| k.as_str() == name));
        let dropped = before - guard.len();
        self.persist(&guard)?;
        Ok(dropped)
    }

    /// Dump every exported record as one pretty-printed JSON document.
    pub fn export(&self) -> Result<String, StoreError> {
        let guard = self.records.read();
        let mut dump: BTreeMap<&str, Box<RawValue>> = BTreeMap::new();

        for key in StoreKey::ALL.into_iter().filter(StoreKey::is_exported) {
            let Some(raw) = guard.get(key.as_str()) else {
                continue;
            };
            let value = RawValue::from_string(raw.clone())
                .map_err(|e| StoreError::ParseError { message: format!("{}: {}", key, e) })?;
            dump.insert(key.as_str(), value);
        }

        serde_json::to_string_pretty(&dump)
            .map_err(|e| StoreError::ParseError { message: format!("export: {}", e) })
    }

    /// Restore records from an `export` document. Only known records are
    /// written; the document must carry a profile or settings record.
    pub fn import(&self, document: &str) -> Result<usize, StoreError> {
        let dump: BTreeMap<String, Box<RawValue>> =
            serde_json::from_str(document).map_err(|e| StoreError::InvalidImport {
                message: format!("File corrupted: {}", e),
            })?;

        if !dump.contains_key(StoreKey::Profile.as_str())
            && !dump.contains_key(StoreKey::Settings.as_str())
        {
            return Err(StoreError::InvalidImport {
                message: "Document has neither profile nor settings".to_string(),
            });
        }

        let mut guard = self.records.write();
        let mut restored = 0;
        for (name, value) in dump {
            match StoreKey::from_name(&name) {
                Some(key) if key.is_exported() => {
                    guard.insert(name, value.get().to_string());
                    restored += 1;
                },
                _ => tracing::debug!("Skipping unknown record {} during import", name),
            }
        }
        self.persist(&guard)?;

        tracing::info!("Imported {} record(s)", restored);
        Ok(restored)
    }

    fn write_record(&self, name: &str, raw: String) -> Result<(), StoreError> {
        let mut guard = self.records.write();
        guard.insert(name.to_string(), raw);
        self.persist(&guard)
    }

    fn persist(&self, records: &BTreeMap<String, String>) -> Result<(), StoreError> {
        match &self.path {
            Some(path) => write_file(path, records),
            None => Ok(()),
        }
    }
}

fn write_file(path: &Path, records: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let file = StoreFile { version: CURRENT_VERSION, records: records.clone() };
    let content = serde_json::to_string_pretty(&file)
        .map_err(|e| StoreError::WriteFailed { message: format!("serialize: {}", e) })?;

    let temp_path = path.with_extension("json.tmp");
    if let Err(e) = fs::write(&temp_path, content) {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::WriteFailed { message: format!("temp file: {}", e) });
    }

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StoreError::WriteFailed { message: format!("replace {}: {}", path.display(), e) }
    })
}
