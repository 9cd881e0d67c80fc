//! Typed helpers over the store for library, history, directory, drafts,
//! settings, and the admin audit trail.

use chrono::Utc;
use omniread_types::models::{AuditLog, Draft, LibraryStatus, ReadingSettings};
use omniread_types::{Novel, StoreError};
use serde_json::{Map, Value};

use super::store::{LocalStore, StoreKey};

const HISTORY_LIMIT: usize = 50;
const DIRECTORY_LIMIT: usize = 300;
const AUDIT_LOG_LIMIT: usize = 100;
const SYSTEM_ADMIN: &str = "system";

// ============================================================================
// History
// ============================================================================

pub fn get_history(store: &LocalStore) -> Vec<Novel> {
    store.get(StoreKey::History).unwrap_or_default()
}

/// Move `novel` to the front of the reading history. Without a chapter id
/// the previously recorded last-read chapter is kept.
pub fn add_to_history(
    store: &LocalStore,
    novel: &Novel,
    chapter_id: Option<&str>,
) -> Result<(), StoreError> {
    store.update(StoreKey::History, |history: &mut Vec<Novel>| {
        let mut entry = novel.clone();
        match chapter_id {
            Some(id) => entry.last_read_chapter_id = Some(id.to_string()),
            None => {
                if let Some(existing) = history.iter().find(|n| n.id == novel.id) {
                    if existing.last_read_chapter_id.is_some() {
                        entry.last_read_chapter_id = existing.last_read_chapter_id.clone();
                    }
                }
            },
        }
        history.retain(|n| n.id != novel.id);
        history.insert(0, entry);
        history.truncate(HISTORY_LIMIT);
    })
}

// ============================================================================
// Library
// ============================================================================

pub fn get_library(store: &LocalStore) -> Vec<Novel> {
    store.get(StoreKey::Library).unwrap_or_default()
}

/// Add or remove `novel`; returns whether it is in the library afterwards.
pub fn toggle_library(store: &LocalStore, novel: &Novel) -> Result<bool, StoreError> {
    store.update(StoreKey::Library, |library: &mut Vec<Novel>| {
        if library.iter().any(|n| n.id == novel.id) {
            library.retain(|n| n.id != novel.id);
            false
        } else {
            library.insert(0, novel.clone());
            true
        }
    })
}

pub fn is_in_library(store: &LocalStore, novel_id: &str) -> bool {
    get_library(store).iter().any(|n| n.id == novel_id)
}

pub fn update_library_status(
    store: &LocalStore,
    novel_id: &str,
    status: LibraryStatus,
) -> Result<(), StoreError> {
    store.update(StoreKey::Library, |library: &mut Vec<Novel>| {
        for novel in library.iter_mut().filter(|n| n.id == novel_id) {
            novel.library_status = Some(status);
        }
    })
}

// ============================================================================
// Directory (aggregator cache)
// ============================================================================

pub fn get_directory(store: &LocalStore) -> Vec<Novel> {
    store.get(StoreKey::Directory).unwrap_or_default()
}

/// Merge scanned novels into the directory, keyed by lowercase title.
///
/// A known title is refreshed only when the incoming entry was updated
/// "Just now" or lists more chapters; its identity and metadata stay.
pub fn add_to_directory(store: &LocalStore, novels: &[Novel]) -> Result<usize, StoreError> {
    store.update(StoreKey::Directory, |directory: &mut Vec<Novel>| {
        let mut added = 0;
        for incoming in novels {
            let title = incoming.title.to_lowercase();
            match directory.iter_mut().find(|n| n.title.to_lowercase() == title) {
                Some(existing) => {
                    if incoming.last_updated == "Just now"
                        || incoming.chapters.len() > existing.chapters.len()
                    {
                        existing.last_updated = incoming.last_updated.clone();
                        existing.chapters = incoming.chapters.clone();
                        existing.views = incoming.views.clone();
                    }
                },
                None => {
                    directory.push(incoming.clone());
                    added += 1;
                },
            }
        }
        directory.truncate(DIRECTORY_LIMIT);
        added
    })
}

pub fn update_novel_in_directory(store: &LocalStore, novel: &Novel) -> Result<(), StoreError> {
    store.update(StoreKey::Directory, |directory: &mut Vec<Novel>| {
        for entry in directory.iter_mut().filter(|n| n.id == novel.id) {
            *entry = novel.clone();
        }
    })?;
    log_admin_action(store, "UPDATE_NOVEL", &novel.title, Some("Updated metadata"))
}

pub fn delete_novel_from_directory(store: &LocalStore, novel_id: &str) -> Result<bool, StoreError> {
    let removed = store.update(StoreKey::Directory, |directory: &mut Vec<Novel>| {
        let position = directory.iter().position(|n| n.id == novel_id)?;
        Some(directory.remove(position))
    })?;

    match removed {
        Some(novel) => {
            log_admin_action(store, "DELETE_NOVEL", &novel.title, None)?;
            Ok(true)
        },
        None => Ok(false),
    }
}

// ============================================================================
// Drafts
// ============================================================================

pub fn get_drafts(store: &LocalStore) -> Vec<Draft> {
    store.get(StoreKey::Drafts).unwrap_or_default()
}

/// Insert or replace a draft by id, stamping the edit time.
pub fn save_draft(store: &LocalStore, draft: &Draft) -> Result<(), StoreError> {
    let mut stamped = draft.clone();
    stamped.last_edited = Some(Utc::now());

    store.update(StoreKey::Drafts, |drafts: &mut Vec<Draft>| {
        match drafts.iter_mut().find(|d| d.id == stamped.id) {
            Some(existing) => *existing = stamped,
            None => drafts.insert(0, stamped),
        }
    })
}

pub fn delete_draft(store: &LocalStore, draft_id: &str) -> Result<(), StoreError> {
    store.update(StoreKey::Drafts, |drafts: &mut Vec<Draft>| {
        drafts.retain(|d| d.id != draft_id);
    })
}

// ============================================================================
// Settings
// ============================================================================

/// Stored settings layered over defaults, field by field.
pub fn get_settings(store: &LocalStore) -> ReadingSettings {
    let Some(Value::Object(stored)) = store.get::<Value>(StoreKey::Settings) else {
        return ReadingSettings::default();
    };

    let mut merged = match serde_json::to_value(ReadingSettings::default()) {
        Ok(Value::Object(defaults)) => defaults,
        _ => Map::new(),
    };
    merged.extend(stored);

    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

pub fn save_settings(store: &LocalStore, settings: &ReadingSettings) -> Result<(), StoreError> {
    store.set(StoreKey::Settings, settings)
}

// ============================================================================
// Audit trail
// ============================================================================

pub fn get_audit_logs(store: &LocalStore) -> Vec<AuditLog> {
    store.get(StoreKey::AuditLogs).unwrap_or_default()
}

/// Prepend an audit entry, keeping the newest 100.
pub fn log_admin_action(
    store: &LocalStore,
    action: &str,
    target: &str,
    details: Option<&str>,
) -> Result<(), StoreError> {
    let entry = AuditLog::new(action, SYSTEM_ADMIN, target, details);
    tracing::info!("Admin action {} on {}", action, target);

    store.update(StoreKey::AuditLogs, |logs: &mut Vec<AuditLog>| {
        logs.insert(0, entry);
        logs.truncate(AUDIT_LOG_LIMIT);
    })
}

/// Purge caches while keeping profile, settings, users, market, and site config.
pub fn clear_system_cache(store: &LocalStore) -> Result<usize, StoreError> {
    let dropped = store.retain_only(&StoreKey::PRESERVED_ON_CLEAR)?;
    log_admin_action(store, "SYSTEM_CLEAR", "Cache", Some("Manual admin purge"))?;
    Ok(dropped)
}
