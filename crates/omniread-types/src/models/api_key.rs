//! API key pool entries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Date-only layouts written by older releases (locale date strings).
const LEGACY_DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%d.%m.%Y", "%Y-%m-%d", "%d/%m/%Y"];

/// A user-supplied provider key. Uniqueness is enforced on `key`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    /// Secret key value
    pub key: String,
    /// Display label shown in settings
    pub label: String,
    /// When the key was added to the pool
    #[serde(deserialize_with = "deserialize_added_at")]
    pub added_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
}

/// Accepts RFC 3339, legacy locale date strings, and epoch milliseconds.
/// Anything unreadable is stamped with the load time so the key survives.
fn deserialize_added_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => parse_timestamp(&text),
        RawTimestamp::Millis(millis) => DateTime::from_timestamp_millis(millis),
    };
    Ok(parsed.unwrap_or_else(Utc::now))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(value.with_timezone(&Utc));
    }
    LEGACY_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl ApiKey {
    /// Create a key stamped with the current time.
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self { key: key.into(), label: label.into(), added_at: Utc::now() }
    }

    /// First eight characters followed by an ellipsis, safe for logs.
    pub fn masked(&self) -> String {
        mask_key(&self.key)
    }
}

/// Masks a raw key for logging.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(8).collect();
    format!("{prefix}...")
}

/// Pool entry with its derived cooldown flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatus {
    /// Secret key value
    pub key: String,
    /// Display label
    pub label: String,
    /// When the key was added
    pub added_at: DateTime<Utc>,
    /// Whether the key is currently rate-limited
    pub in_cooldown: bool,
}

impl KeyStatus {
    /// Derive the status view of a pooled key.
    pub fn from_key(key: &ApiKey, in_cooldown: bool) -> Self {
        Self {
            key: key.key.clone(),
            label: key.label.clone(),
            added_at: key.added_at,
            in_cooldown,
        }
    }
}

/// Aggregate counts of a key pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PoolStatus {
    /// Keys in the pool
    pub total: usize,
    /// Keys not cooling down
    pub active: usize,
    /// Keys cooling down
    pub exhausted: usize,
}

impl PoolStatus {
    /// Build from totals; `exhausted` is derived.
    pub const fn new(total: usize, active: usize) -> Self {
        Self { total, active, exhausted: total.saturating_sub(active) }
    }
}
