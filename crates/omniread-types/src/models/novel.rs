//! Library records persisted in the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication status of a novel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NovelStatus {
    /// Still releasing chapters
    #[default]
    Ongoing,
    /// Finished
    Completed,
    /// Paused by the author
    Hiatus,
}

/// Reader's shelf for a library entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryStatus {
    /// Currently reading
    Reading,
    /// Planned
    PlanToRead,
    /// Finished
    Completed,
    /// Abandoned
    Dropped,
}

/// Chapter listing entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Chapter identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Ordinal number
    pub number: u32,
    /// Human readable release date
    #[serde(default)]
    pub release_date: String,
}

/// Aggregated or generated novel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Novel {
    /// Unique identifier
    pub id: String,
    /// Title
    pub title: String,
    /// Author name
    #[serde(default)]
    pub author: String,
    /// Cover image URL
    #[serde(default)]
    pub cover_url: String,
    /// Blurb
    #[serde(default)]
    pub description: String,
    /// Genre tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Origin site
    #[serde(default)]
    pub source: String,
    /// Average rating
    #[serde(default)]
    pub rating: f32,
    /// Publication status
    #[serde(default)]
    pub status: NovelStatus,
    /// Display view count
    #[serde(default)]
    pub views: String,
    /// Chapter listing
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    /// Human readable last update
    #[serde(default)]
    pub last_updated: String,
    /// Last chapter the reader opened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_chapter_id: Option<String>,
    /// Shelf in the reader's library
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_status: Option<LibraryStatus>,
    /// Source page for web search results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

/// Work-in-progress story in the studio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Draft identifier
    pub id: String,
    /// Working title
    pub title: String,
    /// Pitch
    #[serde(default)]
    pub description: String,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Body text
    #[serde(default)]
    pub content: String,
    /// Last save time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited: Option<DateTime<Utc>>,
}

/// Administrative action record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    /// Entry identifier
    pub id: String,
    /// Action code, e.g. `DELETE_NOVEL`
    pub action: String,
    /// Acting administrator
    pub admin: String,
    /// Subject of the action
    pub target: String,
    /// When the action happened
    pub timestamp: DateTime<Utc>,
    /// Free-form details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AuditLog {
    /// New entry with a random id and the current time.
    pub fn new(action: &str, admin: &str, target: &str, details: Option<&str>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action: action.to_string(),
            admin: admin.to_string(),
            target: target.to_string(),
            timestamp: Utc::now(),
            details: details.map(str::to_string),
        }
    }
}

/// Reader typography settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadingSettings {
    /// Font size in px
    pub font_size: u32,
    /// `sans` or `serif`
    pub font_family: String,
    /// Theme name
    pub theme: String,
    /// Line height multiplier
    pub line_height: f32,
    /// Space between paragraphs in em
    pub paragraph_spacing: f32,
    /// `normal` or `bold`
    pub font_weight: String,
}

impl Default for ReadingSettings {
    fn default() -> Self {
        Self {
            font_size: 18,
            font_family: "sans".to_string(),
            theme: "dark".to_string(),
            line_height: 1.8,
            paragraph_spacing: 1.5,
            font_weight: "normal".to_string(),
        }
    }
}
