use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use omniread_types::models::{Chapter, NovelStatus};
use omniread_types::{Novel, SystemModule};
use serde::Deserialize;
use serde_json::json;

use crate::gateway::{AiGateway, CallOptions};
use crate::modules::records;
use crate::modules::store::LocalStore;

const SCAN_CHAPTER_COUNT: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Trending,
    Updated,
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trending => write!(f, "trending"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScannedNovel {
    title: String,
    author: String,
    description: String,
    tags: Vec<String>,
    rating: Option<f32>,
    latest_chapter: Option<String>,
    time_ago: Option<String>,
}

/// Background crawler that discovers novels on a source site through
/// grounded search and feeds the directory cache.
pub struct ScannerService {
    gateway: Arc<AiGateway>,
    store: Arc<LocalStore>,
}

impl ScannerService {
    pub fn new(gateway: Arc<AiGateway>, store: Arc<LocalStore>) -> Self {
        Self { gateway, store }
    }

    /// Scan `source` for novels. Runs as an uncounted, silent background
    /// call; skipped while the key pool is too unhealthy for scanning.
    /// Found novels are merged into the directory cache.
    pub async fn scan_source(&self, source: &str, kind: ScanKind) -> Vec<Novel> {
        if !self.gateway.is_feature_enabled(SystemModule::Scanning) {
            tracing::warn!("Scanner disabled due to low key pool health ({}%)", self.gateway.health());
            return Vec::new();
        }

        let query = search_query(source, kind);
        let intro = extraction_intro(source, kind);
        let (query, intro) = (query.as_str(), intro.as_str());

        let result = self
            .gateway
            .execute(CallOptions::background().with_search(), |client| async move {
                let grounded = client.generate_grounded(query).await?;
                tracing::debug!("Grounded scan cited {} source(s)", grounded.sources.len());

                let prompt = format!(
                    "{}\nSearch results: \"{}\"\nTranslate any non-English titles, descriptions, and tags into English. Return JSON.",
                    intro, grounded.text
                );
                client.generate_json::<Vec<ScannedNovel>>(&prompt, scan_schema()).await
            })
            .await;

        let scanned = match result {
            Ok(scanned) => scanned,
            Err(e) => {
                tracing::debug!("Scan of {} ({}) skipped: {}", source, kind, e);
                return Vec::new();
            },
        };

        let stamp = Utc::now().timestamp_millis();
        let novels: Vec<Novel> = scanned
            .into_iter()
            .filter(|item| !item.title.trim().is_empty())
            .enumerate()
            .map(|(i, item)| to_novel(item, source, kind, i, stamp))
            .collect();

        if let Err(e) = records::add_to_directory(&self.store, &novels) {
            tracing::warn!("Failed to cache scan results: {}", e);
        }
        tracing::info!("Scanned {} novel(s) from {} ({})", novels.len(), source, kind);
        novels
    }
}

fn search_query(source: &str, kind: ScanKind) -> String {
    let region = match source {
        "Qidian" | "Faloo" => " These are Chinese novel sites; find novels on these specific platforms.",
        "Munpia" => " This is a Korean novel site; find novels from Munpia.",
        "Syosetu" => " This is a Japanese novel site; find novels from Syosetu.",
        _ => "",
    };
    match kind {
        ScanKind::Trending => {
            format!("Top trending novels on {} this week with authors and descriptions.{}", source, region)
        },
        ScanKind::Updated => format!(
            "List of web novels on {} that updated with new chapters in the last 24 hours. \
             Include chapter numbers and update times.{}",
            source, region
        ),
    }
}

fn extraction_intro(source: &str, kind: ScanKind) -> String {
    let focus = match kind {
        ScanKind::Trending => "",
        ScanKind::Updated => " Focus on novels with a recent chapter; extract its title and how long ago it released.",
    };
    format!("Extract a list of 6 novels found on {}.{}", source, focus)
}

fn scan_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "author": { "type": "STRING" },
                "description": { "type": "STRING" },
                "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                "rating": { "type": "NUMBER" },
                "latestChapter": { "type": "STRING" },
                "timeAgo": { "type": "STRING" }
            }
        }
    })
}

fn to_novel(item: ScannedNovel, source: &str, kind: ScanKind, index: usize, stamp: i64) -> Novel {
    let latest = item.latest_chapter.unwrap_or_else(|| "New Chapter".to_string());
    let released = item.time_ago.clone().unwrap_or_else(|| "Today".to_string());

    let chapters = (0..SCAN_CHAPTER_COUNT)
        .map(|idx| {
            let is_latest = idx == SCAN_CHAPTER_COUNT - 1;
            Chapter {
                id: format!("scan-ch-{}", idx),
                title: if is_latest { latest.clone() } else { format!("Chapter {}", 100 + idx) },
                number: 100 + idx + 1,
                release_date: if is_latest { released.clone() } else { "Previous".to_string() },
            }
        })
        .collect();

    let description = match (item.description.is_empty(), kind) {
        (true, ScanKind::Updated) => "New chapter available!".to_string(),
        _ => item.description,
    };

    Novel {
        id: format!("scan-{}-{}-{}-{}", source, kind, index, stamp),
        title: item.title,
        author: if item.author.is_empty() { "Unknown".to_string() } else { item.author },
        description,
        tags: if item.tags.is_empty() { vec![source.to_string()] } else { item.tags },
        source: source.to_string(),
        rating: item.rating.unwrap_or(4.5),
        status: NovelStatus::Ongoing,
        views: match kind {
            ScanKind::Trending => "Trending".to_string(),
            ScanKind::Updated => "Updated".to_string(),
        },
        chapters,
        last_updated: item.time_ago.unwrap_or_else(|| "Just now".to_string()),
        ..Novel::default()
    }
}
