use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::gateway::{AiGateway, CallOptions};

pub const CONTENT_ERROR_HTML: &str = "<p>Error generating content.</p>";
pub const ALL_PATHS_BLOCKED_HTML: &str = "<p>All neural pathways are blocked. Please try again later.</p>";
pub const LOAD_FAILED_HTML: &str = "<p>Failed to load chapter content due to network or API error.</p>";

static SHORT_CHAPTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_short_chapter_regex() -> &'static Regex {
    SHORT_CHAPTER_REGEX.get_or_init(|| {
        Regex::new(r"(?i)prologue|interlude|epilogue|glossary|bonus")
            .expect("Short chapter regex is valid")
    })
}

/// Generated chapter HTML plus the rolling plot summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterContent {
    pub content: String,
    pub context: String,
}

pub struct ChapterService {
    gateway: Arc<AiGateway>,
}

impl ChapterService {
    pub fn new(gateway: Arc<AiGateway>) -> Self {
        Self { gateway }
    }

    pub fn is_short_chapter(chapter_title: &str) -> bool {
        get_short_chapter_regex().is_match(chapter_title)
    }

    /// Generate a chapter. Never fails: errors become placeholder HTML and
    /// the previous context is carried over.
    ///
    /// Short chapters go to the secondary provider first. Primary calls that
    /// hit a quota are re-issued on the secondary provider.
    pub async fn chapter_content(
        &self,
        novel_title: &str,
        chapter_title: &str,
        previous_context: &str,
    ) -> ChapterContent {
        let simple_prompt = simple_prompt(novel_title, chapter_title);
        let carry = |content: String| ChapterContent { content, context: previous_context.to_string() };

        if Self::is_short_chapter(chapter_title) && self.gateway.has_secondary_key() {
            tracing::info!("Routing short chapter '{}' to secondary provider", chapter_title);
            match self.gateway.execute_secondary(&simple_prompt, None, CallOptions::user()).await {
                Ok(text) => return carry(text),
                Err(e) => tracing::warn!("Secondary route failed ({}), using primary provider", e),
            }
        }

        let prompt = structured_prompt(novel_title, chapter_title, previous_context);
        let prompt = prompt.as_str();
        let primary = self
            .gateway
            .execute(CallOptions::user(), |client| async move {
                client.generate_json::<ChapterContent>(prompt, chapter_schema()).await
            })
            .await
            .map(|generated| ChapterContent {
                content: non_empty_or(generated.content, CONTENT_ERROR_HTML),
                context: non_empty_or(generated.context, previous_context),
            });

        let rerouted = matches!(&primary, Err(e) if e.is_quota()) && self.gateway.has_secondary_key();
        match self.gateway.with_secondary_fallback(primary, &simple_prompt, carry).await {
            Ok(chapter) => chapter,
            Err(e) if rerouted => {
                tracing::warn!("Both providers failed for '{}': {}", chapter_title, e);
                carry(ALL_PATHS_BLOCKED_HTML.to_string())
            },
            Err(e) => {
                tracing::warn!("Chapter generation failed for '{}': {}", chapter_title, e);
                carry(LOAD_FAILED_HTML.to_string())
            },
        }
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn simple_prompt(novel_title: &str, chapter_title: &str) -> String {
    format!(
        "Write the content for the web novel \"{}\", specifically \"{}\". Genre: Fantasy/Cultivation. \
         Write approx 600 words. Format with HTML paragraphs (<p>). ENSURE OUTPUT IS IN ENGLISH.",
        novel_title, chapter_title
    )
}

fn structured_prompt(novel_title: &str, chapter_title: &str, previous_context: &str) -> String {
    let context = if previous_context.is_empty() { "None yet." } else { previous_context };
    format!(
        "Write the content for the web novel \"{}\", specifically \"{}\". \
         Write at least 600 words formatted with HTML paragraphs (<p>), in English.\n\
         Previous Context Summary: {}\n\
         Return a JSON object with \"content\" (the chapter HTML) and \"context\" \
         (an updated 2-3 sentence plot summary including this chapter).",
        novel_title, chapter_title, context
    )
}

fn chapter_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "content": { "type": "STRING" },
            "context": { "type": "STRING" }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_chapter_detection() {
        assert!(ChapterService::is_short_chapter("Prologue"));
        assert!(ChapterService::is_short_chapter("Side Story: BONUS chapter"));
        assert!(ChapterService::is_short_chapter("Glossary of Terms"));
        assert!(!ChapterService::is_short_chapter("Chapter 12: The Duel"));
    }

    #[test]
    fn test_non_empty_or() {
        assert_eq!(non_empty_or("  ".into(), "fallback"), "fallback");
        assert_eq!(non_empty_or("<p>x</p>".into(), "fallback"), "<p>x</p>");
    }
}
