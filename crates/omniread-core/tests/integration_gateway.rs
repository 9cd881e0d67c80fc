#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test: panics are the assertion mechanism")]

use std::sync::Arc;

use omniread_core::gateway::{CallOptions, Notice, NoticeLevel};
use omniread_core::modules::records;
use omniread_core::services::ScanKind;
use omniread_core::{AppState, LocalStore};
use omniread_types::{AppConfig, GatewayError};
use wiremock::matchers::{body_string_contains, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = r"^/v1beta/models/.*:generateContent$";
const GROQ_PATH: &str = "/openai/v1/chat/completions";

fn text_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
}

fn rate_limited() -> ResponseTemplate {
    ResponseTemplate::new(429).set_body_json(serde_json::json!({
        "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
    }))
}

fn groq_body(text: &str) -> serde_json::Value {
    serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
}

struct Harness {
    state: AppState,
}

impl Harness {
    fn new(server: &MockServer, daily_cap: u32, fallback_key: &str, secondary_key: &str) -> Self {
        let mut config = AppConfig::new();
        config.primary.base_url = server.uri();
        config.primary.video_poll_interval_secs = 0;
        config.secondary.base_url = server.uri();
        config.gateway.backoff_unit_ms = 0;
        config.gateway.daily_cap = daily_cap;

        let state = AppState::from_components(
            config,
            Arc::new(LocalStore::in_memory()),
            fallback_key.to_string(),
            secondary_key.to_string(),
        )
        .expect("state");
        Self { state }
    }

    fn with_keys(self, keys: &[&str]) -> Self {
        for key in keys {
            self.state.gateway().keys().add_key(key, "").expect("add key");
        }
        self
    }

    async fn generate_text(&self, options: CallOptions) -> Result<String, GatewayError> {
        self.state
            .gateway()
            .execute(options, |client| async move { client.generate_text("Hi").await })
            .await
    }
}

#[tokio::test]
async fn test_rate_limited_key_rotates_to_next() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .and(header("x-goog-api-key", "key-a"))
        .respond_with(rate_limited())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .and(header("x-goog-api-key", "key-b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("Hello from mock!")))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "").with_keys(&["key-a", "key-b"]);
    let mut notices = harness.state.gateway().subscribe_notices();

    let text = harness.generate_text(CallOptions::user()).await.expect("rotated call");

    assert_eq!(text, "Hello from mock!");
    assert!(harness.state.gateway().keys().is_in_cooldown("key-a"));
    assert_eq!(harness.state.gateway().health(), 50);
    assert!(notices.try_recv().is_err(), "successful retries are silent");
}

#[tokio::test]
async fn test_transient_error_retries_same_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "").with_keys(&["key-a"]);

    let text = harness.generate_text(CallOptions::user()).await.expect("retried call");

    assert_eq!(text, "recovered");
    assert!(!harness.state.gateway().keys().is_in_cooldown("key-a"));
}

#[tokio::test]
async fn test_retry_budget_exhaustion_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(rate_limited())
        .expect(5)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "system-key", "").with_keys(&["key-a"]);
    let mut notices = harness.state.gateway().subscribe_notices();

    let err = harness.generate_text(CallOptions::user()).await.expect_err("exhausted");

    assert!(matches!(err, GatewayError::RateLimited { .. }), "got {:?}", err);
    let notice = notices.try_recv().expect("notice");
    assert_eq!(notice, Notice::error("Neural network overloaded. Switching nodes..."));
    assert!(!harness.state.gateway().keys().is_in_cooldown("system-key"));
}

#[tokio::test]
async fn test_pool_drained_by_rate_limits_reports_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(rate_limited())
        .expect(2)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "").with_keys(&["key-a", "key-b"]);

    let err = harness.generate_text(CallOptions::user()).await.expect_err("drained");
    assert!(err.is_quota(), "got {:?}", err);
    assert_eq!(harness.state.gateway().health(), 0);
}

#[tokio::test]
async fn test_no_key_available() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server, 50, "", "");
    let mut notices = harness.state.gateway().subscribe_notices();

    let err = harness.generate_text(CallOptions::user()).await.expect_err("no key");

    assert_eq!(err, GatewayError::NoKeyAvailable);
    assert!(notices.try_recv().expect("notice").message.starts_with("No API Key found"));
}

#[tokio::test]
async fn test_daily_cap_denies_third_call_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("ok")))
        .expect(2)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 2, "", "").with_keys(&["key-a"]);
    let mut notices = harness.state.gateway().subscribe_notices();

    harness.generate_text(CallOptions::user()).await.expect("first");
    harness.generate_text(CallOptions::user()).await.expect("second");
    let err = harness.generate_text(CallOptions::user()).await.expect_err("third");

    assert_eq!(err, GatewayError::QuotaExceeded { cap: 2 });
    assert_eq!(harness.state.daily_usage().count, 2);
    assert!(notices.try_recv().expect("notice").message.starts_with("Daily AI Limit Reached"));
}

#[tokio::test]
async fn test_background_calls_bypass_cap_and_stay_silent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .and(body_string_contains("fail me"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("ok")))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 1, "", "").with_keys(&["key-a"]);
    let mut notices = harness.state.gateway().subscribe_notices();

    harness.generate_text(CallOptions::user()).await.expect("user call");
    harness.generate_text(CallOptions::background()).await.expect("background ignores cap");

    let err = harness
        .state
        .gateway()
        .execute(CallOptions::background(), |client| async move { client.generate_text("fail me").await })
        .await
        .expect_err("bad request");

    assert!(matches!(err, GatewayError::Generic(_)));
    assert_eq!(harness.state.daily_usage().count, 1);
    assert!(notices.try_recv().is_err(), "background failures are silent");
}

#[tokio::test]
async fn test_safety_block_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "").with_keys(&["key-a", "key-b"]);
    let err = harness.generate_text(CallOptions::user()).await.expect_err("blocked");

    assert!(matches!(err, GatewayError::SafetyFiltered { .. }));
    assert_eq!(err.user_message(), "Content filtered by safety protocols.");
}

#[tokio::test]
async fn test_500_retried_only_when_search_augmented() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("Search tool failure"))
        .expect(1 + 5)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "").with_keys(&["key-a"]);

    let plain = harness.generate_text(CallOptions::user()).await.expect_err("plain 500");
    assert!(matches!(plain, GatewayError::Generic(_)));

    let search = harness.generate_text(CallOptions::user().with_search()).await.expect_err("search 500");
    assert!(matches!(search, GatewayError::ServiceUnavailable { .. }));
}

#[tokio::test]
async fn test_chapter_quota_falls_back_to_secondary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(rate_limited())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .and(header("authorization", "Bearer gsk-env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(groq_body("<p>From Groq</p>")))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "gsk-env").with_keys(&["key-a"]);
    let mut notices = harness.state.gateway().subscribe_notices();

    let chapter = harness.state.chapters().chapter_content("Sword God", "Chapter 3", "ctx").await;

    assert_eq!(chapter.content, "<p>From Groq</p>");
    assert_eq!(chapter.context, "ctx");
    let notice = notices.recv().await.expect("notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    let reroute = notices.recv().await.expect("reroute notice");
    assert_eq!(reroute.level, NoticeLevel::Info);
    assert_eq!(harness.state.daily_usage().count, 2);
}

#[tokio::test]
async fn test_chapter_without_secondary_degrades_to_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad"))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "").with_keys(&["key-a"]);
    let chapter = harness.state.chapters().chapter_content("Sword God", "Chapter 3", "ctx").await;

    assert_eq!(chapter.content, "<p>Failed to load chapter content due to network or API error.</p>");
    assert_eq!(chapter.context, "ctx");
}

#[tokio::test]
async fn test_chapter_structured_output() {
    let server = MockServer::start().await;
    let payload = r#"{"content":"<p>Once upon a time</p>","context":"A hero rose."}"#;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .and(body_string_contains("responseSchema"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body(payload)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "").with_keys(&["key-a"]);
    let chapter = harness.state.chapters().chapter_content("Sword God", "Chapter 1", "").await;

    assert_eq!(chapter.content, "<p>Once upon a time</p>");
    assert_eq!(chapter.context, "A hero rose.");
}

#[tokio::test]
async fn test_short_chapter_goes_to_secondary_first() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(groq_body("<p>Prologue text</p>")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "gsk-env").with_keys(&["key-a"]);
    let chapter = harness.state.chapters().chapter_content("Sword God", "Prologue", "").await;

    assert_eq!(chapter.content, "<p>Prologue text</p>");
}

#[tokio::test]
async fn test_scan_merges_into_directory_without_counting() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .and(body_string_contains("googleSearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Found: Shadow Slave by Guiltythree" }] },
                "groundingMetadata": {
                    "groundingChunks": [{ "web": { "uri": "https://example.com", "title": "Example" } }]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let extracted = r#"[{"title":"Shadow Slave","author":"Guiltythree","rating":4.8},{"title":""}]"#;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .and(body_string_contains("responseSchema"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body(extracted)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 1, "", "").with_keys(&["key-a"]);
    let novels = harness.state.scanner().scan_source("WebNovel", ScanKind::Trending).await;

    assert_eq!(novels.len(), 1);
    assert_eq!(novels[0].title, "Shadow Slave");
    assert_eq!(novels[0].views, "Trending");
    assert_eq!(records::get_directory(harness.state.store()).len(), 1);
    assert_eq!(harness.state.daily_usage().count, 0);
}

#[tokio::test]
async fn test_scan_skipped_when_pool_unhealthy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("[]")))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "").with_keys(&["key-a", "key-b", "key-c", "key-d"]);
    let keys = harness.state.gateway().keys();
    for key in ["key-a", "key-b", "key-c"] {
        keys.mark_rate_limited(key);
    }
    assert_eq!(harness.state.gateway().health(), 25);

    let novels = harness.state.scanner().scan_source("RoyalRoad", ScanKind::Updated).await;
    assert!(novels.is_empty());
}

#[tokio::test]
async fn test_chat_gated_by_health() {
    let server = MockServer::start().await;
    let harness = Harness::new(&server, 50, "", "");

    let answer = harness.state.assist().ask_context("<p>text</p>", "Who is he?").await;
    assert_eq!(answer, "Chat disabled to conserve neural resources.");
}

#[tokio::test]
async fn test_translate_uses_secondary_on_quota() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(GENERATE_PATH))
        .respond_with(rate_limited())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GROQ_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(groq_body("The sect master laughed.")))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, 50, "", "gsk-env").with_keys(&["key-a"]);
    let text = harness
        .state
        .assist()
        .translate("宗主大笑。", omniread_core::services::TranslationMode::Localized)
        .await;

    assert_eq!(text, "The sect master laughed.");
}
