#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test: panics are the assertion mechanism")]

use std::sync::Arc;

use omniread_core::gateway::upstream::{build_http_client, SpeechVoice};
use omniread_core::gateway::{GeminiClient, GroqClient, UpstreamError};
use omniread_types::models::{PrimaryProviderConfig, SecondaryProviderConfig};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gemini(server: &MockServer) -> GeminiClient {
    let config = PrimaryProviderConfig {
        base_url: server.uri(),
        video_poll_interval_secs: 0,
        video_max_polls: 3,
        ..PrimaryProviderConfig::default()
    };
    let http = build_http_client(10).expect("http client");
    GeminiClient::new(http, Arc::new(config), "gemini-2.5-flash", "test-key")
}

fn groq(server: &MockServer) -> GroqClient {
    let config = SecondaryProviderConfig { base_url: server.uri(), ..SecondaryProviderConfig::default() };
    GroqClient::new(build_http_client(10).expect("http client"), Arc::new(config), "gsk-test")
}

fn inline_body(data: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": "here you go" }, { "inlineData": { "mimeType": "image/png", "data": data } }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_generate_text_sends_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": "Hi" }] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello" }] }, "finishReason": "STOP" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(gemini(&server).generate_text("Hi").await.expect("text"), "Hello");
}

#[tokio::test]
async fn test_error_status_and_message_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": { "code": 429, "message": "Quota exceeded for quota metric", "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&server)
        .await;

    let err = gemini(&server).generate_text("Hi").await.expect_err("429");
    assert_eq!(err.status(), Some(429));
    assert!(err.to_string().contains("Quota exceeded"));
}

#[tokio::test]
async fn test_generate_image_decodes_inline_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-image:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(inline_body("aGVsbG8=")))
        .expect(1)
        .mount(&server)
        .await;

    let image = gemini(&server).generate_image("a castle").await.expect("image");
    assert_eq!(image.as_deref(), Some(b"hello".as_slice()));
}

#[tokio::test]
async fn test_generate_speech_uses_tts_model_and_voice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash-preview-tts:generateContent"))
        .and(body_partial_json(serde_json::json!({
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": { "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": "Kore" } } }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(inline_body("AAEC")))
        .expect(1)
        .mount(&server)
        .await;

    let audio = gemini(&server)
        .generate_speech("Once upon a time", &SpeechVoice::Single("Kore".into()))
        .await
        .expect("speech");
    assert_eq!(audio, Some(vec![0, 1, 2]));
}

#[tokio::test]
async fn test_generate_video_polls_operation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "name": "operations/abc" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/operations/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "name": "operations/abc", "done": false })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/operations/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "operations/abc",
            "done": true,
            "response": { "generateVideoResponse": { "generatedSamples": [
                { "video": { "uri": "https://files.example.com/v1/files/vid:download?alt=media" } }
            ] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = gemini(&server).generate_video("trailer").await.expect("video");
    assert_eq!(uri.as_deref(), Some("https://files.example.com/v1/files/vid:download?alt=media&key=test-key"));
}

#[tokio::test]
async fn test_generate_video_gives_up_after_poll_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "name": "operations/slow" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "done": false })))
        .expect(3)
        .mount(&server)
        .await;

    let err = gemini(&server).generate_video("trailer").await.expect_err("timeout");
    assert_eq!(err, UpstreamError::Timeout { operation: "operations/slow".into(), polls: 3 });
}

#[tokio::test]
async fn test_groq_chat_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "mixtral-8x7b-32768",
            "max_tokens": 3000,
            "messages": [
                { "role": "system", "content": "You are a creative web novel writer." },
                { "role": "user", "content": "Write" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "<p>Text</p>" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(groq(&server).chat("Write", None).await.expect("chat"), "<p>Text</p>");
}

#[tokio::test]
async fn test_groq_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "message": "Invalid API Key", "type": "invalid_request_error" }
        })))
        .mount(&server)
        .await;

    let err = groq(&server).chat("Write", Some("system")).await.expect_err("401");
    assert_eq!(err, UpstreamError::Http { status: 401, message: "Invalid API Key".into() });
}
