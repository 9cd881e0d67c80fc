use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use omniread_types::models::{mask_key, PrimaryProviderConfig};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{read_json, UpstreamError};

const API_VERSION: &str = "v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Web page cited by a grounded answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSource {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundedAnswer {
    pub text: String,
    pub sources: Vec<WebSource>,
}

/// Prebuilt TTS voices, single narrator or a named cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechVoice {
    Single(String),
    Multi(Vec<(String, String)>),
}

impl SpeechVoice {
    fn speech_config(&self) -> Value {
        let voice = |name: &str| json!({ "prebuiltVoiceConfig": { "voiceName": name } });
        match self {
            Self::Single(name) => json!({ "voiceConfig": voice(name) }),
            Self::Multi(cast) => json!({
                "multiSpeakerVoiceConfig": {
                    "speakerVoiceConfigs": cast
                        .iter()
                        .map(|(speaker, name)| json!({ "speaker": speaker, "voiceConfig": voice(name) }))
                        .collect::<Vec<_>>()
                }
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Default, Deserialize)]
struct InlineData {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

impl GenerateResponse {
    /// Surface safety blocks as errors; an empty-but-allowed answer is fine.
    fn check_blocked(&self) -> Result<(), UpstreamError> {
        if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
            return Err(UpstreamError::Blocked { reason: format!("prompt filter ({})", reason) });
        }
        match self.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            Some(reason @ ("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST")) => {
                Err(UpstreamError::Blocked { reason: reason.to_string() })
            },
            _ => Ok(()),
        }
    }

    fn parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    fn text(&self) -> String {
        self.parts().iter().filter_map(|p| p.text.as_deref()).collect()
    }

    fn inline_data(&self) -> Option<&str> {
        self.parts()
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
            .find(|d| !d.is_empty())
    }

    fn sources(&self) -> Vec<WebSource> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| m.grounding_chunks.iter().filter_map(|c| c.web.clone()).collect())
            .unwrap_or_default()
    }
}

/// Provider A client bound to one API key.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    config: Arc<PrimaryProviderConfig>,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        http: Client,
        config: Arc<PrimaryProviderConfig>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self { http, config, model: model.into(), api_key: api_key.into() }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.config.base_url.trim_end_matches('/'), API_VERSION, path)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, UpstreamError> {
        let url = self.endpoint(path);
        tracing::debug!("POST {} with key {}", url, mask_key(&self.api_key));
        let response =
            self.http.post(&url).header(API_KEY_HEADER, &self.api_key).json(body).send().await?;
        read_json(response).await
    }

    async fn generate_content(&self, model: &str, body: Value) -> Result<GenerateResponse, UpstreamError> {
        let raw = self.post(&format!("models/{}:generateContent", model), &body).await?;
        let response: GenerateResponse =
            serde_json::from_value(raw).map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        response.check_blocked()?;
        Ok(response)
    }

    fn user_contents(prompt: &str) -> Value {
        json!([{ "role": "user", "parts": [{ "text": prompt }] }])
    }

    /// Plain text completion with the default text model.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, UpstreamError> {
        let body = json!({ "contents": Self::user_contents(prompt) });
        Ok(self.generate_content(&self.model, body).await?.text())
    }

    /// Schema-constrained JSON. Output that does not parse as `T` degrades
    /// to `T::default()` instead of failing the call.
    pub async fn generate_json<T>(&self, prompt: &str, schema: Value) -> Result<T, UpstreamError>
    where
        T: DeserializeOwned + Default,
    {
        let body = json!({
            "contents": Self::user_contents(prompt),
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            }
        });
        let text = self.generate_content(&self.model, body).await?.text();
        Ok(parse_json_lenient(&text))
    }

    /// Answer backed by the web search tool, with its cited pages.
    pub async fn generate_grounded(&self, prompt: &str) -> Result<GroundedAnswer, UpstreamError> {
        let body = json!({
            "contents": Self::user_contents(prompt),
            "tools": [{ "googleSearch": {} }],
        });
        let response = self.generate_content(&self.model, body).await?;
        Ok(GroundedAnswer { text: response.text(), sources: response.sources() })
    }

    /// First inline image of the answer, decoded.
    pub async fn generate_image(&self, prompt: &str) -> Result<Option<Vec<u8>>, UpstreamError> {
        let body = json!({ "contents": Self::user_contents(prompt) });
        let response = self.generate_content(&self.config.image_model, body).await?;
        response.inline_data().map(decode_inline).transpose()
    }

    /// Raw PCM audio of `text` read by `voice`.
    pub async fn generate_speech(
        &self,
        text: &str,
        voice: &SpeechVoice,
    ) -> Result<Option<Vec<u8>>, UpstreamError> {
        let body = json!({
            "contents": Self::user_contents(text),
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": voice.speech_config(),
            }
        });
        let response = self.generate_content(&self.config.tts_model, body).await?;
        response.inline_data().map(decode_inline).transpose()
    }

    /// Start a video generation and poll it to completion. Returns the
    /// download URI with this client's key attached.
    pub async fn generate_video(&self, prompt: &str) -> Result<Option<String>, UpstreamError> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "aspectRatio": "16:9", "resolution": "1080p", "sampleCount": 1 },
        });
        let mut operation =
            self.post(&format!("models/{}:predictLongRunning", self.config.video_model), &body).await?;

        let name = operation
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| UpstreamError::Malformed("operation without name".to_string()))?;
        tracing::info!("Video operation {} started", name);

        let interval = Duration::from_secs(self.config.video_poll_interval_secs);
        let mut polls = 0;
        while !operation.get("done").and_then(Value::as_bool).unwrap_or(false) {
            if polls >= self.config.video_max_polls {
                return Err(UpstreamError::Timeout { operation: name, polls });
            }
            tokio::time::sleep(interval).await;
            polls += 1;

            let response = self
                .http
                .get(self.endpoint(&name))
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .await?;
            operation = read_json(response).await?;
        }

        if let Some(error) = operation.get("error") {
            let status = error.get("code").and_then(Value::as_u64).unwrap_or(500) as u16;
            let message = error.get("message").and_then(Value::as_str).unwrap_or("video failed");
            return Err(UpstreamError::Http { status, message: message.to_string() });
        }

        let uri = operation
            .pointer("/response/generateVideoResponse/generatedSamples/0/video/uri")
            .and_then(Value::as_str);
        Ok(uri.map(|uri| with_download_key(uri, &self.api_key)))
    }
}

fn decode_inline(data: &str) -> Result<Vec<u8>, UpstreamError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| UpstreamError::Malformed(format!("inline data: {}", e)))
}

fn with_download_key(uri: &str, key: &str) -> String {
    match url::Url::parse(uri) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("key", key);
            url.to_string()
        },
        Err(_) => format!("{}&key={}", uri, key),
    }
}

/// Parse model output as JSON, tolerating markdown code fences.
pub(crate) fn parse_json_lenient<T: DeserializeOwned + Default>(text: &str) -> T {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    if unfenced.is_empty() {
        return T::default();
    }
    match serde_json::from_str(unfenced) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Discarding malformed structured output: {}", e);
            T::default()
        },
    }
}
