use std::sync::Arc;

use omniread_types::SystemModule;

use super::{excerpt, plain_excerpt};
use crate::gateway::upstream::SpeechVoice;
use crate::gateway::{AiGateway, CallOptions};

pub const CHAT_DISABLED: &str = "Chat disabled to conserve neural resources.";
pub const CHAT_NO_ANSWER: &str = "I couldn't find an answer.";
pub const CHAT_ERROR: &str = "Error connecting to AI assistant.";
pub const TRANSLATION_EMPTY: &str = "Translation failed.";
pub const TRANSLATION_ERROR: &str = "Translation error. Check connection or quota.";

const NARRATOR_VOICE: &str = "Kore";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslationMode {
    Literal,
    #[default]
    Localized,
}

impl TranslationMode {
    fn instruction(self) -> &'static str {
        match self {
            Self::Literal => "Literal translation, preserving original structure.",
            Self::Localized => "High quality localization, smooth prose, adapting idioms.",
        }
    }
}

/// Reader-side helpers, each behind its load-shedding gate.
pub struct ReaderAssist {
    gateway: Arc<AiGateway>,
}

impl ReaderAssist {
    pub fn new(gateway: Arc<AiGateway>) -> Self {
        Self { gateway }
    }

    /// Illustration of a scene, `None` when imaging is shed or fails.
    pub async fn scene_image(&self, scene_html: &str) -> Option<Vec<u8>> {
        if !self.gateway.is_feature_enabled(SystemModule::Imaging) {
            return None;
        }

        let prompt = format!(
            "Generate a high quality, cinematic fantasy digital art illustration depicting this scene: {}",
            plain_excerpt(scene_html, 500)
        );
        let prompt = prompt.as_str();
        self.gateway
            .execute(CallOptions::user(), |client| async move { client.generate_image(prompt).await })
            .await
            .ok()
            .flatten()
    }

    /// Short answer about the chapter the reader is on.
    pub async fn ask_context(&self, chapter_html: &str, question: &str) -> String {
        if !self.gateway.is_feature_enabled(SystemModule::Chat) {
            return CHAT_DISABLED.to_string();
        }

        let prompt = format!(
            "Context: {}\n\nQuestion: {}\n\nAnswer briefly as an AI assistant helping a reader.",
            plain_excerpt(chapter_html, 2000),
            question
        );
        let prompt = prompt.as_str();
        match self
            .gateway
            .execute(CallOptions::user(), |client| async move { client.generate_text(prompt).await })
            .await
        {
            Ok(answer) if answer.trim().is_empty() => CHAT_NO_ANSWER.to_string(),
            Ok(answer) => answer,
            Err(_) => CHAT_ERROR.to_string(),
        }
    }

    /// Narrated audio of a chapter excerpt.
    pub async fn chapter_audio(&self, chapter_html: &str) -> Option<Vec<u8>> {
        if !self.gateway.is_feature_enabled(SystemModule::Reading) {
            return None;
        }

        let text = plain_excerpt(chapter_html, 1000);
        let text = text.as_str();
        let voice = SpeechVoice::Single(NARRATOR_VOICE.to_string());
        let voice = &voice;
        self.gateway
            .execute(CallOptions::user(), |client| async move { client.generate_speech(text, voice).await })
            .await
            .ok()
            .flatten()
    }

    /// Video trailer URI, gated behind the healthiest pool state.
    pub async fn trailer(&self, novel_title: &str, description: &str) -> Option<String> {
        if !self.gateway.is_feature_enabled(SystemModule::Video) {
            return None;
        }

        let prompt = format!(
            "Cinematic movie trailer for a fantasy web novel titled \"{}\". {}. Epic, high resolution.",
            novel_title,
            excerpt(description, 200)
        );
        let prompt = prompt.as_str();
        match self
            .gateway
            .execute(CallOptions::user(), |client| async move { client.generate_video(prompt).await })
            .await
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!("Trailer generation failed: {}", e);
                None
            },
        }
    }

    /// Translate raw text into English, falling back to the secondary
    /// provider when the primary quota is gone.
    pub async fn translate(&self, raw_text: &str, mode: TranslationMode) -> String {
        let prompt = format!(
            "Translate the following raw web novel text into English.\nMode: {}\n\nSource Text:\n{}\n\nOutput ONLY the English translation.",
            mode.instruction(),
            excerpt(raw_text, 2000)
        );
        let prompt_ref = prompt.as_str();
        let primary = self
            .gateway
            .execute(CallOptions::user(), |client| async move { client.generate_text(prompt_ref).await })
            .await;

        match self.gateway.with_secondary_fallback(primary, &prompt, |text| text).await {
            Ok(text) if text.trim().is_empty() => TRANSLATION_EMPTY.to_string(),
            Ok(text) => text,
            Err(_) => TRANSLATION_ERROR.to_string(),
        }
    }
}
