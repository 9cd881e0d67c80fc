//! Health-based feature gating.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Optional features gated by key pool health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemModule {
    /// Chapter reading and narration (critical)
    Reading,
    /// Chapter Q&A assistant
    Chat,
    /// Background aggregator scans
    Scanning,
    /// Scene illustration
    Imaging,
    /// Trailer generation
    Video,
}

impl SystemModule {
    /// All gated modules, cheapest first.
    pub const ALL: [SystemModule; 5] = [
        SystemModule::Reading,
        SystemModule::Chat,
        SystemModule::Scanning,
        SystemModule::Imaging,
        SystemModule::Video,
    ];
}

impl fmt::Display for SystemModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemModule::Reading => write!(f, "reading"),
            SystemModule::Chat => write!(f, "chat"),
            SystemModule::Scanning => write!(f, "scanning"),
            SystemModule::Imaging => write!(f, "imaging"),
            SystemModule::Video => write!(f, "video"),
        }
    }
}

/// Minimum health (exclusive) each module needs. `None` marks a critical
/// module that stays enabled regardless of health.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct FeatureThresholds {
    /// Reading threshold
    #[serde(default)]
    #[validate(range(max = 100))]
    pub reading: Option<u8>,
    /// Chat threshold
    #[serde(default = "default_chat_threshold")]
    #[validate(range(max = 100))]
    pub chat: Option<u8>,
    /// Scanning threshold
    #[serde(default = "default_scanning_threshold")]
    #[validate(range(max = 100))]
    pub scanning: Option<u8>,
    /// Imaging threshold
    #[serde(default = "default_imaging_threshold")]
    #[validate(range(max = 100))]
    pub imaging: Option<u8>,
    /// Video threshold
    #[serde(default = "default_video_threshold")]
    #[validate(range(max = 100))]
    pub video: Option<u8>,
}

fn default_chat_threshold() -> Option<u8> {
    Some(10)
}

fn default_scanning_threshold() -> Option<u8> {
    Some(30)
}

fn default_imaging_threshold() -> Option<u8> {
    Some(50)
}

fn default_video_threshold() -> Option<u8> {
    Some(70)
}

impl Default for FeatureThresholds {
    fn default() -> Self {
        Self {
            reading: None,
            chat: default_chat_threshold(),
            scanning: default_scanning_threshold(),
            imaging: default_imaging_threshold(),
            video: default_video_threshold(),
        }
    }
}

impl FeatureThresholds {
    /// Threshold configured for `module`.
    pub const fn threshold(&self, module: SystemModule) -> Option<u8> {
        match module {
            SystemModule::Reading => self.reading,
            SystemModule::Chat => self.chat,
            SystemModule::Scanning => self.scanning,
            SystemModule::Imaging => self.imaging,
            SystemModule::Video => self.video,
        }
    }

    /// Pure gate: `health > threshold`, critical modules always pass.
    pub fn is_enabled(&self, module: SystemModule, health: u8) -> bool {
        match self.threshold(module) {
            Some(threshold) => health > threshold,
            None => true,
        }
    }
}
