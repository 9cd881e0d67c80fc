use serde::Serialize;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient notification for the reader (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { message: message.into(), level: NoticeLevel::Info }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), level: NoticeLevel::Error }
    }
}
