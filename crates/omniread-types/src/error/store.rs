//! Local data store errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading, writing, or migrating the local store.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StoreError {
    /// Store file could not be read
    #[error("Failed to read store: {message}")]
    ReadFailed {
        /// Description of the I/O failure
        message: String,
    },

    /// Store file could not be written
    #[error("Failed to write store: {message}")]
    WriteFailed {
        /// Description of the I/O failure
        message: String,
    },

    /// Store file or record is not valid JSON
    #[error("Store parse error: {message}")]
    ParseError {
        /// Description of the parse failure
        message: String,
    },

    /// Store file was written by a newer release
    #[error("Store schema v{found} is newer than supported v{supported}")]
    UnsupportedVersion {
        /// Version found on disk
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// Migration between schema versions failed
    #[error("Store migration failed from v{from} to v{to}: {message}")]
    MigrationFailed {
        /// Source schema version
        from: u32,
        /// Target schema version
        to: u32,
        /// Description of the failure
        message: String,
    },

    /// Import document is not a valid save file
    #[error("Invalid import document: {message}")]
    InvalidImport {
        /// Why the document was rejected
        message: String,
    },
}
