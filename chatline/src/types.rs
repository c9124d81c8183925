//! Wire types for the chat and upload endpoints.

use serde::{Deserialize, Serialize};

/// Notice shown when the upload endpoint does not return a message.
pub const DEFAULT_UPLOAD_MESSAGE: &str = "Files uploaded successfully";

/// `POST /chat` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Always `true`; the client only consumes streamed replies.
    pub stream: bool,
}

impl ChatRequest {
    /// Build a streaming request for `message`.
    pub fn streaming(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stream: true,
        }
    }
}

/// `POST /upload` success body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    /// Human-readable outcome, e.g. "Successfully queued 2 files for processing".
    #[serde(default)]
    pub message: Option<String>,
    /// Processing status reported by the backend, e.g. "queued".
    #[serde(default)]
    pub status: Option<String>,
    /// Where the backend stored the uploaded files.
    #[serde(default)]
    pub file_paths: Vec<String>,
}

impl UploadReceipt {
    /// The message to show the user, with a generic fallback.
    #[must_use]
    pub fn display_message(&self) -> &str {
        self.message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_MESSAGE)
    }
}
