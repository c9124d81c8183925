//! Error types for the chat client, plus helpers mapping HTTP/reqwest
//! failures onto them.

use std::path::PathBuf;

/// Fallback reply shown in place of a response when a chat send fails.
pub const CHAT_FALLBACK_MESSAGE: &str = "Sorry, something went wrong. Please try again.";

/// Fallback notice shown when an upload fails.
pub const UPLOAD_FALLBACK_MESSAGE: &str = "Upload failed. Please try again.";

/// Errors from chat and upload operations.
///
/// Content-level anomalies in the response stream (a line that is not JSON,
/// a record without a usable content field) are never reported here; they
/// are logged and dropped by the classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    // Chat transport
    /// The chat endpoint answered with a non-success status.
    #[error("chat request failed with HTTP {status}: {body}")]
    Connection {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body, if any.
        body: String,
    },
    /// Network-level error (connection refused, reset mid-stream, DNS failure).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    // Upload
    /// The upload endpoint answered with a non-success status.
    #[error("upload failed with HTTP {status}: {body}")]
    Upload {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Response body, if any.
        body: String,
    },
    /// Network-level error while sending an upload.
    #[error("upload network error: {0}")]
    UploadNetwork(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The upload endpoint answered 2xx with a body that is not the expected JSON.
    #[error("invalid upload response: {0}")]
    InvalidResponse(String),
    /// Upload was called without any files.
    #[error("no files selected for upload")]
    NoFiles,
    /// A file selected for upload is not a PDF.
    #[error("unsupported file type: {}", .0.display())]
    UnsupportedFile(PathBuf),
    /// A file selected for upload could not be read.
    #[error("failed to read upload file: {0}")]
    Io(#[from] std::io::Error),

    // Control
    /// The operation was cancelled via its cancellation token.
    #[error("cancelled")]
    Cancelled,
    /// The client configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether this error belongs to the upload family rather than the chat stream.
    #[must_use]
    pub fn is_upload_error(&self) -> bool {
        matches!(
            self,
            Self::Upload { .. }
                | Self::UploadNetwork(_)
                | Self::InvalidResponse(_)
                | Self::NoFiles
                | Self::UnsupportedFile(_)
                | Self::Io(_)
        )
    }

    /// The friendly message a front-end shows instead of the raw error.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        if self.is_upload_error() {
            UPLOAD_FALLBACK_MESSAGE
        } else {
            CHAT_FALLBACK_MESSAGE
        }
    }
}

/// Map a non-success status on the chat endpoint to a [`ClientError`].
pub(crate) fn map_chat_status(status: reqwest::StatusCode, body: &str) -> ClientError {
    ClientError::Connection {
        status: status.as_u16(),
        body: body.to_string(),
    }
}

/// Map a non-success status on the upload endpoint to a [`ClientError`].
pub(crate) fn map_upload_status(status: reqwest::StatusCode, body: &str) -> ClientError {
    ClientError::Upload {
        status: status.as_u16(),
        body: body.to_string(),
    }
}

/// Map a [`reqwest::Error`] to a [`ClientError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    ClientError::Network(Box::new(err))
}

/// Map a [`reqwest::Error`] raised on the upload path to a [`ClientError`].
pub(crate) fn map_upload_reqwest_error(err: reqwest::Error) -> ClientError {
    ClientError::UploadNetwork(Box::new(err))
}
