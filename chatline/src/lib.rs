#![deny(missing_docs)]
//! Streaming chat client for a resume-assistant backend.
//!
//! Sends a message to `POST /chat`, decodes the newline-delimited JSON
//! reply as it arrives, and splits it into conversational text and tool
//! output. Also uploads PDF files to `POST /upload`.
//!
//! # Usage
//!
//! ```no_run
//! use chatline::ChatClient;
//!
//! let client = ChatClient::new().base_url("http://localhost:8000");
//! ```
//!
//! # Pieces
//!
//! - [`streaming`]: byte stream → complete lines (multi-byte safe,
//!   trailing fragment discarded, cancellable)
//! - [`classify`]: line → text / tool output / noise, plus the reply
//!   accumulator and prompt-echo stripping
//! - [`ChatClient`]: the HTTP calls tying both together

pub mod classify;
pub mod client;
pub mod error;
pub mod streaming;
pub mod types;

pub use classify::{
    ChatReply, LineKind, ResponseAccumulator, Update, classify_line, strip_prompt_echo,
};
pub use client::{API_URL_ENV, ChatClient, DEFAULT_BASE_URL};
pub use error::{CHAT_FALLBACK_MESSAGE, ClientError, UPLOAD_FALLBACK_MESSAGE};
pub use streaming::{LineFramer, LineStream, Utf8Decoder, frame_lines};
pub use types::{ChatRequest, UploadReceipt};

// Re-exported so callers do not need a direct tokio-util dependency.
pub use tokio_util::sync::CancellationToken;
