//! Chat backend client struct and builder.

use std::path::Path;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::classify::{ChatReply, ResponseAccumulator, Update};
use crate::error::{
    ClientError, map_chat_status, map_reqwest_error, map_upload_reqwest_error, map_upload_status,
};
use crate::streaming::{LineStream, frame_lines};
use crate::types::{ChatRequest, UploadReceipt};

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable read by [`ChatClient::from_env`].
pub const API_URL_ENV: &str = "CHATLINE_API_URL";

const PDF_MIME: &str = "application/pdf";

/// Client for the chat backend.
///
/// Cheap to clone; clones share one connection pool. Every operation owns
/// its own stream state, so clones may run sends concurrently.
///
/// # Example
///
/// ```no_run
/// use chatline::ChatClient;
/// use chatline::CancellationToken;
///
/// # async fn run() -> Result<(), chatline::ClientError> {
/// let client = ChatClient::new().base_url("http://localhost:8000");
/// let reply = client
///     .send_chat("Who knows Rust?", &CancellationToken::new(), |text| {
///         println!("{text}");
///     })
///     .await?;
/// println!("final: {}", reply.text);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChatClient {
    /// Backend base URL without a trailing slash.
    pub(crate) base_url: String,
    /// Shared HTTP client.
    pub(crate) client: reqwest::Client,
}

impl ChatClient {
    /// Create a client pointed at [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create a client from `CHATLINE_API_URL`, falling back to the default URL.
    pub fn from_env() -> Result<Self, ClientError> {
        match std::env::var(API_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new().try_base_url(url.trim()),
            _ => Ok(Self::new()),
        }
    }

    /// Override the base URL without validation.
    ///
    /// Useful for pointing at a mock server in tests.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the base URL, rejecting anything that is not an absolute
    /// `http` or `https` URL.
    pub fn try_base_url(self, url: &str) -> Result<Self, ClientError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ClientError::Config(format!("invalid base URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "unsupported URL scheme '{}' in '{url}'",
                parsed.scheme()
            )));
        }
        Ok(self.base_url(url))
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, timeouts).
    #[must_use]
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The configured base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    pub(crate) fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url)
    }

    /// Send `message` and return the reply body as a lazy stream of lines.
    ///
    /// Fails with [`ClientError::Connection`] when the backend answers with a
    /// non-success status. The returned stream honours `cancel` while it
    /// waits for each chunk.
    pub async fn stream_lines(
        &self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<LineStream, ClientError> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        let url = self.chat_url();
        let body = ChatRequest::streaming(message);

        tracing::debug!(url = %url, message_len = message.len(), "sending streaming chat request");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::Cancelled),
            sent = self.client.post(&url).json(&body).send() => sent.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.map_err(map_reqwest_error)?;
            tracing::warn!(status = %status, "chat request rejected");
            return Err(map_chat_status(status, &body_text));
        }

        Ok(frame_lines(response.bytes_stream(), cancel.clone()))
    }

    /// Send `message`, calling `on_text` with the full reply text after every
    /// text update, and return the finalized reply.
    ///
    /// Tool responses are not passed to `on_text`; they are collected in
    /// [`ChatReply::tool_output`]. On error, text already delivered through
    /// `on_text` stays delivered.
    pub async fn send_chat<F>(
        &self,
        message: &str,
        cancel: &CancellationToken,
        mut on_text: F,
    ) -> Result<ChatReply, ClientError>
    where
        F: FnMut(&str),
    {
        let mut lines = self.stream_lines(message, cancel).await?;
        let mut accumulator = ResponseAccumulator::new(message);

        while let Some(line) = lines.next().await {
            let line = line?;
            if let Some(Update::Text(text)) = accumulator.apply_line(&line) {
                on_text(&text);
            }
        }

        let reply = accumulator.finish();
        tracing::debug!(
            text_len = reply.text.len(),
            has_tool_output = reply.tool_output.is_some(),
            "chat reply complete"
        );
        Ok(reply)
    }

    /// Upload PDF files as multipart form data, one `files` part per path.
    ///
    /// Paths are checked before any I/O: an empty list is
    /// [`ClientError::NoFiles`] and a non-PDF path is
    /// [`ClientError::UnsupportedFile`].
    pub async fn upload_files<P>(&self, paths: &[P]) -> Result<UploadReceipt, ClientError>
    where
        P: AsRef<Path>,
    {
        if paths.is_empty() {
            return Err(ClientError::NoFiles);
        }
        for path in paths {
            let path: &Path = path.as_ref();
            if !is_pdf(path) {
                return Err(ClientError::UnsupportedFile(path.to_path_buf()));
            }
        }

        let mut form = reqwest::multipart::Form::new();
        for path in paths {
            let path: &Path = path.as_ref();
            let data = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map_or_else(|| "upload.pdf".to_string(), |n| n.to_string_lossy().into_owned());
            let part = reqwest::multipart::Part::bytes(data)
                .file_name(file_name)
                .mime_str(PDF_MIME)
                .map_err(map_upload_reqwest_error)?;
            form = form.part("files", part);
        }

        let url = self.upload_url();
        tracing::debug!(url = %url, files = paths.len(), "uploading files");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(map_upload_reqwest_error)?;

        let status = response.status();
        let response_text = response.text().await.map_err(map_upload_reqwest_error)?;

        if !status.is_success() {
            tracing::warn!(status = %status, "upload rejected");
            return Err(map_upload_status(status, &response_text));
        }

        serde_json::from_str(&response_text)
            .map_err(|e| ClientError::InvalidResponse(format!("invalid JSON response: {e}")))
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}
