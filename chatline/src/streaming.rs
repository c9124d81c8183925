//! NDJSON line framing for the chat response stream.
//!
//! The backend answers a chat request with newline-delimited JSON:
//! ```text
//! {"chunk":"Hello"}
//! {"chunk":" world"}
//! ```
//! Network chunks carry no alignment with those lines, so bytes are decoded
//! incrementally and buffered until a `\n` proves a line complete. Whatever
//! follows the last `\n` when the body ends is discarded, never classified.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;

/// A lazy sequence of complete lines decoded from a response body.
///
/// Yields `Err` at most once; the stream ends right after an error.
pub struct LineStream {
    /// The underlying line stream.
    pub receiver: Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>,
}

impl Stream for LineStream {
    type Item = Result<String, ClientError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for LineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream").finish_non_exhaustive()
    }
}

/// Stateful UTF-8 decoder.
///
/// A multi-byte sequence split across two chunks is held back until its
/// remaining bytes arrive. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with no pending bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + chunk` as is decodable.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);

        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(s) => {
                    out.push_str(s);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    if let Ok(s) = std::str::from_utf8(&self.pending[start..valid_end]) {
                        out.push_str(s);
                    }
                    match e.error_len() {
                        Some(len) => {
                            tracing::debug!(
                                offset = valid_end,
                                len,
                                "replacing invalid UTF-8 in chat stream"
                            );
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Incomplete sequence at the tail; wait for more bytes.
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Number of bytes held back waiting for the rest of a character.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Splits decoded text into complete lines.
///
/// Owns the decoded-but-unterminated text for one stream.
#[derive(Debug, Default)]
pub struct LineFramer {
    decoder: Utf8Decoder,
    buffer: String,
}

impl LineFramer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw chunk and return every line it completed, in order.
    ///
    /// Lines are returned without their `\n` terminator. The fragment after
    /// the last terminator stays buffered.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        // The retained buffer never holds a terminator, so only new text is scanned.
        let Some(last) = text.rfind('\n').map(|i| self.buffer.len() + i) else {
            self.buffer.push_str(&text);
            return Vec::new();
        };
        self.buffer.push_str(&text);
        let rest = self.buffer.split_off(last + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);
        complete[..last].split('\n').map(str::to_owned).collect()
    }

    /// Text currently buffered after the last line terminator.
    #[must_use]
    pub fn residual(&self) -> &str {
        &self.buffer
    }

    /// End the stream, discarding the unterminated residual.
    ///
    /// Returns the number of bytes discarded (buffered text plus undecoded bytes).
    pub fn finish(self) -> usize {
        let discarded = self.buffer.len() + self.decoder.pending_len();
        if discarded > 0 {
            tracing::debug!(bytes = discarded, "discarding unterminated trailing fragment");
        }
        discarded
    }
}

/// Frame a raw byte stream into a [`LineStream`].
///
/// Each await on the next chunk races `cancel`; once it fires the stream
/// yields [`ClientError::Cancelled`] and ends. A failed chunk read yields
/// [`ClientError::Network`] and ends the stream. Lines already yielded are
/// never retracted.
pub fn frame_lines<S, E>(byte_stream: S, cancel: CancellationToken) -> LineStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let lines = async_stream::stream! {
        let mut framer = LineFramer::new();
        let mut bytes_stream = std::pin::pin!(byte_stream);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = bytes_stream.next() => Some(next),
            };

            match next {
                None => {
                    tracing::debug!("chat stream cancelled");
                    yield Err(ClientError::Cancelled);
                    return;
                }
                Some(None) => break,
                Some(Some(Err(e))) => {
                    tracing::warn!(error = %e, "chat stream read failed");
                    yield Err(ClientError::Network(Box::new(e)));
                    return;
                }
                Some(Some(Ok(chunk))) => {
                    tracing::trace!(bytes = chunk.len(), "received chat stream chunk");
                    for line in framer.push(&chunk) {
                        yield Ok(line);
                    }
                }
            }
        }

        framer.finish();
    };

    LineStream {
        receiver: Box::pin(lines),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
