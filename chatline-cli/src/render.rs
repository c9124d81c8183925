//! Incremental terminal rendering of a streamed reply.

use std::io::Write;

/// Prints a cumulative reply as it grows.
///
/// The client reports the full reply text on every update; only the part
/// not yet on screen is written. When an update no longer extends what is
/// shown (the prompt echo was stripped after the fact), the new text is
/// started on a fresh line.
pub struct StreamPrinter<W: Write> {
    out: W,
    shown: String,
}

impl<W: Write> StreamPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown: String::new(),
        }
    }

    pub fn update(&mut self, text: &str) {
        let result = match text.strip_prefix(self.shown.as_str()) {
            Some(suffix) => self.out.write_all(suffix.as_bytes()),
            None if self.shown.is_empty() => self.out.write_all(text.as_bytes()),
            None => self
                .out
                .write_all(b"\n")
                .and_then(|()| self.out.write_all(text.as_bytes())),
        }
        .and_then(|()| self.out.flush());

        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to write reply to terminal");
        }
        self.shown = text.to_string();
    }

    /// Terminate the streamed line, if anything was printed.
    pub fn finish(mut self) -> W {
        if !self.shown.is_empty() {
            if let Err(e) = self.out.write_all(b"\n").and_then(|()| self.out.flush()) {
                tracing::warn!(error = %e, "failed to write reply to terminal");
            }
        }
        self.out
    }

    pub fn has_output(&self) -> bool {
        !self.shown.is_empty()
    }
}
