//! In-memory conversation transcript for one terminal session.

use chatline::ChatReply;
use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Local>,
    /// Tool output that arrived alongside a bot reply.
    pub tool_output: Option<String>,
    /// Status line (upload result, failure) rather than a chat reply.
    pub notice: bool,
}

impl Entry {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Local::now(),
            tool_output: None,
            notice: false,
        }
    }

    /// `HH:MM` local time.
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::new(Sender::User, text));
    }

    pub fn push_reply(&mut self, reply: ChatReply) {
        self.entries.push(Entry {
            tool_output: reply.tool_output,
            ..Entry::new(Sender::Bot, reply.text)
        });
    }

    /// A bot-side notice such as an upload result or a failure message.
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.entries.push(Entry {
            notice: true,
            ..Entry::new(Sender::Bot, text)
        });
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Tool output of the most recent bot reply, if that reply had any.
    pub fn last_tool_output(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.sender == Sender::Bot && !e.notice)
            .and_then(|e| e.tool_output.as_deref())
    }
}
