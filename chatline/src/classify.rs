//! Line classification and reply accumulation.
//!
//! Each complete line from the chat stream is one of:
//! - blank (skipped)
//! - a bracket-delimited aggregate, i.e. a tool response
//!   (`["tool_call: lookup"]`)
//! - a record carrying text in `chunk` or `response` (`{"chunk":"Hello"}`)
//! - noise that does not parse (dropped)
//!
//! Text and tool output are accumulated separately. The text view has the
//! user's own prompt stripped when the backend echoes it back.

use serde_json::Value;

/// Content fields checked in priority order.
const CONTENT_KEYS: [&str; 2] = ["chunk", "response"];

/// How a single stream line is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or whitespace-only line.
    Skip,
    /// Conversational text to append to the reply.
    Text(String),
    /// Tool response, already pretty-printed.
    Structured(String),
    /// Not parseable as JSON, or carries no usable content.
    Noise,
}

/// Classify one stream line.
///
/// The bracket test is syntactic and runs before any JSON parsing, so a
/// line like `[not valid json]` is dropped as noise instead of being
/// treated as a record.
#[must_use]
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Skip;
    }

    if is_bracketed(trimmed) {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => LineKind::Structured(pretty(&value)),
            Err(e) => {
                tracing::debug!(error = %e, line = %trimmed, "dropping malformed bracketed line");
                LineKind::Noise
            }
        };
    }

    let record: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, line = %trimmed, "dropping unparseable stream line");
            return LineKind::Noise;
        }
    };

    match content_of(&record) {
        Some(Value::String(text)) => classify_text(text),
        Some(value @ (Value::Array(_) | Value::Object(_))) => LineKind::Structured(pretty(value)),
        _ => LineKind::Noise,
    }
}

/// A text payload that is itself a JSON aggregate is a tool response.
fn classify_text(text: &str) -> LineKind {
    let trimmed = text.trim();
    if is_bracketed(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return LineKind::Structured(pretty(&value));
        }
        tracing::debug!("bracketed content is not JSON, keeping it as text");
    }
    LineKind::Text(text.to_string())
}

/// First non-empty content field of a record.
fn content_of(record: &Value) -> Option<&Value> {
    let fields = record.as_object()?;
    CONTENT_KEYS
        .iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !is_empty_value(value))
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Bool(true) => false,
    }
}

fn is_bracketed(trimmed: &str) -> bool {
    trimmed.starts_with('[') && trimmed.ends_with(']')
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Strip a verbatim echo of `prompt` from the start of `text`.
///
/// Repeated echoes are stripped as well, so applying this to its own output
/// changes nothing. An empty prompt strips nothing.
#[must_use]
pub fn strip_prompt_echo<'a>(text: &'a str, prompt: &str) -> &'a str {
    if prompt.is_empty() {
        return text;
    }
    let mut rest = text;
    while let Some(stripped) = rest.strip_prefix(prompt) {
        rest = stripped;
    }
    rest
}

/// Incremental view produced by [`ResponseAccumulator::apply_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Full cumulative reply text, prompt echo stripped.
    Text(String),
    /// Full cumulative tool output.
    Structured(String),
}

/// Finalized result of one chat send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatReply {
    /// Reply text with the prompt echo stripped and surrounding whitespace trimmed.
    pub text: String,
    /// Tool output collected during the stream, if any.
    pub tool_output: Option<String>,
}

/// Accumulates one streamed reply.
#[derive(Debug, Clone)]
pub struct ResponseAccumulator {
    prompt: String,
    text: String,
    structured: String,
}

impl ResponseAccumulator {
    /// Start accumulating the reply to `prompt`.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            text: String::new(),
            structured: String::new(),
        }
    }

    /// Classify `line` and fold it into the matching accumulator.
    ///
    /// Returns `None` when the line changed nothing.
    pub fn apply_line(&mut self, line: &str) -> Option<Update> {
        match classify_line(line) {
            LineKind::Skip | LineKind::Noise => None,
            LineKind::Text(text) => {
                self.text.push_str(&text);
                tracing::trace!(len = self.text.len(), "reply text updated");
                Some(Update::Text(self.display_text().to_string()))
            }
            LineKind::Structured(output) => {
                tracing::debug!(len = output.len(), "tool response detected");
                self.structured.push_str(&output);
                Some(Update::Structured(self.structured.clone()))
            }
        }
    }

    /// Reply text as it should be shown right now.
    #[must_use]
    pub fn display_text(&self) -> &str {
        strip_prompt_echo(&self.text, &self.prompt)
    }

    /// Raw accumulated text, including any prompt echo.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.text
    }

    /// Tool output accumulated so far.
    #[must_use]
    pub fn structured(&self) -> &str {
        &self.structured
    }

    /// Consume the accumulator into the final reply.
    #[must_use]
    pub fn finish(self) -> ChatReply {
        let text = self.display_text().trim().to_string();
        let tool_output = Some(self.structured.trim().to_string()).filter(|s| !s.is_empty());
        ChatReply { text, tool_output }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn text_updates(acc: &mut ResponseAccumulator, lines: &[&str]) -> Vec<String> {
        lines
            .iter()
            .filter_map(|line| match acc.apply_line(line) {
                Some(Update::Text(t)) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert_eq!(classify_line(""), LineKind::Skip);
        assert_eq!(classify_line("   \t\r"), LineKind::Skip);
    }

    #[test]
    fn chunk_field_is_text() {
        assert_eq!(
            classify_line(r#"{"chunk":"Hello"}"#),
            LineKind::Text("Hello".into())
        );
    }

    #[test]
    fn response_field_used_when_chunk_absent() {
        assert_eq!(
            classify_line(r#"{"response":"42"}"#),
            LineKind::Text("42".into())
        );
    }

    #[test]
    fn chunk_takes_priority_over_response() {
        assert_eq!(
            classify_line(r#"{"response":"second","chunk":"first"}"#),
            LineKind::Text("first".into())
        );
    }

    #[test]
    fn empty_chunk_falls_back_to_response() {
        assert_eq!(
            classify_line(r#"{"chunk":"","response":"fallback"}"#),
            LineKind::Text("fallback".into())
        );
    }

    #[test]
    fn falsy_chunk_falls_back_to_response() {
        for chunk in ["0", "0.0", "false", "null"] {
            let line = format!(r#"{{"chunk":{chunk},"response":"x"}}"#);
            assert_eq!(classify_line(&line), LineKind::Text("x".into()), "chunk = {chunk}");
        }
    }

    #[test]
    fn nonzero_number_chunk_is_noise() {
        assert_eq!(classify_line(r#"{"chunk":7,"response":"x"}"#), LineKind::Noise);
    }

    #[test]
    fn record_without_content_is_noise() {
        assert_eq!(classify_line(r#"{"status":"ok"}"#), LineKind::Noise);
        assert_eq!(classify_line(r#"{"chunk":null}"#), LineKind::Noise);
        assert_eq!(classify_line(r#"{"chunk":""}"#), LineKind::Noise);
    }

    #[test]
    fn non_object_scalars_are_noise() {
        assert_eq!(classify_line(r#""just a string""#), LineKind::Noise);
        assert_eq!(classify_line("17"), LineKind::Noise);
    }

    #[test]
    fn invalid_json_is_noise() {
        assert_eq!(classify_line("INFO: worker started"), LineKind::Noise);
        assert_eq!(classify_line(r#"{"chunk":"unterminated"#), LineKind::Noise);
    }

    #[test]
    fn bracketed_line_is_structured_and_pretty_printed() {
        assert_eq!(
            classify_line(r#"["tool_call: lookup"]"#),
            LineKind::Structured("[\n  \"tool_call: lookup\"\n]".into())
        );
    }

    #[test]
    fn bracketed_line_with_objects_uses_two_space_indent() {
        let kind = classify_line(r#"[{"name":"Ada","score":9}]"#);
        let LineKind::Structured(out) = &kind else {
            panic!("expected Structured, got: {kind:?}");
        };
        assert!(out.contains("\n  {\n    \"name\": \"Ada\""), "got: {out}");
    }

    #[test]
    fn unclosed_bracket_is_noise() {
        assert_eq!(classify_line("[not valid json"), LineKind::Noise);
    }

    #[test]
    fn bracketed_but_invalid_json_is_noise_not_text() {
        assert_eq!(classify_line("[not valid json]"), LineKind::Noise);
    }

    #[test]
    fn bracketed_text_payload_is_structured() {
        let kind = classify_line(r#"{"chunk":"[{\"candidate\":\"Ada\"}]"}"#);
        assert!(matches!(
            kind,
            LineKind::Structured(ref s) if s.contains("\"candidate\": \"Ada\"")
        ));
    }

    #[test]
    fn bracketed_text_payload_that_is_not_json_stays_text() {
        assert_eq!(
            classify_line(r#"{"chunk":"[see attached]"}"#),
            LineKind::Text("[see attached]".into())
        );
    }

    #[test]
    fn array_payload_is_structured() {
        let kind = classify_line(r#"{"chunk":[{"type":"text","text":"hit"}]}"#);
        assert!(matches!(kind, LineKind::Structured(ref s) if s.contains("\"type\": \"text\"")));
    }

    #[test]
    fn strip_removes_echoed_prompt() {
        assert_eq!(strip_prompt_echo("hi there", "hi"), " there");
    }

    #[test]
    fn strip_leaves_unrelated_text() {
        assert_eq!(strip_prompt_echo("hello", "hi"), "hello");
    }

    #[test]
    fn strip_with_empty_prompt_is_noop() {
        assert_eq!(strip_prompt_echo("anything", ""), "anything");
    }

    #[test]
    fn strip_is_idempotent_on_repeated_echo() {
        let once = strip_prompt_echo("hihi there", "hi");
        assert_eq!(once, " there");
        assert_eq!(strip_prompt_echo(once, "hi"), once);
    }

    #[test]
    fn callback_sequence_is_cumulative() {
        let mut acc = ResponseAccumulator::new("question");
        let updates = text_updates(&mut acc, &[r#"{"chunk":"Hello"}"#, r#"{"chunk":" world"}"#]);
        assert_eq!(updates, vec!["Hello", "Hello world"]);
    }

    #[test]
    fn echoed_prompt_is_stripped_incrementally_and_trimmed_at_finish() {
        let mut acc = ResponseAccumulator::new("hi");
        let updates = text_updates(&mut acc, &[r#"{"chunk":"hi there"}"#]);
        assert_eq!(updates, vec![" there"]);
        assert_eq!(acc.raw_text(), "hi there");
        assert_eq!(acc.finish().text, "there");
    }

    #[test]
    fn echo_split_across_lines_is_stripped_once_complete() {
        let mut acc = ResponseAccumulator::new("hello");
        let updates = text_updates(
            &mut acc,
            &[r#"{"chunk":"hel"}"#, r#"{"chunk":"lo"}"#, r#"{"chunk":" back"}"#],
        );
        assert_eq!(updates, vec!["hel", "", " back"]);
    }

    #[test]
    fn structured_lines_never_reach_text() {
        let mut acc = ResponseAccumulator::new("q");
        let update = acc.apply_line(r#"["tool_call: lookup"]"#);
        assert!(matches!(update, Some(Update::Structured(_))));
        assert_eq!(acc.raw_text(), "");
        assert!(acc.structured().contains("tool_call: lookup"));
    }

    #[test]
    fn noise_touches_neither_accumulator() {
        let mut acc = ResponseAccumulator::new("q");
        assert_eq!(acc.apply_line("[not valid json"), None);
        assert_eq!(acc.apply_line("garbage"), None);
        assert_eq!(acc.apply_line("   "), None);
        assert_eq!(acc.raw_text(), "");
        assert_eq!(acc.structured(), "");
    }

    #[test]
    fn noise_between_text_lines_does_not_lose_text() {
        let mut acc = ResponseAccumulator::new("q");
        let updates = text_updates(
            &mut acc,
            &[r#"{"chunk":"a"}"#, "oops{", r#"{"chunk":"b"}"#],
        );
        assert_eq!(updates, vec!["a", "ab"]);
    }

    #[test]
    fn structured_output_accumulates_across_lines() {
        let mut acc = ResponseAccumulator::new("q");
        acc.apply_line("[1]");
        let update = acc.apply_line("[2]");
        assert_eq!(
            update,
            Some(Update::Structured("[\n  1\n][\n  2\n]".into()))
        );
    }

    #[test]
    fn finish_without_tool_output_has_none() {
        let mut acc = ResponseAccumulator::new("q");
        acc.apply_line(r#"{"chunk":"  answer  "}"#);
        let reply = acc.finish();
        assert_eq!(reply.text, "answer");
        assert_eq!(reply.tool_output, None);
    }

    #[test]
    fn finish_with_tool_output_keeps_it() {
        let mut acc = ResponseAccumulator::new("q");
        acc.apply_line(r#"["row"]"#);
        acc.apply_line(r#"{"response":"done"}"#);
        let reply = acc.finish();
        assert_eq!(reply.text, "done");
        assert_eq!(reply.tool_output.as_deref(), Some("[\n  \"row\"\n]"));
    }
}
