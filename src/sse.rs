//! Server-Sent Events (SSE) framing helpers.
//!
//! The generation service speaks a loose subset of SSE:
//! ```text
//! data: {"text": "Hel"}
//!
//! data: {"text": "lo"}
//!
//! data: [DONE]
//! ```
//! Only `data:` lines carry payloads; `event:`, `id:`, `retry:` and comment
//! lines are recognised for framing detection and otherwise ignored.

use crate::model::Framing;

/// Blank line separating two events.
pub const EVENT_DELIMITER: &str = "\n\n";

/// Payload that marks the end of generation.
pub const DONE_MARKER: &str = "[DONE]";

const FIELD_PREFIXES: [&str; 4] = ["data:", "event:", "id:", "retry:"];

/// Parse an SSE line to extract the data portion.
///
/// The space after the colon is optional and surrounding whitespace is
/// trimmed.
///
/// # Example
/// ```
/// use chefstream::sse::parse_sse_line;
///
/// assert_eq!(parse_sse_line("data: {\"text\": \"hi\"}"), Some("{\"text\": \"hi\"}"));
/// assert_eq!(parse_sse_line("data:hi"), Some("hi"));
/// assert_eq!(parse_sse_line("event: token"), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(|s| s.trim())
}

/// Check if an SSE data payload indicates the stream is done.
///
/// # Example
/// ```
/// use chefstream::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker("{\"text\": \"[DONE]\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == DONE_MARKER
}

/// Whether `line` is an SSE field (`data:`, `event:`, `id:`, `retry:`).
pub fn is_field_line(line: &str) -> bool {
    FIELD_PREFIXES.iter().any(|field| line.starts_with(field))
}

/// Non-empty `data:` payloads of one complete event, in line order.
pub fn event_payloads(event: &str) -> impl Iterator<Item = &str> {
    event
        .lines()
        .filter_map(parse_sse_line)
        .filter(|data| !data.is_empty())
}

/// Remove every complete `delimiter`-terminated segment from the front of
/// `buffer` and return them. The unterminated tail stays in `buffer`.
/// Blank segments are dropped.
pub fn drain_complete(buffer: &mut String, delimiter: &str) -> Vec<String> {
    let Some(pos) = buffer.rfind(delimiter) else {
        return Vec::new();
    };

    let segments = buffer[..pos]
        .split(delimiter)
        .filter(|segment| !segment.trim().is_empty())
        .map(str::to_string)
        .collect();

    buffer.drain(..pos + delimiter.len());
    segments
}

/// Replace CRLF line endings with LF in place.
///
/// A lone trailing `\r` is left alone; it is folded once its `\n` arrives.
pub fn normalize_newlines(buffer: &mut String) {
    if buffer.contains("\r\n") {
        *buffer = buffer.replace("\r\n", "\n");
    }
}

/// Decide how a body is framed from its leading text.
///
/// Returns [`Framing::Undetermined`] while the text is blank or could still
/// grow into an SSE field name (`"da"` may become `"data:"`).
pub fn detect_framing(text: &str) -> Framing {
    let lead = text.trim_start();

    if lead.is_empty() {
        return Framing::Undetermined;
    }

    if lead.starts_with(':') || is_field_line(lead) {
        return Framing::EventStream;
    }

    if FIELD_PREFIXES.iter().any(|field| field.starts_with(lead)) {
        return Framing::Undetermined;
    }

    if lead.starts_with('{') {
        Framing::JsonLines
    } else {
        Framing::PlainText
    }
}
