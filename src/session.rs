//! Per-request buffering state for one streamed response.
//!
//! A [`StreamSession`] turns raw body bytes into text fragments. It owns the
//! incremental decoder and the not-yet-complete tail of the body, decides
//! once how the body is framed, and is consumed by [`StreamSession::finish`]
//! so it cannot be reused for a second request.

use tracing::{debug, info};

use crate::decode::Utf8Decoder;
use crate::extract::Extractor;
use crate::model::Framing;
use crate::sse::{self, EVENT_DELIMITER};

const LINE_DELIMITER: &str = "\n";

/// Buffering state machine for a single streamed response.
///
/// # Example
/// ```
/// use chefstream::session::StreamSession;
///
/// let mut session = StreamSession::new();
/// let mut fragments = session.feed(b"data: {\"text\":\"Hel");
/// fragments.extend(session.feed(b"lo\"}\n\ndata: {\"text\":\" world\"}\n\ndata: [DONE]\n\n"));
/// fragments.extend(session.finish());
/// assert_eq!(fragments, vec!["Hello", " world"]);
/// ```
#[derive(Debug, Default)]
pub struct StreamSession {
    decoder: Utf8Decoder,
    buffer: String,
    framing: Framing,
    extractor: Extractor,
    events: usize,
    fragments: usize,
    /// Event-stream text seen before any `data:` line. A body without one is
    /// plain text after all, and this is what gets emitted.
    unframed: String,
    data_lines: usize,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session that looks for text with a custom extractor.
    pub fn with_extractor(extractor: Extractor) -> Self {
        Self {
            extractor,
            ..Self::default()
        }
    }

    /// The framing detected so far.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Text received but not yet resolved into a complete event.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Feed the next chunk of body bytes, returning the fragments it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decoder.decode(chunk);
        self.absorb(&text, false)
    }

    /// Signal end of body. Whatever is still buffered is treated as a final,
    /// complete event.
    pub fn finish(mut self) -> Vec<String> {
        let tail = self.decoder.finish();
        let fragments = self.absorb(&tail, true);

        info!(
            framing = ?self.framing,
            events = self.events,
            fragments = self.fragments,
            "stream finished"
        );
        fragments
    }

    fn absorb(&mut self, text: &str, at_end: bool) -> Vec<String> {
        self.buffer.push_str(text);

        if self.framing == Framing::Undetermined {
            self.framing = sse::detect_framing(&self.buffer);
            if self.framing == Framing::Undetermined && at_end && !self.buffer.trim().is_empty() {
                self.framing = Framing::PlainText;
            }
            if self.framing != Framing::Undetermined {
                debug!(framing = ?self.framing, "detected body framing");
            }
            if self.framing == Framing::EventStream {
                self.unframed = self.buffer.clone();
            }
        } else if self.framing == Framing::EventStream && self.data_lines == 0 {
            self.unframed.push_str(text);
        }

        // Plain text is passed through as received, line endings included.
        if matches!(self.framing, Framing::EventStream | Framing::JsonLines) {
            sse::normalize_newlines(&mut self.buffer);
        }

        let mut out = Vec::new();
        match self.framing {
            Framing::Undetermined => {}
            Framing::EventStream => {
                for event in self.take_segments(EVENT_DELIMITER, at_end) {
                    self.events += 1;
                    self.data_lines += event.lines().filter(|line| sse::parse_sse_line(line).is_some()).count();
                    for payload in sse::event_payloads(&event) {
                        if sse::is_done_marker(payload) {
                            debug!("done marker received");
                            continue;
                        }
                        out.extend(self.extractor.fragment(payload));
                    }
                }

                if self.data_lines > 0 {
                    self.unframed = String::new();
                } else if at_end {
                    let raw = std::mem::take(&mut self.unframed);
                    if !raw.trim().is_empty() {
                        debug!("no data lines in body, delivering it as text");
                        out.push(raw.trim().to_string());
                    }
                }
            }
            Framing::JsonLines => {
                for line in self.take_segments(LINE_DELIMITER, at_end) {
                    self.events += 1;
                    let payload = sse::parse_sse_line(&line).unwrap_or(line.as_str());
                    if !sse::is_done_marker(payload.trim()) {
                        out.extend(self.extractor.fragment(payload));
                    }
                }
            }
            Framing::PlainText => {
                if !self.buffer.is_empty() {
                    self.events += 1;
                    out.push(std::mem::take(&mut self.buffer));
                }
            }
        }

        self.fragments += out.len();
        out
    }

    /// Complete segments from the buffer; at end of input the unterminated
    /// tail counts as complete too.
    fn take_segments(&mut self, delimiter: &str, at_end: bool) -> Vec<String> {
        let mut segments = sse::drain_complete(&mut self.buffer, delimiter);
        if at_end {
            let tail = std::mem::take(&mut self.buffer);
            if !tail.trim().is_empty() {
                segments.push(tail);
            }
        }
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(chunks: &[&[u8]]) -> Vec<String> {
        let mut session = StreamSession::new();
        let mut fragments = Vec::new();
        for chunk in chunks {
            fragments.extend(session.feed(chunk));
        }
        fragments.extend(session.finish());
        fragments
    }

    const BODY: &str = "data: {\"text\":\"Tumis \"}\n\ndata: {\"text\":\"bawang \"}\n\ndata: {\"text\":\"putih\"}\n\ndata: [DONE]\n\n";

    #[test]
    fn test_reference_scenario() {
        let fragments = run(&[
            b"data: {\"text\":\"Hel",
            b"lo\"}\n\ndata: {\"text\":\" world\"}\n\ndata: [DONE]\n\n",
        ]);
        assert_eq!(fragments, vec!["Hello", " world"]);
    }

    #[test]
    fn test_every_split_point_yields_same_fragments() {
        let bytes = BODY.as_bytes();
        for cut in 0..=bytes.len() {
            let fragments = run(&[&bytes[..cut], &bytes[cut..]]);
            assert_eq!(fragments, vec!["Tumis ", "bawang ", "putih"], "cut at {}", cut);
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let chunks: Vec<&[u8]> = BODY.as_bytes().chunks(1).collect();
        assert_eq!(run(&chunks), vec!["Tumis ", "bawang ", "putih"]);
    }

    #[test]
    fn test_multibyte_split_in_payload() {
        let body = "data: {\"text\":\"Crème brûlée 🍮\"}\n\n".as_bytes();
        let emoji_start = body.len() - "🍮\"}\n\n".len();
        for cut in emoji_start..emoji_start + 4 {
            let fragments = run(&[&body[..cut], &body[cut..]]);
            assert_eq!(fragments, vec!["Crème brûlée 🍮"], "cut at {}", cut);
        }
    }

    #[test]
    fn test_buffer_holds_only_unfinished_event() {
        let mut session = StreamSession::new();
        let fragments = session.feed(b"data: {\"text\":\"a\"}\n\ndata: {\"te");
        assert_eq!(fragments, vec!["a"]);
        assert_eq!(session.pending(), "data: {\"te");
    }

    #[test]
    fn test_done_marker_emits_nothing() {
        assert!(run(&[b"data: [DONE]\n\n"]).is_empty());
    }

    #[test]
    fn test_malformed_and_textless_payloads_are_skipped() {
        let fragments = run(&[
            b"data: {\"text\":\"satu\"}\n\n",
            b"data: {\"usage\": {\"tokens\": 3}}\n\n",
            b"data: {broken\n\n",
            b"data: plain words\n\n",
            b"data: {\"text\":\"dua\"}\n\n",
        ]);
        assert_eq!(fragments, vec!["satu", "plain words", "dua"]);
    }

    #[test]
    fn test_final_event_without_delimiter_is_flushed() {
        let fragments = run(&[b"data: {\"text\":\"a\"}\n\n", b"data: {\"text\":\"last\"}"]);
        assert_eq!(fragments, vec!["a", "last"]);
    }

    #[test]
    fn test_crlf_events() {
        let fragments = run(&[b"data: {\"text\":\"a\"}\r", b"\n\r\ndata: {\"text\":\"b\"}\r\n\r\n"]);
        assert_eq!(fragments, vec!["a", "b"]);
    }

    #[test]
    fn test_multiple_data_lines_in_one_event() {
        let fragments = run(&[b"event: token\ndata: one\ndata: two\n\n"]);
        assert_eq!(fragments, vec!["one", "two"]);
    }

    #[test]
    fn test_plain_text_fallback() {
        let mut session = StreamSession::new();
        assert_eq!(session.feed(b"Panaskan "), vec!["Panaskan "]);
        assert_eq!(session.framing(), Framing::PlainText);
        assert_eq!(session.feed(b"minyak\n\nlalu"), vec!["minyak\n\nlalu"]);
        assert!(session.finish().is_empty());
    }

    #[test]
    fn test_plain_text_keeps_crlf_in_every_chunk() {
        let mut session = StreamSession::new();
        assert_eq!(session.feed(b"Bahan:\r\n"), vec!["Bahan:\r\n"]);
        assert_eq!(session.feed(b"- cabai\r\n"), vec!["- cabai\r\n"]);
        assert_eq!(session.feed(b"- garam\r\n"), vec!["- garam\r\n"]);
        assert!(session.finish().is_empty());
    }

    #[test]
    fn test_colon_led_plain_text_is_not_dropped() {
        assert_eq!(run(&[b":) Selamat ", b"memasak"]), vec![":) Selamat memasak"]);
        assert_eq!(run(&[b": ", b"sajikan hangat\n\n"]), vec![": sajikan hangat"]);
    }

    #[test]
    fn test_comments_before_data_are_ignored() {
        let fragments = run(&[b": keep-alive\n\n", b"data: {\"text\":\"ok\"}\n\n"]);
        assert_eq!(fragments, vec!["ok"]);
    }

    #[test]
    fn test_leading_bom_before_event_stream() {
        let mut session = StreamSession::new();
        let mut fragments = session.feed(b"\xEF\xBB");
        fragments.extend(session.feed(b"\xBFdata: {\"text\":\"Hello\"}\n\ndata: [DONE]\n\n"));
        assert_eq!(session.framing(), Framing::EventStream);
        fragments.extend(session.finish());
        assert_eq!(fragments, vec!["Hello"]);
    }

    #[test]
    fn test_json_string_payloads() {
        let fragments = run(&[b"data: \"Hel\"\n\ndata: \"lo\"\n\ndata: [DONE]\n\n"]);
        assert_eq!(fragments, vec!["Hel", "lo"]);
    }

    #[test]
    fn test_plain_text_that_looks_like_a_field_prefix() {
        let mut session = StreamSession::new();
        assert!(session.feed(b"da").is_empty());
        assert_eq!(session.framing(), Framing::Undetermined);
        assert_eq!(session.feed(b"ging sapi"), vec!["daging sapi"]);
    }

    #[test]
    fn test_undetermined_at_end_is_plain_text() {
        assert_eq!(run(&[b"da"]), vec!["da"]);
        assert!(run(&[b"\n\n"]).is_empty());
        assert!(run(&[]).is_empty());
    }

    #[test]
    fn test_json_lines() {
        let fragments = run(&[
            b"{\"text\":\"Hel",
            b"lo\"}\n{\"response\":\" there\"}\n",
            b"not json\n{\"text\":\"!\"}",
        ]);
        assert_eq!(fragments, vec!["Hello", " there", "not json", "!"]);
    }

    #[test]
    fn test_custom_extractor() {
        let extractor = Extractor::new(nonempty::NonEmpty::new("token".to_string()));
        let mut session = StreamSession::with_extractor(extractor);
        let mut fragments = session.feed(b"data: {\"token\":\"x\",\"text\":\"y\"}\n\n");
        fragments.extend(session.finish());
        assert_eq!(fragments, vec!["x"]);
    }
}
