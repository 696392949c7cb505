//! Payload-to-text extraction.
//!
//! Upstream services disagree on where the generated text lives in a JSON
//! event. An [`Extractor`] holds an ordered list of candidate locations
//! (JSON pointers) and uses the first one that holds something displayable.

use nonempty::NonEmpty;
use serde_json::Value;
use tracing::debug;

use crate::model::Extraction;

const PRIMARY_FIELD: &str = "/text";

const FALLBACK_FIELDS: [&str; 8] = [
    "/content",
    "/message/content",
    "/message",
    "/response",
    "/choices/0/text",
    "/choices/0/delta/content",
    "/choices/0/message/content",
    "/completion",
];

/// Finds the text fragment inside a single event payload.
///
/// # Example
/// ```
/// use chefstream::extract::Extractor;
///
/// let extractor = Extractor::default();
/// assert_eq!(extractor.fragment("{\"text\": \"Hello\"}"), Some("Hello".to_string()));
/// assert_eq!(extractor.fragment("plain words "), Some("plain words".to_string()));
/// assert_eq!(extractor.fragment("{\"usage\": 12}"), None);
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    candidates: NonEmpty<String>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            candidates: NonEmpty {
                head: PRIMARY_FIELD.to_string(),
                tail: FALLBACK_FIELDS.iter().map(|f| f.to_string()).collect(),
            },
        }
    }
}

impl Extractor {
    /// Create an extractor trying `candidates` in order.
    ///
    /// Each candidate is a JSON pointer such as `/choices/0/text`; a bare
    /// name like `answer` is taken as a top-level key.
    pub fn new(candidates: NonEmpty<String>) -> Self {
        Self {
            candidates: candidates.map(|c| {
                if c.starts_with('/') {
                    c
                } else {
                    format!("/{}", c)
                }
            }),
        }
    }

    /// The candidate pointers, in priority order.
    pub fn candidates(&self) -> &NonEmpty<String> {
        &self.candidates
    }

    /// Classify `payload`.
    ///
    /// A payload opening with `{` is a JSON object and is searched for a text
    /// field; if it does not parse it is malformed and yields nothing. A JSON
    /// string literal yields its decoded contents. Anything else is raw text
    /// and is returned trimmed.
    pub fn extract(&self, payload: &str) -> Extraction {
        let raw = payload.trim();

        if raw.starts_with('"') {
            if let Ok(Value::String(text)) = serde_json::from_str::<Value>(raw) {
                return Extraction::Text(text);
            }
        }

        if !raw.starts_with('{') {
            return Extraction::Text(raw.to_string());
        }

        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.find(&value),
            Err(err) => {
                debug!(error = %err, "malformed JSON payload");
                Extraction::NotFound
            }
        }
    }

    /// Extract and convert to a deliverable fragment in one step.
    pub fn fragment(&self, payload: &str) -> Option<String> {
        let fragment = self.extract(payload).into_fragment();
        if fragment.is_none() {
            debug!(payload, "payload has no displayable text, skipping");
        }
        fragment
    }

    fn find(&self, value: &Value) -> Extraction {
        for pointer in self.candidates.iter() {
            match value.pointer(pointer) {
                Some(Value::String(text)) if !text.is_empty() => {
                    return Extraction::Text(text.clone());
                }
                Some(nested @ (Value::Object(_) | Value::Array(_))) => {
                    return Extraction::Structured(nested.clone());
                }
                _ => continue,
            }
        }
        Extraction::NotFound
    }
}
