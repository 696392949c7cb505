//! Request body and the small value types shared by the streaming pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::options::GenerationOptions;

/// Body POSTed to the generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateRequest {
    /// The user's message
    pub prompt: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for sampling
    pub temperature: f32,

    /// Top-p sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl GenerateRequest {
    /// Build a request for `prompt` using the given sampling parameters.
    pub fn new(prompt: impl Into<String>, options: &GenerationOptions) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
        }
    }
}

/// Outcome of looking for displayable text inside one payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A text field held a string.
    Text(String),

    /// A text field held an object or array; it is shown serialized.
    Structured(Value),

    /// Nothing usable was found.
    NotFound,
}

impl Extraction {
    /// Convert into the fragment to deliver, if any. Empty text yields nothing.
    pub fn into_fragment(self) -> Option<String> {
        match self {
            Extraction::Text(text) if !text.is_empty() => Some(text),
            Extraction::Text(_) => None,
            Extraction::Structured(value) => Some(value.to_string()),
            Extraction::NotFound => None,
        }
    }
}

/// How the upstream service frames its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Not enough content seen yet to decide.
    #[default]
    Undetermined,

    /// `data: <payload>` blocks separated by blank lines.
    EventStream,

    /// One JSON payload per line, no `data:` prefix.
    JsonLines,

    /// Bare incremental text.
    PlainText,
}
