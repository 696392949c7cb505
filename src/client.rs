//! Error taxonomy and the seams between the consumer and its collaborators.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can end a streaming request.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Response body is not readable")]
    BodyUnavailable,

    #[error("JSON error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Stream cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StreamError {
    /// True when the caller stopped the request, as opposed to a failure.
    ///
    /// Issuers use this to show a neutral "stopped" notice instead of an error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }
}

/// Response body as a stream of raw byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Opens the streamed response for a request body.
///
/// [`crate::http::HttpTransport`] is the reqwest implementation; tests and
/// embedders can supply their own.
///
/// # Example
/// ```rust,ignore
/// struct Canned(Vec<&'static str>);
///
/// #[async_trait]
/// impl Transport for Canned {
///     async fn open(&self, _body: &Value) -> Result<ByteStream, StreamError> {
///         let chunks = self.0.iter().map(|c| Ok(Bytes::from_static(c.as_bytes())));
///         Ok(Box::pin(futures::stream::iter(chunks.collect::<Vec<_>>())))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `body` and return the response body once the status is known to
    /// be successful.
    async fn open(&self, body: &Value) -> Result<ByteStream, StreamError>;
}

/// Receives the output of one streaming request.
///
/// `on_fragment` is called zero or more times in arrival order, then exactly
/// one of `on_complete` or `on_error`.
pub trait FragmentHandler {
    fn on_fragment(&mut self, text: &str);

    fn on_complete(&mut self);

    fn on_error(&mut self, error: StreamError);
}

/// [`FragmentHandler`] built from three closures.
///
/// # Example
/// ```
/// use chefstream::client::{Callbacks, FragmentHandler};
///
/// let mut reply = String::new();
/// let mut handler = Callbacks::new(|text: &str| reply.push_str(text), || {}, |_| {});
/// handler.on_fragment("Hi");
/// drop(handler);
/// assert_eq!(reply, "Hi");
/// ```
pub struct Callbacks<F, C, E> {
    on_fragment: F,
    on_complete: C,
    on_error: E,
}

impl<F, C, E> Callbacks<F, C, E>
where
    F: FnMut(&str),
    C: FnMut(),
    E: FnMut(StreamError),
{
    pub fn new(on_fragment: F, on_complete: C, on_error: E) -> Self {
        Self {
            on_fragment,
            on_complete,
            on_error,
        }
    }
}

impl<F, C, E> FragmentHandler for Callbacks<F, C, E>
where
    F: FnMut(&str),
    C: FnMut(),
    E: FnMut(StreamError),
{
    fn on_fragment(&mut self, text: &str) {
        (self.on_fragment)(text)
    }

    fn on_complete(&mut self) {
        (self.on_complete)()
    }

    fn on_error(&mut self, error: StreamError) {
        (self.on_error)(error)
    }
}
