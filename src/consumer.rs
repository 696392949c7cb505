//! The callback-driven streaming consumer.
//!
//! [`consume`] issues one POST to the generation endpoint and reports the
//! reply through a [`FragmentHandler`]: fragments in arrival order, then
//! exactly one terminal call. Cancellation goes through a
//! [`CancellationToken`]; once it fires no further fragments are delivered and
//! the handler receives [`StreamError::Cancelled`].
//!
//! There are no retries. A failed or cancelled request is terminal and the
//! issuer decides whether to send again.

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::{FragmentHandler, StreamError, Transport};
use crate::http::HttpTransport;
use crate::options::TransportOptions;
use crate::session::StreamSession;
use crate::stream::fragment_stream;

/// Stream a generation from `endpoint` into `handler`.
///
/// # Example
/// ```no_run
/// use chefstream::client::Callbacks;
/// use chefstream::consumer::consume;
/// use chefstream::model::GenerateRequest;
/// use chefstream::options::GenerationOptions;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() {
/// let request = GenerateRequest::new("Cara membuat rendang?", &GenerationOptions::default());
/// let cancel = CancellationToken::new();
/// let mut handler = Callbacks::new(
///     |text: &str| print!("{}", text),
///     || println!(),
///     |err| eprintln!("stopped: {}", err),
/// );
///
/// consume("http://localhost:8000/generate", &request, &mut handler, &cancel).await;
/// # }
/// ```
pub async fn consume<B, H>(endpoint: &str, body: &B, handler: &mut H, cancel: &CancellationToken)
where
    B: Serialize + ?Sized,
    H: FragmentHandler,
{
    match HttpTransport::new(TransportOptions::new(endpoint)) {
        Ok(transport) => consume_with(&transport, body, handler, cancel).await,
        Err(err) => report(handler, Err(err)),
    }
}

/// Stream a generation through `transport` into `handler`.
pub async fn consume_with<T, B, H>(transport: &T, body: &B, handler: &mut H, cancel: &CancellationToken)
where
    T: Transport + ?Sized,
    B: Serialize + ?Sized,
    H: FragmentHandler,
{
    let result: Result<(), StreamError> = async {
        let body = serde_json::to_value(body)?;
        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            opened = transport.open(&body) => opened?,
        };
        deliver(fragment_stream(bytes, StreamSession::new()), handler, cancel).await
    }
    .await;

    report(handler, result);
}

/// Run an already-open body through `session` into `handler`.
///
/// Useful when the caller owns the transport or needs a custom
/// [`crate::extract::Extractor`].
pub async fn consume_stream<S, C, E, H>(
    bytes: S,
    session: StreamSession,
    handler: &mut H,
    cancel: &CancellationToken,
) where
    S: Stream<Item = Result<C, E>> + Send,
    C: AsRef<[u8]> + Send,
    E: Into<StreamError> + Send,
    H: FragmentHandler,
{
    let result = deliver(fragment_stream(bytes, session), handler, cancel).await;
    report(handler, result);
}

/// Accumulate the whole reply, e.g. to persist it once generation ends.
pub async fn collect_text<T, B>(transport: &T, body: &B, cancel: &CancellationToken) -> Result<String, StreamError>
where
    T: Transport + ?Sized,
    B: Serialize + ?Sized,
{
    let mut collector = TextCollector::default();
    consume_with(transport, body, &mut collector, cancel).await;
    collector.into_result()
}

async fn deliver<S, H>(fragments: S, handler: &mut H, cancel: &CancellationToken) -> Result<(), StreamError>
where
    S: Stream<Item = Result<String, StreamError>>,
    H: FragmentHandler,
{
    let mut fragments = Box::pin(fragments);

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            next = fragments.next() => next,
        };

        match next {
            Some(Ok(fragment)) => handler.on_fragment(&fragment),
            Some(Err(err)) => return Err(err),
            None => return Ok(()),
        }
    }
}

fn report<H: FragmentHandler>(handler: &mut H, result: Result<(), StreamError>) {
    match result {
        Ok(()) => handler.on_complete(),
        Err(err) => {
            if err.is_cancelled() {
                info!("generation cancelled by caller");
            } else {
                warn!(error = %err, "generation stream failed");
            }
            handler.on_error(err);
        }
    }
}

#[derive(Default)]
struct TextCollector {
    text: String,
    error: Option<StreamError>,
}

impl TextCollector {
    fn into_result(self) -> Result<String, StreamError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.text),
        }
    }
}

impl FragmentHandler for TextCollector {
    fn on_fragment(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn on_complete(&mut self) {}

    fn on_error(&mut self, error: StreamError) {
        self.error = Some(error);
    }
}
