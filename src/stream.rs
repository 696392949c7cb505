//! Byte stream to fragment stream adapters.
//!
//! ```text
//! bytes ──▶ StreamSession::feed ──▶ fragments ... ──▶ StreamSession::finish ──▶ end
//! ```

use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;

use crate::client::StreamError;
use crate::session::StreamSession;

struct State<S> {
    bytes: std::pin::Pin<Box<S>>,
    session: Option<StreamSession>,
    ready: VecDeque<String>,
}

/// Drive `session` over a stream of byte chunks, yielding text fragments.
///
/// Fragments come out in arrival order. A transport error is yielded once and
/// ends the stream; fragments yielded before it stand.
///
/// # Example
/// ```
/// use chefstream::session::StreamSession;
/// use chefstream::stream::fragment_stream;
/// use futures::{executor::block_on, stream, StreamExt};
///
/// let chunks = stream::iter(vec![
///     Ok::<_, chefstream::StreamError>("data: {\"text\":\"Hel"),
///     Ok("lo\"}\n\ndata: [DONE]\n\n"),
/// ]);
/// let fragments: Vec<_> = block_on(fragment_stream(chunks, StreamSession::new()).collect());
/// assert_eq!(fragments.into_iter().map(Result::unwrap).collect::<Vec<_>>(), vec!["Hello"]);
/// ```
pub fn fragment_stream<S, B, E>(
    bytes: S,
    session: StreamSession,
) -> impl Stream<Item = Result<String, StreamError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: Into<StreamError> + Send,
{
    let state = State {
        bytes: Box::pin(bytes),
        session: Some(session),
        ready: VecDeque::new(),
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.ready.pop_front() {
                return Some((Ok(fragment), state));
            }

            if state.session.is_none() {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    if let Some(session) = state.session.as_mut() {
                        state.ready.extend(session.feed(chunk.as_ref()));
                    }
                }
                Some(Err(err)) => {
                    state.session = None;
                    return Some((Err(err.into()), state));
                }
                None => {
                    if let Some(session) = state.session.take() {
                        state.ready.extend(session.finish());
                    }
                }
            }
        }
    })
}

/// Extension trait for `reqwest::Response` to read it as text fragments.
///
/// # Example
/// ```ignore
/// use chefstream::stream::FragmentResponseExt;
///
/// let response = client.post(url).json(&body).send().await?;
/// let mut fragments = response.fragments();
/// while let Some(fragment) = fragments.next().await {
///     print!("{}", fragment?);
/// }
/// ```
pub trait FragmentResponseExt {
    fn fragments(self) -> impl Stream<Item = Result<String, StreamError>> + Send;
}

impl FragmentResponseExt for reqwest::Response {
    fn fragments(self) -> impl Stream<Item = Result<String, StreamError>> + Send {
        fragment_stream(self.bytes_stream(), StreamSession::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    async fn collect(chunks: Vec<Result<&'static str, StreamError>>) -> Vec<Result<String, StreamError>> {
        fragment_stream(stream::iter(chunks), StreamSession::new())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_fragments_in_order() {
        let results = collect(vec![
            Ok("data: {\"text\":\"1\"}\n\ndata: {\"te"),
            Ok("xt\":\"2\"}\n\n"),
            Ok("data: {\"text\":\"3\"}"),
        ])
        .await;

        let fragments: Vec<String> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(fragments, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_error_ends_stream_after_earlier_fragments() {
        let results = collect(vec![
            Ok("data: {\"text\":\"kept\"}\n\n"),
            Err(StreamError::Stream("connection reset".into())),
            Ok("data: {\"text\":\"never\"}\n\n"),
        ])
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "kept");
        assert!(matches!(results[1], Err(StreamError::Stream(_))));
    }

    #[tokio::test]
    async fn test_bytes_chunks() {
        let body = "data: {\"text\":\"Soto ayam 🍜\"}\n\n".as_bytes();
        let chunks: Vec<Result<Bytes, StreamError>> = body
            .chunks(3)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        let fragments: Vec<_> = fragment_stream(stream::iter(chunks), StreamSession::new())
            .collect()
            .await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_ref().unwrap(), "Soto ayam 🍜");
    }

    #[tokio::test]
    async fn test_empty_body() {
        assert!(collect(vec![]).await.is_empty());
    }
}
