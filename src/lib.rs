//! # chefstream - streaming reply consumer for the Home Chef AI generation service
//!
//! A small library that POSTs a prompt to a text-generation endpoint and
//! delivers the reply incrementally as it streams in.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental UTF-8 decoding that survives characters split across reads
//! - Tolerant framing: SSE `data:` events, JSON lines, or bare text
//! - Ordered list of candidate text fields for JSON payloads
//! - Cooperative cancellation via `CancellationToken`
//! - Exactly one terminal signal (complete or error) per request
//!
//! ## Architecture
//!
//! - **`StreamSession`**: per-request decoder + buffer; bytes in, fragments out
//! - **`fragment_stream`**: adapts any byte stream into a `Stream` of fragments
//! - **`Transport`**: opens the response body (`HttpTransport` uses reqwest)
//! - **`consume`**: the callback contract built on top of all of the above
//!
//! ## Example
//! ```no_run
//! use chefstream::client::FragmentHandler;
//! use chefstream::consumer::consume_with;
//! use chefstream::http::HttpTransport;
//! use chefstream::model::GenerateRequest;
//! use chefstream::options::{GenerationOptions, TransportOptions};
//! use chefstream::StreamError;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Printer;
//!
//! impl FragmentHandler for Printer {
//!     fn on_fragment(&mut self, text: &str) {
//!         print!("{}", text);
//!     }
//!
//!     fn on_complete(&mut self) {
//!         println!();
//!     }
//!
//!     fn on_error(&mut self, error: StreamError) {
//!         if error.is_cancelled() {
//!             println!("\n(stopped)");
//!         } else {
//!             eprintln!("\nerror: {}", error);
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpTransport::new(TransportOptions::from_env()?)?;
//!     let request = GenerateRequest::new("Bagaimana cara membuat sambal matah?", &GenerationOptions::default());
//!
//!     consume_with(&transport, &request, &mut Printer, &CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod consumer;
pub mod decode;
pub mod extract;
pub mod http;
pub mod model;
pub mod options;
pub mod session;
pub mod sse;
pub mod stream;

// Re-exports for convenience
pub use client::{Callbacks, FragmentHandler, StreamError, Transport};
pub use consumer::{collect_text, consume, consume_stream, consume_with};
pub use model::GenerateRequest;
pub use session::StreamSession;
pub use stream::{fragment_stream, FragmentResponseExt};
