//! Stream a reply from the generation service to stdout.
//!
//! Run with:
//! ```bash
//! export CHEFSTREAM_ENDPOINT="http://localhost:8000/generate"
//! cargo run --example stream_generate -- "Bagaimana cara membuat rendang?"
//! ```
//!
//! Press Ctrl-C to stop the generation early. Set `RUST_LOG=chefstream=debug`
//! to see framing and payload decisions.

use std::io::Write;

use chefstream::client::FragmentHandler;
use chefstream::consumer::consume_with;
use chefstream::http::HttpTransport;
use chefstream::model::GenerateRequest;
use chefstream::options::{GenerationOptions, TransportOptions};
use chefstream::StreamError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Prints fragments as they arrive and remembers the full reply.
#[derive(Default)]
struct Terminal {
    reply: String,
    outcome: Option<Result<(), StreamError>>,
}

impl FragmentHandler for Terminal {
    fn on_fragment(&mut self, text: &str) {
        self.reply.push_str(text);
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    fn on_complete(&mut self) {
        self.outcome = Some(Ok(()));
    }

    fn on_error(&mut self, error: StreamError) {
        self.outcome = Some(Err(error));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let prompt = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let prompt = if prompt.trim().is_empty() {
        "Bagaimana cara membuat nasi goreng?".to_string()
    } else {
        prompt
    };

    let transport = HttpTransport::new(TransportOptions::from_env()?)?;
    let request = GenerateRequest::new(prompt, &GenerationOptions::default());

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    println!("Streaming from {}...\n", transport.options().endpoint);

    let mut terminal = Terminal::default();
    consume_with(&transport, &request, &mut terminal, &cancel).await;

    match terminal.outcome {
        Some(Ok(())) => {
            println!("\n\n=== Stream Complete ({} chars) ===", terminal.reply.chars().count());
        }
        Some(Err(err)) if err.is_cancelled() => {
            println!("\n\n=== Generation was cancelled ===");
        }
        Some(Err(err)) => {
            eprintln!("\nError in stream: {}", err);
            return Err(err.into());
        }
        None => unreachable!("consume_with always reports an outcome"),
    }

    Ok(())
}
