//! Streaming question example.
//!
//! Run with:
//! ```bash
//! export ASKSTREAM_BASE_URL="http://localhost:7091"
//! export ASKSTREAM_API_KEY="your-api-key"
//! RUST_LOG=askstream=debug cargo run --example ask_streaming -- "How do I install it?"
//! ```

use std::io::Write;
use std::time::Duration;

use askstream::client::AskClient;
use askstream::http::HttpStreamTransport;
use askstream::model::{AskRequest, Event};
use askstream::options::{AskOptions, HttpTransport, TransportOptions};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What is this project about?".to_string());

    let transport_options = TransportOptions::new(HttpTransport::from_env()?)
        .with_idle_timeout(Duration::from_secs(60));
    let client = AskClient::new(
        HttpStreamTransport::new(transport_options)?,
        AskOptions::default(),
    );

    let handle = client.ask_with_handler(AskRequest::new(question), |event| {
        match event {
            Event::Token { text } => {
                print!("{}", text);
                std::io::stdout().flush()?;
            }
            Event::Source { title, .. } => println!("\n[source] {}", title),
            Event::ConversationId { id } => println!("[conversation] {}", id),
            Event::End => println!("\n=== Stream Complete ==="),
            Event::Error { cause } => eprintln!("\nError in stream: {}", cause),
        }
        Ok(())
    });

    // Ctrl-C abandons the answer without further output
    let cancel = handle.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let outcome = handle.await?;
    eprintln!(
        "{:?}: {} frames, {} dropped, server ended: {}",
        outcome.state, outcome.frames, outcome.dropped_frames, outcome.server_ended
    );
    Ok(())
}
