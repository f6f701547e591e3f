//! # askstream - streaming answers from a question-answering API
//!
//! A small, pragmatic Rust library that sends a question to a remote
//! document question-answering service and turns its long-lived, chunked
//! response into an ordered sequence of typed events.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental UTF-8 decoding and newline frame reassembly that are
//!   independent of how the transport chunks the body
//! - Typed events: answer tokens, source citations, conversation ids, end
//!   and error markers
//! - Prompt cancellation with no events after the cancel
//! - Pluggable transport trait, with a reqwest-based HTTP implementation
//!
//! ## Architecture
//!
//! Each delivery from the transport flows through, in order:
//!
//! 1. [`decoder::TextDecoder`]: bytes to text, carrying split characters
//! 2. [`frame::FrameReassembler`]: text to newline-delimited frames
//! 3. [`parser::FrameParser`]: frame to [`Event`]
//! 4. [`stream::EventStream`]: ordered delivery to the caller
//!
//! One [`session::StreamSession`] owns the state of a single exchange.
//!
//! ## Example
//! ```no_run
//! use askstream::client::AskClient;
//! use askstream::http::HttpStreamTransport;
//! use askstream::model::{AskRequest, Event};
//! use askstream::options::{AskOptions, HttpTransport, TransportOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = HttpStreamTransport::new(TransportOptions::new(
//!         HttpTransport::new("your-api-key").with_base_url("http://localhost:7091".to_string()),
//!     ))?;
//!     let client = AskClient::new(transport, AskOptions::default());
//!
//!     let mut events = client.ask(AskRequest::new("How do I install it?")).await?;
//!     while let Some(event) = events.next().await {
//!         match event {
//!             Event::Token { text } => print!("{}", text),
//!             Event::Source { title, .. } => println!("\n[source: {}]", title),
//!             Event::ConversationId { id } => println!("[conversation {}]", id),
//!             Event::End => println!(),
//!             Event::Error { cause } => eprintln!("\nerror: {}", cause),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod decoder;
pub mod frame;
pub mod http;
pub mod model;
pub mod options;
pub mod parser;
pub mod session;
pub mod stream;

// Re-exports for convenience
pub use cancel::CancelHandle;
pub use client::{AskClient, ClientError, Transport};
pub use model::{AskRequest, Event, Exchange};
pub use session::{SessionOutcome, SessionState};
pub use stream::{EventStream, SessionHandle};
