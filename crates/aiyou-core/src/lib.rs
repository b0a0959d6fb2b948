//! # aiyou-core - Rust client for the AI.You API
//!
//! An async client for the AI.You chat-completion service, with a streaming
//! decoder that reassembles server-sent-event responses into text.
//!
//! ## Features
//!
//! - **Completions** - Single-turn prompts answered as one string
//! - **Real-time Streaming** - Fragments delivered as the server produces them
//! - **Robust Framing** - Event boundaries survive arbitrary network chunking
//! - **Retries** - Exponential backoff with jitter for transient failures
//! - **Observability** - `log` diagnostics and `metrics` counters per stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aiyou_core::{AiYouClient, ClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClientOptions::new().with_temperature(0.7);
//!     let client = AiYouClient::new("your-api-key", options)?;
//!     let answer = client.completion("gpt-4o", "What is the capital of France?").await?;
//!     println!("Response: {answer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming API Overview
//!
//! [`AiYouClient::completion_stream`] returns a [`StreamResult`] yielding each
//! text fragment in arrival order:
//!
//! ```rust,no_run
//! use aiyou_core::{AiYouClient, ClientOptions};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AiYouClient::new("your-api-key", ClientOptions::new())?;
//!     let mut stream = client.completion_stream("gpt-4o", "Tell me a story").await?;
//!
//!     while let Some(fragment) = stream.next().await {
//!         print!("{}", fragment?);
//!         std::io::Write::flush(&mut std::io::stdout())?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The building blocks are public as well: [`sse_events`] frames any byte
//! stream into event payloads, [`delta_stream`] decodes those payloads into
//! fragments and [`aggregate`] concatenates them.
//!
//! ```rust
//! use aiyou_core::{aggregate, StreamConfig};
//! use bytes::Bytes;
//!
//! # tokio_test::block_on(async {
//! let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n\
//!             data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n\
//!             data: [DONE]\n\n";
//! let chunks = futures::stream::iter(
//!     body.as_bytes()
//!         .chunks(7)
//!         .map(|c| Ok::<_, std::io::Error>(Bytes::copy_from_slice(c)))
//!         .collect::<Vec<_>>(),
//! );
//! let text = aggregate(chunks, StreamConfig::default()).await.unwrap();
//! assert_eq!(text, "Hello");
//! # });
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, AiYouError>`](AiYouError):
//!
//! ```rust,no_run
//! use aiyou_core::{AiYouClient, AiYouError};
//!
//! # async fn run(client: AiYouClient) {
//! match client.completion("gpt-4o", "Hello").await {
//!     Ok(answer) => println!("Success: {answer}"),
//!     Err(AiYouError::Authentication { .. }) => println!("Invalid API key"),
//!     Err(e) if e.is_stream_corrupted() => println!("Broken stream: {e}"),
//!     Err(e) => println!("Other error: {e}"),
//! }
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod stream;
pub mod types;
pub mod utils;


pub use client::AiYouClient;
pub use config::{ClientOptions, RetryConfig};
pub use error::AiYouError;
pub use stream::{DONE_SENTINEL, StreamConfig, aggregate, delta_stream};
pub use types::{
    ChatCompletionChunk, ChatRole, CompletionProvider, CompletionRequest, CompletionResponse,
    ContextWindow, Model, StreamResult, Temperature,
};
pub use utils::sse::{EventFramer, sse_events};
