//! Test utilities for simulating Server-Sent Events (SSE) response bodies
//!
//! These helpers build byte streams shaped like `reqwest::Response::bytes_stream`,
//! optionally split at fixed byte boundaries, so framing and aggregation can be
//! exercised without a network.

use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Item type produced by the fake body streams
pub type FakeChunk = Result<Bytes, std::io::Error>;

/// Configuration for fake SSE response generation
#[derive(Debug, Clone, Default)]
pub struct FakeSseConfig {
    /// Whether to append a final "[DONE]" event
    pub include_done: bool,
    /// Split the body into chunks of this many bytes
    pub chunk_size: Option<usize>,
}

pub fn bytes_from_str(s: &str) -> Bytes {
    Bytes::from(s.to_string())
}

/// Creates a fake SSE body where each entry of `events` becomes one
/// `data: <event>\n\n` block.
pub fn fake_sse_response(events: &[&str], config: Option<FakeSseConfig>) -> FakeSseStream {
    let config = config.unwrap_or_default();

    let mut response = String::new();
    for event in events {
        response.push_str(&format!("data: {event}\n\n"));
    }

    if config.include_done {
        response.push_str("data: [DONE]\n\n");
    }

    FakeSseStream::new(response.into_bytes(), config.chunk_size)
}

/// Creates a fake SSE body with events split across chunk boundaries
pub fn fake_sse_response_chunked(events: &[&str], chunk_size: usize) -> FakeSseStream {
    fake_sse_response(
        events,
        Some(FakeSseConfig {
            chunk_size: Some(chunk_size),
            ..Default::default()
        }),
    )
}

/// Creates a fake SSE body that ends with a [DONE] event
pub fn fake_sse_response_with_done(events: &[&str]) -> FakeSseStream {
    fake_sse_response(
        events,
        Some(FakeSseConfig {
            include_done: true,
            ..Default::default()
        }),
    )
}

/// Serves `body` verbatim, optionally split every `chunk_size` bytes
pub fn raw_sse_response(body: &str, chunk_size: Option<usize>) -> FakeSseStream {
    FakeSseStream::new(body.as_bytes().to_vec(), chunk_size)
}

/// Serves `body` in one chunk and then fails the read with `message`
pub fn failing_stream(
    body: &str,
    message: &str,
) -> futures::stream::Iter<std::vec::IntoIter<FakeChunk>> {
    let chunks = vec![
        Ok(bytes_from_str(body)),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            message.to_string(),
        )),
    ];
    futures::stream::iter(chunks)
}

/// Fake response body backed by an in-memory buffer
pub struct FakeSseStream {
    data: Vec<u8>,
    position: usize,
    chunk_size: Option<usize>,
}

impl FakeSseStream {
    fn new(data: Vec<u8>, chunk_size: Option<usize>) -> Self {
        Self {
            data,
            position: 0,
            chunk_size,
        }
    }
}

impl Stream for FakeSseStream {
    type Item = FakeChunk;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.position >= self.data.len() {
            return Poll::Ready(None);
        }

        let chunk_size = self
            .chunk_size
            .unwrap_or(self.data.len() - self.position)
            .max(1);
        let end_pos = std::cmp::min(self.position + chunk_size, self.data.len());

        let chunk = self.data[self.position..end_pos].to_vec();
        self.position = end_pos;

        Poll::Ready(Some(Ok(Bytes::from(chunk))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_basic_fake_sse_response() {
        let stream = fake_sse_response(&["hello", "world"], None);
        let chunks: Vec<FakeChunk> = stream.collect().await;

        assert_eq!(chunks.len(), 1);
        let data = String::from_utf8(chunks[0].as_ref().unwrap().to_vec()).unwrap();
        assert_eq!(data, "data: hello\n\ndata: world\n\n");
    }

    #[tokio::test]
    async fn test_fake_sse_response_with_done() {
        let stream = fake_sse_response_with_done(&["test"]);
        let chunks: Vec<FakeChunk> = stream.collect().await;

        assert_eq!(chunks.len(), 1);
        let data = String::from_utf8(chunks[0].as_ref().unwrap().to_vec()).unwrap();
        assert_eq!(data, "data: test\n\ndata: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_fake_sse_response_chunked() {
        let stream = fake_sse_response_chunked(&["hello", "world"], 5);
        let chunks: Vec<FakeChunk> = stream.collect().await;

        assert!(chunks.len() > 1);

        let mut full_data = Vec::new();
        for chunk in chunks {
            full_data.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(full_data, b"data: hello\n\ndata: world\n\n");
    }

    #[tokio::test]
    async fn test_empty_events() {
        let chunks: Vec<FakeChunk> = fake_sse_response(&[], None).collect().await;
        assert!(chunks.is_empty());
    }
}
