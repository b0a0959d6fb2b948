//! Decoding of streamed completions.
//!
//! [`sse_events`] frames the response body into event payloads; this module
//! turns those payloads into text. Each payload is either the `[DONE]`
//! sentinel or a JSON [`ChatCompletionChunk`] whose `delta.content` fragments
//! are emitted in arrival order. A payload that does not decode aborts the
//! whole stream with [`AiYouError::StreamCorrupted`]; nothing is skipped.

use crate::error::AiYouError;
use crate::types::ChatCompletionChunk;
use crate::utils::debug::{debug_json, debug_log};
use crate::utils::sse::sse_events;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use metrics::{counter, histogram};
use std::time::{Duration, Instant};

/// Payload the server sends once generation is complete
pub const DONE_SENTINEL: &[u8] = b"[DONE]";

/// Configuration for stream decoding
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamConfig {
    /// Log every event, decoded chunk and appended fragment at debug level
    pub debug: bool,
}

/// Decodes framed event payloads into the text fragments they carry.
///
/// Empty payloads and the `[DONE]` sentinel are skipped; reading continues
/// until `events` ends. The first read error or undecodable payload is
/// yielded and ends the stream.
pub fn delta_stream<S>(
    events: S,
    config: StreamConfig,
) -> impl Stream<Item = Result<String, AiYouError>> + Send
where
    S: Stream<Item = Result<Bytes, AiYouError>> + Unpin + Send,
{
    async_stream::stream! {
        let mut events = events;
        let mut metrics = StreamingMetrics::new();
        debug_log!(config.debug, "Starting stream processing");

        while let Some(event) = events.next().await {
            let payload = match event {
                Ok(payload) => payload,
                Err(e) => {
                    metrics.record_error();
                    yield Err(e);
                    return;
                }
            };
            metrics.record_event();
            debug_log!(config.debug, "Received event: {}", String::from_utf8_lossy(&payload));

            if payload.is_empty() {
                continue;
            }
            if payload.as_ref() == DONE_SENTINEL {
                debug_log!(config.debug, "Received [DONE] event");
                continue;
            }

            let chunk: ChatCompletionChunk = match serde_json::from_slice(&payload) {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug_log!(config.debug, "Error parsing stream chunk: {e}");
                    metrics.record_error();
                    yield Err(AiYouError::stream_corrupted(
                        format!("invalid chunk payload: {e}"),
                        e,
                    ));
                    return;
                }
            };
            debug_json(config.debug, "Parsed stream chunk", &chunk);

            for fragment in chunk.fragments() {
                metrics.record_fragment(fragment);
                debug_log!(config.debug, "Added content: {fragment:?}");
                yield Ok(fragment.to_string());
            }
        }

        metrics.finalize();
    }
}

/// Reassembles the full answer from an SSE response body.
///
/// Returns the concatenation of every content fragment, or the first
/// read/corruption error. No partial text is returned on failure.
pub async fn aggregate<S, E>(stream: S, config: StreamConfig) -> Result<String, AiYouError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let deltas = delta_stream(sse_events(stream), config);
    let mut deltas = std::pin::pin!(deltas);

    let mut result = String::new();
    while let Some(fragment) = deltas.next().await {
        result.push_str(&fragment?);
    }

    debug_log!(config.debug, "Stream processing completed, final result: {result:?}");
    Ok(result)
}

/// Per-stream counters, published through the `metrics` facade
#[derive(Debug)]
struct StreamingMetrics {
    start_time: Instant,
    first_fragment_latency: Option<Duration>,
    events: usize,
    fragments: usize,
    bytes: usize,
}

impl StreamingMetrics {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            first_fragment_latency: None,
            events: 0,
            fragments: 0,
            bytes: 0,
        }
    }

    fn record_event(&mut self) {
        self.events += 1;
        counter!("aiyou_stream_events_total").increment(1);
    }

    fn record_fragment(&mut self, fragment: &str) {
        if self.first_fragment_latency.is_none() {
            let latency = self.start_time.elapsed();
            self.first_fragment_latency = Some(latency);
            histogram!("aiyou_stream_first_fragment_latency_ms").record(latency.as_millis() as f64);
        }
        self.fragments += 1;
        self.bytes += fragment.len();
    }

    fn record_error(&self) {
        counter!("aiyou_stream_errors_total").increment(1);
    }

    fn finalize(&self) {
        let total_duration = self.start_time.elapsed();

        if total_duration.as_secs_f64() > 0.0 {
            let fragments_per_second = self.fragments as f64 / total_duration.as_secs_f64();
            histogram!("aiyou_stream_fragments_per_second").record(fragments_per_second);
        }
        counter!("aiyou_stream_completions_total").increment(1);

        log::trace!(
            "Stream completed: {} events, {} fragments, {} bytes in {:?}",
            self.events,
            self.fragments,
            self.bytes,
            total_duration
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_helpers::{
        failing_stream, fake_sse_response, fake_sse_response_with_done, raw_sse_response,
    };
    use futures::stream;

    async fn aggregate_str(input: &str) -> Result<String, AiYouError> {
        aggregate(raw_sse_response(input, None), StreamConfig::default()).await
    }

    #[tokio::test]
    async fn test_concatenates_fragments() {
        let input = "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\" World\"}}]}\n\n\
                     data: [DONE]\n\n";
        assert_eq!(aggregate_str(input).await.unwrap(), "Hello World");
    }

    #[tokio::test]
    async fn test_role_only_metadata_is_ignored() {
        let stream = fake_sse_response_with_done(&[
            r#"{"choices":[{"delta":{"role":"assistant","content":"Hello"}}]}"#,
            r#"{"choices":[{"delta":{"content":"!"}}]}"#,
        ]);
        let result = aggregate(stream, StreamConfig::default()).await.unwrap();
        assert_eq!(result, "Hello!");
    }

    #[tokio::test]
    async fn test_empty_choices() {
        assert_eq!(aggregate_str("data: {\"choices\":[]}\n\n").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_invalid_json_is_corruption() {
        let err = aggregate_str("data: {invalid json}\n\n").await.unwrap_err();
        assert!(err.is_stream_corrupted(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_corruption_after_content_returns_no_partial_text() {
        let stream = fake_sse_response(
            &[r#"{"choices":[{"delta":{"content":"Hello"}}]}"#, "not json"],
            None,
        );
        let err = aggregate(stream, StreamConfig::default()).await.unwrap_err();
        assert!(err.is_stream_corrupted());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_corruption() {
        let err = aggregate_str("data: {\"choices\":{\"delta\":1}}\n\n").await.unwrap_err();
        assert!(err.is_stream_corrupted());
    }

    #[tokio::test]
    async fn test_empty_input() {
        assert_eq!(aggregate_str("").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_missing_done_sentinel() {
        let stream = fake_sse_response(
            &[
                r#"{"choices":[{"delta":{"content":"no"}}]}"#,
                r#"{"choices":[{"delta":{"content":" sentinel"}}]}"#,
            ],
            None,
        );
        let result = aggregate(stream, StreamConfig::default()).await.unwrap();
        assert_eq!(result, "no sentinel");
    }

    #[tokio::test]
    async fn test_reading_continues_after_done() {
        let input = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
                     data: [DONE]\n\n\
                     : trailing keep-alive\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n";
        assert_eq!(aggregate_str(input).await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn test_null_and_empty_content_contribute_nothing() {
        let stream = fake_sse_response(
            &[
                r#"{"choices":[{"delta":{"role":"assistant","content":null}}]}"#,
                r#"{"choices":[{"delta":{"content":""}}]}"#,
                r#"{"choices":[{"delta":{"content":"ok"}}]}"#,
                r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"total_tokens":3}}"#,
            ],
            None,
        );
        let result = aggregate(stream, StreamConfig::default()).await.unwrap();
        assert_eq!(result, "ok");
    }

    #[tokio::test]
    async fn test_multiple_choices_keep_array_order() {
        let input = "data: {\"choices\":[{\"index\":1,\"delta\":{\"content\":\"B\"}},{\"index\":0,\"delta\":{\"content\":\"A\"}}]}\n\n";
        assert_eq!(aggregate_str(input).await.unwrap(), "BA");
    }

    #[tokio::test]
    async fn test_null_delta_and_index_contribute_nothing() {
        let stream = fake_sse_response_with_done(&[
            r#"{"choices":[{"index":0,"delta":null}]}"#,
            r#"{"choices":[{"index":null,"delta":{"content":"ok"}}]}"#,
            r#"{"choices":[{"index":0,"delta":null,"finish_reason":"stop"}]}"#,
        ]);
        let result = aggregate(stream, StreamConfig::default()).await.unwrap();
        assert_eq!(result, "ok");

        assert_eq!(
            aggregate_str("data: {\"choices\":[{\"index\":null}]}\n\n").await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_read_error_is_propagated() {
        let stream = failing_stream(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "connection reset",
        );
        let err = aggregate(stream, StreamConfig::default()).await.unwrap_err();
        assert!(matches!(err, AiYouError::Network { .. }), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_chunking_does_not_change_result() {
        let input = ": ping\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"Ça \"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"marche 👍\"}}]}\n\n\
                     data: [DONE]\n\n";
        let whole = aggregate_str(input).await.unwrap();
        assert_eq!(whole, "Ça marche 👍");

        for chunk_size in [1, 2, 3, 5, 13] {
            let stream = raw_sse_response(input, Some(chunk_size));
            let split = aggregate(stream, StreamConfig::default()).await.unwrap();
            assert_eq!(split, whole, "chunk size {chunk_size}");
        }
    }

    #[tokio::test]
    async fn test_debug_does_not_change_result() {
        let stream = fake_sse_response_with_done(&[
            r#"{"choices":[{"delta":{"content":"Hello"}}]}"#,
            r#"{"choices":[{"delta":{"content":" World"}}]}"#,
        ]);
        let result = aggregate(stream, StreamConfig { debug: true }).await.unwrap();
        assert_eq!(result, "Hello World");
    }

    #[tokio::test]
    async fn test_delta_stream_yields_each_fragment() {
        let events = sse_events(fake_sse_response_with_done(&[
            r#"{"choices":[{"delta":{"content":"one"}}]}"#,
            r#"{"choices":[{"delta":{"content":"two"}}]}"#,
        ]));
        let fragments: Vec<String> = delta_stream(events, StreamConfig::default())
            .map(|f| f.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_delta_stream_skips_empty_payloads_and_stops_on_error() {
        let payloads = vec![
            Ok(Bytes::new()),
            Ok(Bytes::from_static(br#"{"choices":[{"delta":{"content":"x"}}]}"#)),
            Ok(Bytes::from_static(b"{oops")),
            Ok(Bytes::from_static(br#"{"choices":[{"delta":{"content":"never"}}]}"#)),
        ];
        let results: Vec<Result<String, AiYouError>> =
            delta_stream(stream::iter(payloads), StreamConfig::default())
                .collect()
                .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), "x");
        assert!(results[1].as_ref().unwrap_err().is_stream_corrupted());
    }
}
