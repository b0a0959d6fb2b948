use crate::error::AiYouError;
use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

const COMMENT_MARKER: u8 = b':';
const DATA_PREFIX: &[u8] = b"data: ";

/// Frames a raw byte stream into Server-Sent Events payloads.
///
/// Each item is the content of every `data: ` line of one event, prefix and
/// surrounding whitespace stripped, concatenated without separator. Comment
/// lines and non-data fields never reach the output. A pending event is
/// flushed when the byte stream ends; an empty input produces no events.
pub fn sse_events<S, E>(stream: S) -> EventFramer<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    EventFramer::new(stream)
}

/// Incremental SSE framer over an arbitrarily chunked byte stream
pub struct EventFramer<S> {
    stream: S,
    /// Bytes read from the body that do not yet form a complete line
    pending: BytesMut,
    /// Accumulated data of the event in flight
    event: BytesMut,
    finished: bool,
}

impl<S> EventFramer<S> {
    fn new(stream: S) -> Self {
        Self {
            stream,
            pending: BytesMut::new(),
            event: BytesMut::new(),
            finished: false,
        }
    }

    fn next_line(&mut self) -> Option<BytesMut> {
        let newline = self.pending.iter().position(|&b| b == b'\n')?;
        Some(self.pending.split_to(newline + 1))
    }

    /// Applies one line to the event in flight, returning the payload when
    /// the line closes a non-empty event.
    fn process_line(&mut self, line: &[u8]) -> Option<Bytes> {
        if line.first() == Some(&COMMENT_MARKER) {
            return None;
        }

        if line.trim_ascii().is_empty() {
            return self.take_event();
        }

        if let Some(data) = line.strip_prefix(DATA_PREFIX) {
            self.event.extend_from_slice(data.trim_ascii());
        }

        None
    }

    fn take_event(&mut self) -> Option<Bytes> {
        if self.event.is_empty() {
            None
        } else {
            // split() hands out the filled region and keeps the spare capacity
            Some(self.event.split().freeze())
        }
    }
}

impl<S, E> Stream for EventFramer<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = Result<Bytes, AiYouError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            while let Some(line) = this.next_line() {
                if let Some(payload) = this.process_line(&line) {
                    return Poll::Ready(Some(Ok(payload)));
                }
            }

            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(AiYouError::network_with_source(
                        "Stream read failed",
                        e,
                    ))));
                }
                Poll::Ready(None) => {
                    this.finished = true;

                    // The last line may arrive without its terminator
                    if !this.pending.is_empty() {
                        let tail = this.pending.split();
                        if let Some(payload) = this.process_line(&tail) {
                            return Poll::Ready(Some(Ok(payload)));
                        }
                    }

                    return Poll::Ready(this.take_event().map(Ok));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
