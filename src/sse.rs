//! Incremental parsing of Server-Sent Events from a byte stream.
//!
//! The OpenAI-compatible backends deliver completion chunks as
//! `data: <json>\n\n` records, terminated by a `data: [DONE]` sentinel.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Stream, StreamExt};
use memchr::memmem;

use crate::Error;

const MAX_BUFFERED_BYTES: usize = 1_000_000;

/// A parsed SSE record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, when present.
    pub event_type: Option<String>,
    /// Joined `data:` lines.
    pub data: String,
}

impl SseEvent {
    /// Whether this is the `[DONE]` sentinel ending a completion stream.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Adapter turning a raw byte stream into parsed [`SseEvent`]s.
///
/// Bytes are buffered until a full `\n\n`-terminated record is available, so
/// records split across transport chunks (including mid-UTF-8-codepoint
/// splits) are handled correctly.
pub struct SseStream<S> {
    inner: S,
    buffer: Vec<u8>,
    parsed: VecDeque<SseEvent>,
}

impl<S> SseStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            parsed: VecDeque::new(),
        }
    }

    /// Move every complete record out of the buffer into `parsed`.
    fn parse_buffer(&mut self) -> Result<(), Error> {
        let finder = memmem::Finder::new(b"\n\n");
        let mut start = 0;

        while let Some(pos) = finder.find(&self.buffer[start..]) {
            let record_end = start + pos;
            let record = std::str::from_utf8(&self.buffer[start..record_end])
                .map_err(|e| Error::streaming(format!("invalid UTF-8 in SSE record: {e}")))?;

            if let Some(event) = parse_record(record) {
                self.parsed.push_back(event);
            }

            start = record_end + 2;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(())
    }
}

/// Parse one complete record. Returns `None` for comment-only records.
fn parse_record(record: &str) -> Option<SseEvent> {
    let mut event_type = None;
    let mut data_lines = Vec::new();

    for line in record.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        if let Some((field, mut value)) = line.split_once(':') {
            if let Some(stripped) = value.strip_prefix(' ') {
                value = stripped;
            }
            match field {
                "event" => event_type = Some(value.to_string()),
                "data" => data_lines.push(value.to_string()),
                _ => {}
            }
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event_type,
        data: data_lines.join("\n"),
    })
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = Result<SseEvent, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.parsed.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            let chunk = match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    return Poll::Ready(Some(Err(Error::streaming(format!(
                        "transport error: {}",
                        e.into()
                    )))));
                }
                None => {
                    // A final record may arrive without its trailing blank line.
                    if !self.buffer.is_empty() {
                        let trailing = std::str::from_utf8(&self.buffer)
                            .ok()
                            .and_then(parse_record);
                        self.buffer.clear();
                        if let Some(event) = trailing {
                            return Poll::Ready(Some(Ok(event)));
                        }
                    }
                    return Poll::Ready(None);
                }
            };

            self.buffer.extend_from_slice(&chunk);
            if self.buffer.len() > MAX_BUFFERED_BYTES {
                self.buffer.clear();
                return Poll::Ready(Some(Err(Error::streaming(
                    "SSE buffer exceeded maximum size",
                ))));
            }

            if let Err(e) = self.parse_buffer() {
                return Poll::Ready(Some(Err(e)));
            }
        }
    }
}

/// Extension trait to parse byte streams as SSE.
pub trait SseStreamExt: Stream {
    fn sse_events(self) -> SseStream<Self>
    where
        Self: Sized,
    {
        SseStream::new(self)
    }
}

impl<S: Stream> SseStreamExt for S {}
