//! Incremental parsing of newline-delimited JSON from a byte stream.
//!
//! Ollama's chat endpoint answers a streaming request with one JSON object
//! per line. Same buffering design as [`crate::sse`].

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures_util::{Stream, StreamExt};
use memchr::memchr;

use crate::Error;

const MAX_BUFFERED_BYTES: usize = 1_000_000;

/// Adapter yielding one line of JSON text per item.
pub struct NdjsonStream<S> {
    inner: S,
    buffer: Vec<u8>,
    lines: VecDeque<String>,
}

impl<S> NdjsonStream<S> {
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            lines: VecDeque::new(),
        }
    }

    fn parse_buffer(&mut self) -> Result<(), Error> {
        let mut start = 0;

        while let Some(pos) = memchr(b'\n', &self.buffer[start..]) {
            let line_end = start + pos;
            let line = std::str::from_utf8(&self.buffer[start..line_end])
                .map_err(|e| Error::streaming(format!("invalid UTF-8 in NDJSON line: {e}")))?
                .trim();

            if !line.is_empty() {
                self.lines.push_back(line.to_string());
            }

            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(())
    }
}

impl<S, E> Stream for NdjsonStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(line) = self.lines.pop_front() {
                return Poll::Ready(Some(Ok(line)));
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
                    // The last line may not be newline-terminated.
                    if !self.buffer.is_empty() {
                        let trailing = std::str::from_utf8(&self.buffer)
                            .map(|s| s.trim().to_string())
                            .ok()
                            .filter(|s| !s.is_empty());
                        self.buffer.clear();
                        if let Some(line) = trailing {
                            return Poll::Ready(Some(Ok(line)));
                        }
                    }
                    return Poll::Ready(None);
                }
            };

            self.buffer.extend_from_slice(&chunk);
            if self.buffer.len() > MAX_BUFFERED_BYTES {
                self.buffer.clear();
                return Poll::Ready(Some(Err(Error::streaming(
                    "NDJSON buffer exceeded maximum size",
                ))));
            }

            if let Err(e) = self.parse_buffer() {
                return Poll::Ready(Some(Err(e)));
            }
        }
    }
}

/// Extension trait to parse byte streams as NDJSON lines.
pub trait NdjsonStreamExt: Stream {
    fn ndjson_lines(self) -> NdjsonStream<Self>
    where
        Self: Sized,
    {
        NdjsonStream::new(self)
    }
}

impl<S: Stream> NdjsonStreamExt for S {}
