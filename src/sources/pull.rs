//! Pull-model stream source: the consumer's poll drives the backend.

use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};

use super::Fragment;
use crate::event::{encode_event, AiStreamEvent};
use crate::provider::StreamChunkCallback;
use crate::Error;

/// Bridges a stream of backend [`Fragment`]s to the canonical byte sequence.
///
/// Each poll asks the backend for its next fragment, applies the optional
/// per-chunk transform (awaiting it before anything else is emitted, so
/// chunk order is preserved), encodes the result and hands it to the
/// consumer. A `Fault` fragment emits one `error` event and closes; a
/// transport error fails the stream itself.
pub struct EventSource {
    fragments: BoxStream<'static, Result<Fragment, Error>>,
    transform: Option<StreamChunkCallback>,
    /// In-flight transform for the chunk currently being emitted.
    pending: Option<BoxFuture<'static, String>>,
    closed: bool,
}

impl EventSource {
    pub fn new<S>(fragments: S, transform: Option<StreamChunkCallback>) -> Self
    where
        S: Stream<Item = Result<Fragment, Error>> + Send + 'static,
    {
        Self {
            fragments: fragments.boxed(),
            transform,
            pending: None,
            closed: false,
        }
    }

    /// Adapt a complete, already-buffered answer into a one-element stream.
    /// Used for backends with no native streaming mode.
    pub fn single(text: String, transform: Option<StreamChunkCallback>) -> Self {
        Self::new(
            stream::iter(vec![Ok(Fragment::Content(text))]),
            transform,
        )
    }
}

impl Stream for EventSource {
    type Item = Result<Bytes, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.closed {
            return Poll::Ready(None);
        }

        loop {
            if let Some(pending) = this.pending.as_mut() {
                let text = ready!(pending.as_mut().poll(cx));
                this.pending = None;
                return Poll::Ready(Some(Ok(encode_event(&AiStreamEvent::content(text)))));
            }

            match ready!(this.fragments.poll_next_unpin(cx)) {
                Some(Ok(Fragment::Content(text))) => match &this.transform {
                    Some(transform) => this.pending = Some(transform(text)),
                    None => {
                        return Poll::Ready(Some(Ok(encode_event(&AiStreamEvent::content(text)))));
                    }
                },
                Some(Ok(Fragment::Fault(error))) => {
                    this.closed = true;
                    return Poll::Ready(Some(Ok(encode_event(&AiStreamEvent::error(&error)))));
                }
                Some(Ok(Fragment::End)) | None => {
                    this.closed = true;
                    return Poll::Ready(None);
                }
                Some(Err(error)) => {
                    this.closed = true;
                    return Poll::Ready(Some(Err(error)));
                }
            }
        }
    }
}
