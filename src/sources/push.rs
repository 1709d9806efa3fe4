//! Push-model stream source: the backend emits on its own execution context.
//!
//! The producer half ([`PushHandle`]) lives on the backend's callback path —
//! a reader task or an inference thread — and never blocks: fragments that
//! arrive before the consumer polls are parked in a [`ChunkQueue`] and
//! drained strictly oldest-first once it does, so delivery order always
//! matches production order.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{ready, Context, Poll, Waker};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::Stream;
use tracing::{debug, trace};

use super::Fragment;
use crate::chunk_queue::ChunkQueue;
use crate::event::{encode_event, AiStreamEvent};
use crate::provider::StreamChunkCallback;
use crate::Error;

struct Shared {
    backlog: ChunkQueue<Fragment>,
    /// The producer finished; close once the backlog is drained.
    finished: bool,
    /// A producer failure to surface as one in-band error event.
    failure: Option<Error>,
    /// Consumer abandoned the stream; producers must stop.
    cancelled: bool,
    waker: Option<Waker>,
}

impl Shared {
    fn wake(&mut self) {
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

/// Producer half: hand fragments to the consumer from the backend's own
/// execution context. Every operation is non-blocking.
pub struct PushHandle {
    shared: Arc<Mutex<Shared>>,
}

impl PushHandle {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        // The queue mutex is only ever held for a push or a pop; a poisoned
        // lock means a panic mid-operation, which nothing can recover from.
        self.shared.lock().expect("push source state poisoned")
    }

    /// Enqueue one fragment. Returns `false` once the consumer has gone away,
    /// signalling the producer to stop.
    pub fn push(&self, fragment: Fragment) -> bool {
        let mut shared = self.lock();
        if shared.cancelled {
            trace!("dropping fragment pushed after stream close");
            return false;
        }
        shared.backlog.push(fragment);
        shared.wake();
        true
    }

    /// Signal clean completion. Closure is deferred until the backlog drains.
    pub fn finish(&self) {
        let mut shared = self.lock();
        shared.finished = true;
        shared.wake();
    }

    /// Report a producer-side failure. Surfaced as one in-band `error` event
    /// while the sink is open; logged and swallowed once it is closed.
    pub fn fail(&self, error: Error) {
        let mut shared = self.lock();
        if shared.cancelled || shared.finished {
            debug!(error = %error, "backend failure after stream close");
        } else {
            shared.failure = Some(error);
        }
        shared.finished = true;
        shared.wake();
    }

    /// Whether the consumer has cancelled or dropped the stream.
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }
}

/// Consumer half: the canonical byte sequence backed by the shared queue.
pub struct PushSource {
    shared: Arc<Mutex<Shared>>,
    transform: Option<StreamChunkCallback>,
    /// In-flight transform for the chunk currently being emitted.
    pending: Option<BoxFuture<'static, String>>,
    closed: bool,
}

impl PushSource {
    /// Create a connected source/handle pair.
    pub fn channel(transform: Option<StreamChunkCallback>) -> (PushSource, PushHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            backlog: ChunkQueue::new(),
            finished: false,
            failure: None,
            cancelled: false,
            waker: None,
        }));

        (
            PushSource {
                shared: Arc::clone(&shared),
                transform,
                pending: None,
                closed: false,
            },
            PushHandle { shared },
        )
    }

    /// Abandon the stream: no further `content` events are emitted and the
    /// producer is told to abort. Idempotent; dropping the source has the
    /// same effect.
    pub fn cancel(&self) {
        let mut shared = self.shared.lock().expect("push source state poisoned");
        shared.cancelled = true;
    }
}

impl Drop for PushSource {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Stream for PushSource {
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

            let mut shared = this.shared.lock().expect("push source state poisoned");

            if shared.cancelled {
                this.closed = true;
                return Poll::Ready(None);
            }

            if let Some(fragment) = shared.backlog.pop() {
                drop(shared);
                match fragment {
                    Fragment::Content(text) => match &this.transform {
                        Some(transform) => this.pending = Some(transform(text)),
                        None => {
                            return Poll::Ready(Some(Ok(encode_event(&AiStreamEvent::content(
                                text,
                            )))));
                        }
                    },
                    Fragment::Fault(error) => {
                        this.closed = true;
                        return Poll::Ready(Some(Ok(encode_event(&AiStreamEvent::error(&error)))));
                    }
                    Fragment::End => {
                        this.closed = true;
                        return Poll::Ready(None);
                    }
                }
            } else if let Some(error) = shared.failure.take() {
                drop(shared);
                this.closed = true;
                return Poll::Ready(Some(Ok(encode_event(&AiStreamEvent::error(&error)))));
            } else if shared.finished {
                this.closed = true;
                return Poll::Ready(None);
            } else {
                shared.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }
        }
    }
}
