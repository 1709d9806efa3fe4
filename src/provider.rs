//! The capability contract every backend adapter implements.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::Stream;

use crate::Error;

/// One prior exchange in a conversation. The caller supplies the full history
/// on every call; adapters translate it into the backend's native message
/// list and never mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub prompt: String,
    pub response: String,
}

impl ChatTurn {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
        }
    }
}

/// An ordered sequence of prior exchanges, oldest first.
pub type ChatHistory = [ChatTurn];

/// Optionally-async transform applied to each content fragment's text before
/// it is encoded. The producer awaits its completion before encoding the next
/// fragment, so ordering across chunks is preserved.
pub type StreamChunkCallback = Arc<dyn Fn(String) -> BoxFuture<'static, String> + Send + Sync>;

/// Build a [`StreamChunkCallback`] from an async closure.
pub fn chunk_callback<F, Fut>(callback: F) -> StreamChunkCallback
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = String> + Send + 'static,
{
    Arc::new(move |chunk| Box::pin(callback(chunk)))
}

/// The canonical lazily-produced sequence of wire-ready event bytes.
///
/// Items are encoded `content`/`error` events (see [`crate::event`]). An
/// `Err` item is a transport-level failure of the whole operation; errors
/// that occur once streaming is underway are delivered in-band as `error`
/// events instead.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// A backend that can answer prompts, buffered or streamed.
///
/// Instances are long-lived: constructed once from configuration at startup
/// and shared read-only across concurrent requests.
#[async_trait::async_trait]
pub trait AiProvider: Send + Sync + 'static {
    /// Send one request and wait for the complete answer.
    ///
    /// Fails with [`Error::NoContent`] when the backend returns zero choices
    /// or a null message body.
    async fn ask(&self, prompt: &str, history: Option<&ChatHistory>) -> Result<String, Error>;

    /// Return a not-yet-started event stream; pulling it drives the backend
    /// interaction. `transform`, when supplied, runs on each fragment's text
    /// before encoding.
    async fn ask_stream(
        &self,
        prompt: &str,
        transform: Option<StreamChunkCallback>,
        history: Option<&ChatHistory>,
    ) -> Result<ByteStream, Error>;
}

impl std::fmt::Debug for dyn AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AiProvider")
    }
}
