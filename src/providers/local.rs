//! Local-model backend: tokens are delivered by a synchronous callback from
//! a blocking inference session running on its own thread.
//!
//! The session starts as soon as `ask_stream` is called and may emit tokens
//! before the consumer polls; the push source's backlog queue absorbs the
//! head start. The inference loop is aborted by the callback's return value
//! once the consumer cancels or drops the stream.

use std::sync::Arc;

use tracing::debug;

use crate::provider::{AiProvider, ByteStream, ChatHistory, ChatTurn, StreamChunkCallback};
use crate::sources::push::PushSource;
use crate::sources::Fragment;
use crate::Error;

/// A blocking completion session over a locally loaded model.
///
/// `emit` is invoked once per decoded token fragment on the inference
/// thread; returning `false` aborts the run. Implementations must not
/// assume they share a call stack with the consumer.
pub trait CompletionEngine: Send + Sync + 'static {
    fn complete(
        &self,
        prompt: &str,
        history: &[ChatTurn],
        emit: &mut dyn FnMut(String) -> bool,
    ) -> Result<(), Error>;
}

pub struct LocalProvider {
    engine: Arc<dyn CompletionEngine>,
}

impl LocalProvider {
    pub fn new(engine: Arc<dyn CompletionEngine>) -> Self {
        Self { engine }
    }

    /// Load a GGUF model from disk. The model handle is long-lived; sessions
    /// are created per request.
    #[cfg(feature = "llama")]
    pub fn from_model_file(model_path: &str) -> Result<Self, Error> {
        Ok(Self::new(Arc::new(gguf::GgufEngine::load(model_path)?)))
    }
}

fn owned_history(history: Option<&ChatHistory>) -> Vec<ChatTurn> {
    history.map(<[ChatTurn]>::to_vec).unwrap_or_default()
}

#[async_trait::async_trait]
impl AiProvider for LocalProvider {
    async fn ask(&self, prompt: &str, history: Option<&ChatHistory>) -> Result<String, Error> {
        let engine = Arc::clone(&self.engine);
        let prompt = prompt.to_string();
        let history = owned_history(history);

        tokio::task::spawn_blocking(move || {
            let mut answer = String::new();
            engine.complete(&prompt, &history, &mut |token| {
                answer.push_str(&token);
                true
            })?;
            Ok(answer)
        })
        .await
        .map_err(|e| Error::engine(format!("inference task failed: {e}")))?
    }

    async fn ask_stream(
        &self,
        prompt: &str,
        transform: Option<StreamChunkCallback>,
        history: Option<&ChatHistory>,
    ) -> Result<ByteStream, Error> {
        let engine = Arc::clone(&self.engine);
        let prompt = prompt.to_string();
        let history = owned_history(history);

        let (source, handle) = PushSource::channel(transform);

        tokio::task::spawn_blocking(move || {
            let result = engine.complete(&prompt, &history, &mut |token| {
                // Empty decoded fragments stand for newlines.
                let text = if token.is_empty() {
                    "\n".to_string()
                } else {
                    token
                };
                handle.push(Fragment::Content(text))
            });

            match result {
                Ok(()) => handle.finish(),
                Err(error) => {
                    if handle.is_cancelled() {
                        debug!(error = %error, "inference failed after stream close");
                    } else {
                        handle.fail(error);
                    }
                }
            }
        });

        Ok(Box::pin(source))
    }
}

#[cfg(feature = "llama")]
mod gguf {
    use llama_cpp::standard_sampler::StandardSampler;
    use llama_cpp::{LlamaModel, LlamaParams, SessionParams};

    use super::CompletionEngine;
    use crate::provider::ChatTurn;
    use crate::Error;

    const MAX_COMPLETION_TOKENS: usize = 1024;

    pub struct GgufEngine {
        model: LlamaModel,
    }

    impl GgufEngine {
        pub fn load(model_path: &str) -> Result<Self, Error> {
            let model = LlamaModel::load_from_file(model_path, LlamaParams::default())
                .map_err(|e| Error::engine(e.to_string()))?;
            Ok(Self { model })
        }
    }

    impl CompletionEngine for GgufEngine {
        fn complete(
            &self,
            prompt: &str,
            history: &[ChatTurn],
            emit: &mut dyn FnMut(String) -> bool,
        ) -> Result<(), Error> {
            let mut session = self
                .model
                .create_session(SessionParams::default())
                .map_err(|e| Error::engine(e.to_string()))?;

            for turn in history {
                session
                    .advance_context(&turn.prompt)
                    .and_then(|_| session.advance_context(&turn.response))
                    .map_err(|e| Error::engine(e.to_string()))?;
            }
            session
                .advance_context(prompt)
                .map_err(|e| Error::engine(e.to_string()))?;

            let completion = session
                .start_completing_with(StandardSampler::default(), MAX_COMPLETION_TOKENS)
                .map_err(|e| Error::engine(e.to_string()))?;

            for token in completion.into_strings() {
                if !emit(token) {
                    break;
                }
            }

            Ok(())
        }
    }
}

#[cfg(feature = "llama")]
pub use gguf::GgufEngine;
