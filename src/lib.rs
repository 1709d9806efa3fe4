//! A unified streaming abstraction over multiple AI providers.
//!
//! Every backend — hosted OpenAI-compatible APIs, self-hosted Ollama, Azure
//! OpenAI deployments, or a locally loaded model — is exposed through one
//! capability contract ([`AiProvider`]): `ask` for a complete answer and
//! `ask_stream` for a lazily produced sequence of `text/event-stream` bytes,
//! with in-order, exactly-once chunk delivery and an optional per-chunk
//! transform.

pub mod chunk_queue;
pub mod error;
pub mod event;
pub mod factory;
pub mod ndjson;
pub mod provider;
pub mod providers;
pub mod sources;
pub mod sse;

// Re-export core types for easy usage
pub use chunk_queue::ChunkQueue;
pub use error::Error;
pub use event::{encode_event, AiStreamEvent};
pub use factory::{AiProviderConfig, ProviderFactory};
pub use provider::{
    chunk_callback, AiProvider, ByteStream, ChatHistory, ChatTurn, StreamChunkCallback,
};
pub use providers::*;
pub use sse::SseEvent;
