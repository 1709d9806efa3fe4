//! Backend adapter implementations.

pub mod azure;
pub mod local;
pub mod mistral;
pub mod ollama;
pub mod openai;
pub mod wire;

pub use azure::AzureProvider;
pub use local::{CompletionEngine, LocalProvider};
pub use mistral::MistralProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
