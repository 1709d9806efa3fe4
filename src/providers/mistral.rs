//! Mistral backend: plain request/response, adapted into a single-chunk
//! stream.

use std::time::Duration;

use reqwest::Client;

use crate::provider::{AiProvider, ByteStream, ChatHistory, StreamChunkCallback};
use crate::providers::wire::{completion_text, messages_for, ChatRequest};
use crate::sources::pull::EventSource;
use crate::Error;

const PROVIDER: &str = "Mistral";
const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

pub struct MistralProvider {
    model: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl MistralProvider {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        Self::with_base_url(model, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl AiProvider for MistralProvider {
    async fn ask(&self, prompt: &str, history: Option<&ChatHistory>) -> Result<String, Error> {
        let request = ChatRequest {
            model: Some(self.model.clone()),
            messages: messages_for(prompt, history),
            stream: None,
        };

        let completion = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        completion_text(PROVIDER, completion)
    }

    /// No native streaming mode: perform one complete `ask`, then emit the
    /// whole answer as a single `content` event followed by closure.
    async fn ask_stream(
        &self,
        prompt: &str,
        transform: Option<StreamChunkCallback>,
        history: Option<&ChatHistory>,
    ) -> Result<ByteStream, Error> {
        let text = self.ask(prompt, history).await?;
        Ok(Box::pin(EventSource::single(text, transform)))
    }
}
