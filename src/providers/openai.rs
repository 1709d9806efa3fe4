//! OpenAI backend: buffered JSON chunks over SSE.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;

use crate::provider::{AiProvider, ByteStream, ChatHistory, StreamChunkCallback};
use crate::providers::wire::{chunk_fragment, completion_text, messages_for, ChatRequest};
use crate::sources::pull::EventSource;
use crate::sources::Fragment;
use crate::sse::SseStreamExt;
use crate::Error;

const PROVIDER: &str = "OpenAI";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    model: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        Self::with_base_url(model, api_key, DEFAULT_BASE_URL)
    }

    /// Point the adapter at an OpenAI-compatible endpoint other than the
    /// hosted API.
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

    async fn chat(
        &self,
        prompt: &str,
        history: Option<&ChatHistory>,
        stream: bool,
    ) -> Result<reqwest::Response, Error> {
        let request = ChatRequest {
            model: Some(self.model.clone()),
            messages: messages_for(prompt, history),
            stream: stream.then_some(true),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response)
    }
}

#[async_trait::async_trait]
impl AiProvider for OpenAiProvider {
    async fn ask(&self, prompt: &str, history: Option<&ChatHistory>) -> Result<String, Error> {
        let completion = self.chat(prompt, history, false).await?.json().await?;
        completion_text(PROVIDER, completion)
    }

    async fn ask_stream(
        &self,
        prompt: &str,
        transform: Option<StreamChunkCallback>,
        history: Option<&ChatHistory>,
    ) -> Result<ByteStream, Error> {
        let response = self.chat(prompt, history, true).await?;

        let fragments = response.bytes_stream().sse_events().map(|result| {
            match result {
                Ok(event) if event.is_done() => Ok(Fragment::End),
                Ok(event) => Ok(chunk_fragment(PROVIDER, &event.data)),
                Err(e) => Err(e),
            }
        });

        Ok(Box::pin(EventSource::new(fragments, transform)))
    }
}
