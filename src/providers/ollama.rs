//! Ollama backend: a pull sequence of newline-delimited JSON chat responses.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;

use crate::ndjson::NdjsonStreamExt;
use crate::provider::{AiProvider, ByteStream, ChatHistory, StreamChunkCallback};
use crate::providers::wire::{messages_for, ChatRequest};
use crate::sources::pull::EventSource;
use crate::sources::Fragment;
use crate::Error;

const PROVIDER: &str = "Ollama";

/// One `/api/chat` response object, buffered or streamed.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

pub struct OllamaProvider {
    host: String,
    model: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            host: host.into(),
            model: model.into(),
            client,
        })
    }

    async fn chat(
        &self,
        prompt: &str,
        history: Option<&ChatHistory>,
        stream: bool,
    ) -> Result<reqwest::Response, Error> {
        // Ollama's chat body matches the chat-completions shape; `stream`
        // defaults to true on the server, so it is always sent explicitly.
        let request = ChatRequest {
            model: Some(self.model.clone()),
            messages: messages_for(prompt, history),
            stream: Some(stream),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response)
    }
}

fn line_fragment(line: &str) -> Fragment {
    let response: OllamaChatResponse = match serde_json::from_str(line) {
        Ok(response) => response,
        Err(e) => return Fragment::Fault(Error::Serialization(e)),
    };

    match response.message {
        Some(message) => Fragment::Content(message.content),
        None if response.done => Fragment::End,
        None => Fragment::Fault(Error::no_content(PROVIDER)),
    }
}

#[async_trait::async_trait]
impl AiProvider for OllamaProvider {
    async fn ask(&self, prompt: &str, history: Option<&ChatHistory>) -> Result<String, Error> {
        let response: OllamaChatResponse =
            self.chat(prompt, history, false).await?.json().await?;

        match response.message {
            Some(message) => Ok(message.content),
            None => Err(Error::no_content(PROVIDER)),
        }
    }

    async fn ask_stream(
        &self,
        prompt: &str,
        transform: Option<StreamChunkCallback>,
        history: Option<&ChatHistory>,
    ) -> Result<ByteStream, Error> {
        let response = self.chat(prompt, history, true).await?;

        let fragments = response
            .bytes_stream()
            .ndjson_lines()
            .map(|result| result.map(|line| line_fragment(&line)));

        Ok(Box::pin(EventSource::new(fragments, transform)))
    }
}
