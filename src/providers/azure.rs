//! Azure OpenAI backend: a push-callback source fed by the adapter's own
//! reader task.
//!
//! Unlike the pull backends, the reader task runs on its own execution
//! context and may deliver chunks before the consumer starts pulling; the
//! push source's backlog queue keeps delivery strictly in production order.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::provider::{AiProvider, ByteStream, ChatHistory, StreamChunkCallback};
use crate::providers::wire::{chunk_fragment, completion_text, messages_for, ChatRequest};
use crate::sources::push::PushSource;
use crate::sources::Fragment;
use crate::sse::SseStreamExt;
use crate::Error;

const PROVIDER: &str = "Azure OpenAI";
const API_VERSION: &str = "2024-03-01-preview";

pub struct AzureProvider {
    endpoint: String,
    api_key: String,
    deployment_name: String,
    allow_insecure_connections: bool,
    /// Acquired lazily on first use.
    client: OnceCell<Client>,
}

impl AzureProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment_name: impl Into<String>,
        allow_insecure_connections: bool,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            deployment_name: deployment_name.into(),
            allow_insecure_connections,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client, Error> {
        self.client
            .get_or_try_init(|| async {
                let client = Client::builder()
                    .connect_timeout(Duration::from_secs(30))
                    .danger_accept_invalid_certs(self.allow_insecure_connections)
                    .build()?;
                Ok(client)
            })
            .await
    }

    async fn chat(
        &self,
        prompt: &str,
        history: Option<&ChatHistory>,
        stream: bool,
    ) -> Result<reqwest::Response, Error> {
        let request = ChatRequest {
            model: None,
            messages: messages_for(prompt, history),
            stream: stream.then_some(true),
        };

        let response = self
            .client()
            .await?
            .post(format!(
                "{}/openai/deployments/{}/chat/completions?api-version={API_VERSION}",
                self.endpoint, self.deployment_name
            ))
            .header("api-key", self.api_key.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response)
    }
}

#[async_trait::async_trait]
impl AiProvider for AzureProvider {
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
        // Connection establishment failures propagate here, before the byte
        // sequence exists; everything after this point is in-band.
        let response = self.chat(prompt, history, true).await?;

        let (source, handle) = PushSource::channel(transform);

        tokio::spawn(async move {
            let mut events = response.bytes_stream().sse_events();

            while let Some(result) = events.next().await {
                match result {
                    Ok(event) if event.is_done() => break,
                    Ok(event) => {
                        if !handle.push(chunk_fragment(PROVIDER, &event.data)) {
                            // Consumer went away; dropping the response body
                            // cancels the in-flight request.
                            debug!("consumer detached, aborting Azure stream");
                            return;
                        }
                    }
                    Err(error) => {
                        handle.fail(error);
                        return;
                    }
                }
            }

            handle.finish();
        });

        Ok(Box::pin(source))
    }
}
