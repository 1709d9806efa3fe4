//! Chat-completions wire types shared by the OpenAI-compatible backends.

use serde::{Deserialize, Serialize};

use crate::provider::ChatTurn;
use crate::sources::Fragment;
use crate::Error;

/// One message in a backend request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Request body for `POST .../chat/completions` (and Ollama's `/api/chat`,
/// which shares the shape).
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Absent for Azure, where the deployment is addressed in the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Translate chat history into the role-alternating message list every
/// backend expects: user/assistant per prior turn, oldest first, then the
/// new prompt as a final user message.
pub fn messages_for(prompt: &str, history: Option<&[ChatTurn]>) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    if let Some(history) = history {
        for turn in history {
            messages.push(ChatMessage::user(turn.prompt.clone()));
            messages.push(ChatMessage::assistant(turn.response.clone()));
        }
    }

    messages.push(ChatMessage::user(prompt));
    messages
}

/// A buffered (non-streaming) completion response.
#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

/// One streamed completion chunk (the payload of an SSE `data:` record).
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkChoice {
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<String>,
}

/// Extract the answer text from a buffered completion, or the backend's
/// no-content condition.
pub fn completion_text(provider: &'static str, completion: ChatCompletion) -> Result<String, Error> {
    let Some(choice) = completion.choices.into_iter().next() else {
        return Err(Error::no_content(provider));
    };

    choice
        .message
        .and_then(|message| message.content)
        .ok_or(Error::no_content(provider))
}

/// Normalize one streamed chunk's JSON into a [`Fragment`]: content text,
/// or a fault for zero choices, an absent delta, null content, or a payload
/// that does not parse.
pub fn chunk_fragment(provider: &'static str, data: &str) -> Fragment {
    let chunk: ChatChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return Fragment::Fault(Error::Serialization(e)),
    };

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Fragment::Fault(Error::no_content(provider));
    };

    match choice.delta.and_then(|delta| delta.content) {
        Some(text) => Fragment::Content(text),
        None => Fragment::Fault(Error::no_content(provider)),
    }
}
