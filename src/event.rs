//! Encoding of stream events into the Event Stream wire format.
//!
//! See <https://developer.mozilla.org/en-US/docs/Web/API/Server-sent_events/Using_server-sent_events#event_stream_format>

use bytes::Bytes;
use serde::Serialize;

use crate::Error;

/// One event on the wire: either a content chunk or an in-band error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiStreamEvent {
    /// A fragment of the answer.
    Content { response: String },
    /// A terminal in-band failure. Encoded instead of thrown because the
    /// transport has already committed to `text/event-stream`.
    Error { code: String, message: String },
}

impl AiStreamEvent {
    pub fn content(response: impl Into<String>) -> Self {
        AiStreamEvent::Content {
            response: response.into(),
        }
    }

    pub fn error(error: &Error) -> Self {
        AiStreamEvent::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AiStreamEvent::Content { .. } => "content",
            AiStreamEvent::Error { .. } => "error",
        }
    }
}

#[derive(Serialize)]
struct ContentData<'a> {
    response: &'a str,
}

#[derive(Serialize)]
struct ErrorData<'a> {
    code: &'a str,
    message: &'a str,
}

/// Encode an event as `event: <name>\ndata: <json>\n\n`.
///
/// Pure and deterministic. Malformed upstream payloads must be turned into an
/// [`AiStreamEvent::Error`] before reaching this point; the codec itself never
/// fails for well-formed input.
pub fn encode_event(event: &AiStreamEvent) -> Bytes {
    let json = match event {
        AiStreamEvent::Content { response } => serde_json::to_string(&ContentData { response }),
        AiStreamEvent::Error { code, message } => {
            serde_json::to_string(&ErrorData { code, message })
        }
    }
    .expect("string-only payloads always serialize");

    Bytes::from(format!("event: {}\ndata: {json}\n\n", event.name()))
}
