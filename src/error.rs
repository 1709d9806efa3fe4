use thiserror::Error;

/// Errors that can occur when using the ai-warp provider layer.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend returned zero choices or a null/absent message body.
    /// Recoverable and caller-visible, not a crash.
    #[error("{provider} didn't return any content")]
    NoContent { provider: &'static str },

    /// The configuration selects no recognized backend. Fatal at startup.
    #[error("Unknown AI Provider")]
    UnknownProvider,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Inference error: {0}")]
    Engine(String),
}

impl Error {
    /// Stable machine-readable code, used for in-band `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NoContent { .. } => "NO_CONTENT",
            Error::UnknownProvider => "UNKNOWN_AI_PROVIDER",
            Error::Http(_) => "PROVIDER_REQUEST_FAILED",
            Error::Serialization(_) => "MALFORMED_PAYLOAD",
            Error::Streaming(_) => "STREAMING_ERROR",
            Error::Config(_) => "INVALID_CONFIG",
            Error::Engine(_) => "INFERENCE_FAILED",
        }
    }

    pub fn no_content(provider: &'static str) -> Self {
        Error::NoContent { provider }
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Error::Engine(message.into())
    }
}
