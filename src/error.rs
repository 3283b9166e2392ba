use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistError>;

#[derive(Error, Debug)]
pub enum AssistError {
    /// No usable provider credential; the network is never attempted.
    #[error("Groq API key is missing or a placeholder")]
    ConfigurationMissing,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A newer call with the same debounce key replaced this one before it ran.
    #[error("Request superseded by a newer call for the same key")]
    Superseded,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssistError {
    /// Whether the service should fall back to local synthesis for this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AssistError::Superseded)
    }
}
