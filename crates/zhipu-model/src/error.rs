use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors surfaced to callers of the adapter. Nothing is retried or papered over.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    /// The call succeeded at the transport level but carried no choices
    #[error("provider returned a response with no choices")]
    EmptyResponse,

    #[error("tool call `{tool_name}` ({tool_call_id}) has malformed arguments: {source}")]
    MalformedToolCall {
        tool_name: String,
        tool_call_id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to the vendor endpoint
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode vendor payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSE event exceeded {limit}B")]
    EventTooLarge { limit: usize },

    #[error("background worker failed: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for ProviderError {
    fn from(e: tokio::task::JoinError) -> Self {
        ProviderError::Worker(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AdapterError {
    fn from(e: tokio::task::JoinError) -> Self {
        AdapterError::Provider(e.into())
    }
}
