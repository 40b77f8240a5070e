pub mod error;
pub mod llm;

pub use error::{AdapterError, ProviderError, Result};
pub use llm::{
    ChatClient, HttpChatClient, Model, ModelMessage, ModelRequest, ModelRequestParameters,
    ModelRequestPart, ModelResponse, ModelResponsePart, ModelSettings, RetryPromptPart, Slot,
    StreamEvent, StreamState, StreamedResponse, SystemPromptPart, TextPart, ToolCallArgs,
    ToolCallPart, ToolDefinition, ToolReturnPart, Usage, UserPromptPart, ZhipuModel,
};

/// Initialize structured JSON logging on stderr
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
