pub mod assemble;
pub mod client;
pub mod parts;
pub mod provider;
pub mod sse;
pub mod streaming;
pub mod translate;
pub mod types;
pub mod wire;
pub mod zhipu;

pub use client::{ChatClient, ChunkIter, HttpChatClient, DEFAULT_BASE_URL};
pub use parts::{PartsManager, Slot, StreamEvent};
pub use provider::Model;
pub use streaming::{StreamState, StreamedResponse};
pub use types::{
    ModelMessage, ModelRequest, ModelRequestParameters, ModelRequestPart, ModelResponse,
    ModelResponsePart, ModelSettings, RetryPromptPart, SystemPromptPart, TextPart, ToolCallArgs,
    ToolCallPart, ToolDefinition, ToolReturnPart, Usage, UserPromptPart,
};
pub use zhipu::ZhipuModel;
