//! Vendor response → uniform `(ModelResponse, Usage)`.

use serde_json::Value;
use uuid::Uuid;

use super::types::*;
use super::wire::{ChatCompletion, ChatToolCall, CompletionUsage};
use crate::error::{AdapterError, Result};

/// Map a full (non-streaming) completion.
///
/// Zero choices is reported as `EmptyResponse`; no placeholder text is invented.
pub fn process_response(completion: ChatCompletion) -> Result<(ModelResponse, Usage)> {
    let usage = map_usage(completion.usage.as_ref());

    let Some(choice) = completion.choices.into_iter().next() else {
        return Err(AdapterError::EmptyResponse);
    };

    let message = choice.message;
    let mut parts = Vec::new();

    if let Some(text) = message.content {
        if !text.is_empty() {
            parts.push(ModelResponsePart::Text(TextPart { content: text }));
        }
    }

    for tc in message.tool_calls.unwrap_or_default() {
        parts.push(ModelResponsePart::ToolCall(map_tool_call(tc)));
    }

    let mut response = ModelResponse::new(parts);
    response.model_name = completion.model;

    Ok((response, usage))
}

fn map_tool_call(tc: ChatToolCall) -> ToolCallPart {
    // Arguments stay as received; parsing is the caller's business
    let args = match tc.function.arguments {
        Value::String(s) => ToolCallArgs::Raw(s),
        other => ToolCallArgs::Structured(other),
    };
    ToolCallPart {
        tool_name: tc.function.name,
        args,
        tool_call_id: if tc.id.is_empty() {
            generate_tool_call_id()
        } else {
            tc.id
        },
    }
}

/// Vendor usage to uniform usage; anything missing counts as zero
pub fn map_usage(usage: Option<&CompletionUsage>) -> Usage {
    usage
        .map(|u| Usage {
            request_tokens: u.prompt_tokens.unwrap_or(0),
            response_tokens: u.completion_tokens.unwrap_or(0),
            total_tokens: u.total_tokens.unwrap_or(0),
        })
        .unwrap_or_default()
}

/// Id for a tool call the vendor never labelled
pub(crate) fn generate_tool_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}
