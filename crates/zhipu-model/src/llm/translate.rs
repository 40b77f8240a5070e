//! Conversation → vendor payload translation.

use serde::Serialize;
use serde_json::Value;
use std::io;

use super::types::*;
use super::wire::{
    function_type, ChatCompletionRequest, ChatFunctionCall, ChatFunctionSpec, ChatMessage,
    ChatTool, ChatToolCall,
};

/// Build the full request body for one call
pub fn build_request(
    model: &str,
    messages: &[ModelMessage],
    settings: Option<&ModelSettings>,
    params: &ModelRequestParameters,
    stream: bool,
) -> ChatCompletionRequest {
    let tools = map_tools(params);

    // Only a hint: the vendor may still answer in plain text
    let needs_result_tool =
        !tools.is_empty() && !params.allow_text_result && !params.result_tools.is_empty();
    let tool_choice = if needs_result_tool {
        Some("auto".to_string())
    } else {
        None
    };

    ChatCompletionRequest {
        model: model.to_string(),
        messages: map_messages(messages),
        max_tokens: settings.and_then(|s| s.max_tokens),
        temperature: settings.and_then(|s| s.temperature),
        top_p: settings.and_then(|s| s.top_p),
        tools: if tools.is_empty() { None } else { Some(tools) },
        tool_choice,
        stream,
    }
}

/// Flatten the conversation into role-tagged vendor messages
pub fn map_messages(messages: &[ModelMessage]) -> Vec<ChatMessage> {
    let mut api_msgs = Vec::new();

    for msg in messages {
        match msg {
            ModelMessage::Request(request) => {
                for part in &request.parts {
                    if let Some(m) = map_request_part(part) {
                        api_msgs.push(m);
                    }
                }
            }
            ModelMessage::Response(response) => {
                if let Some(m) = map_response(response) {
                    api_msgs.push(m);
                }
            }
        }
    }

    api_msgs
}

fn map_request_part(part: &ModelRequestPart) -> Option<ChatMessage> {
    match part {
        ModelRequestPart::SystemPrompt(p) => Some(ChatMessage::System {
            content: p.content.clone(),
        }),
        ModelRequestPart::UserPrompt(p) => Some(ChatMessage::User {
            content: p.content.clone(),
        }),
        ModelRequestPart::ToolReturn(p) => Some(ChatMessage::Tool {
            tool_call_id: p.tool_call_id.clone(),
            content: match &p.content {
                Value::String(s) => s.clone(),
                other => dump_json(other),
            },
        }),
        // No retry role on the vendor side
        ModelRequestPart::RetryPrompt(p) if p.content.is_empty() => None,
        ModelRequestPart::RetryPrompt(p) => Some(ChatMessage::User {
            content: p.content.clone(),
        }),
    }
}

/// Collapse one response turn into a single assistant message
fn map_response(response: &ModelResponse) -> Option<ChatMessage> {
    let mut text_content = String::new();
    let mut tool_calls = Vec::new();

    for part in &response.parts {
        match part {
            ModelResponsePart::Text(t) => text_content.push_str(&t.content),
            ModelResponsePart::ToolCall(tc) => tool_calls.push(ChatToolCall {
                id: tc.tool_call_id.clone(),
                call_type: function_type(),
                function: ChatFunctionCall {
                    name: tc.tool_name.clone(),
                    arguments: Value::String(encode_args(&tc.args)),
                },
            }),
        }
    }

    if text_content.is_empty() && tool_calls.is_empty() {
        return None;
    }

    Some(ChatMessage::Assistant {
        content: (!text_content.is_empty()).then_some(text_content),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    })
}

fn encode_args(args: &ToolCallArgs) -> String {
    match args {
        ToolCallArgs::Raw(s) => s.clone(),
        ToolCallArgs::Structured(Value::String(s)) => s.clone(),
        ToolCallArgs::Structured(v) => dump_json(v),
    }
}

/// Function tools followed by result tools
pub fn map_tools(params: &ModelRequestParameters) -> Vec<ChatTool> {
    params
        .function_tools
        .iter()
        .chain(params.result_tools.iter())
        .map(map_tool_definition)
        .collect()
}

/// Convert a tool definition to the vendor function-calling format
pub fn map_tool_definition(tool: &ToolDefinition) -> ChatTool {
    // GLM rejects tools without a description
    let description = match tool.description.as_deref() {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => tool.name.clone(),
    };

    ChatTool {
        tool_type: function_type(),
        function: ChatFunctionSpec {
            name: tool.name.clone(),
            description,
            parameters: tool.parameters_json_schema.clone(),
        },
    }
}

/// Encode JSON with `", "` and `": "` separators, the format the vendor SDK sends
pub(crate) fn dump_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    if value.serialize(&mut ser).is_err() {
        return value.to_string();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}
