use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AdapterError, Result};

/// One turn of a conversation - either sent to the model or received from it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelMessage {
    Request(ModelRequest),
    Response(ModelResponse),
}

impl From<ModelRequest> for ModelMessage {
    fn from(request: ModelRequest) -> Self {
        ModelMessage::Request(request)
    }
}

impl From<ModelResponse> for ModelMessage {
    fn from(response: ModelResponse) -> Self {
        ModelMessage::Response(response)
    }
}

/// Caller-side turn
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelRequest {
    pub parts: Vec<ModelRequestPart>,
}

impl ModelRequest {
    pub fn new(parts: Vec<ModelRequestPart>) -> Self {
        Self { parts }
    }

    /// Request with a single user prompt
    pub fn user_prompt(content: &str) -> Self {
        Self::new(vec![ModelRequestPart::UserPrompt(UserPromptPart::new(content))])
    }

    /// Request with a system prompt followed by a user prompt
    pub fn with_system(system: &str, user: &str) -> Self {
        Self::new(vec![
            ModelRequestPart::SystemPrompt(SystemPromptPart::new(system)),
            ModelRequestPart::UserPrompt(UserPromptPart::new(user)),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum ModelRequestPart {
    SystemPrompt(SystemPromptPart),
    UserPrompt(UserPromptPart),
    ToolReturn(ToolReturnPart),
    RetryPrompt(RetryPromptPart),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemPromptPart {
    pub content: String,
}

impl SystemPromptPart {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPromptPart {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl UserPromptPart {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Result of a tool call, sent back to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolReturnPart {
    pub tool_name: String,
    /// Any JSON value; strings are sent verbatim, everything else is encoded
    pub content: Value,
    pub tool_call_id: String,
}

impl ToolReturnPart {
    pub fn new(tool_name: &str, content: impl Into<Value>, tool_call_id: &str) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            content: content.into(),
            tool_call_id: tool_call_id.to_string(),
        }
    }
}

/// Feedback asking the model to try again (validation failure, unknown tool, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPromptPart {
    pub content: String,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
}

impl RetryPromptPart {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            tool_name: None,
            tool_call_id: None,
        }
    }
}

/// Model-side turn, also the uniform result of a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelResponse {
    pub parts: Vec<ModelResponsePart>,
    pub timestamp: DateTime<Utc>,
    /// Model name reported by the vendor, when it sends one
    #[serde(default)]
    pub model_name: Option<String>,
}

impl ModelResponse {
    pub fn new(parts: Vec<ModelResponsePart>) -> Self {
        Self {
            parts,
            timestamp: Utc::now(),
            model_name: None,
        }
    }

    /// Concatenated text of all text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ModelResponsePart::Text(t) => Some(t.content.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_calls(&self) -> Vec<&ToolCallPart> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                ModelResponsePart::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum ModelResponsePart {
    Text(TextPart),
    ToolCall(ToolCallPart),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPart {
    pub content: String,
}

impl TextPart {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }
}

/// Tool call arguments exactly as the model produced them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolCallArgs {
    /// JSON text, possibly malformed
    Raw(String),
    Structured(Value),
}

impl From<&str> for ToolCallArgs {
    fn from(s: &str) -> Self {
        ToolCallArgs::Raw(s.to_string())
    }
}

impl From<String> for ToolCallArgs {
    fn from(s: String) -> Self {
        ToolCallArgs::Raw(s)
    }
}

impl From<Value> for ToolCallArgs {
    fn from(v: Value) -> Self {
        ToolCallArgs::Structured(v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallPart {
    pub tool_name: String,
    pub args: ToolCallArgs,
    pub tool_call_id: String,
}

impl ToolCallPart {
    pub fn new(tool_name: &str, args: impl Into<ToolCallArgs>, tool_call_id: &str) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            args: args.into(),
            tool_call_id: tool_call_id.to_string(),
        }
    }

    /// Parse arguments into a JSON object.
    ///
    /// Raw arguments are parsed here and nowhere else, so a stream that delivered
    /// broken JSON only fails once somebody actually asks for the values.
    /// Empty raw arguments count as an empty object.
    pub fn args_as_object(&self) -> Result<Map<String, Value>> {
        let value = match &self.args {
            ToolCallArgs::Raw(raw) if raw.trim().is_empty() => return Ok(Map::new()),
            ToolCallArgs::Raw(raw) => {
                serde_json::from_str::<Value>(raw).map_err(|source| self.malformed(source))?
            }
            ToolCallArgs::Structured(v) => v.clone(),
        };

        match value {
            Value::Object(map) => Ok(map),
            other => Err(self.malformed(serde::de::Error::custom(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))),
        }
    }

    fn malformed(&self, source: serde_json::Error) -> AdapterError {
        AdapterError::MalformedToolCall {
            tool_name: self.tool_name.clone(),
            tool_call_id: self.tool_call_id.clone(),
            source,
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Token usage info
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub request_tokens: u64,
    pub response_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(request_tokens: u64, response_tokens: u64, total_tokens: u64) -> Self {
        Self {
            request_tokens,
            response_tokens,
            total_tokens,
        }
    }
}

/// Tool the model may call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema for tool parameters, passed through untouched
    pub parameters_json_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: &str, description: &str, parameters_json_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters_json_schema,
        }
    }
}

/// Tools and result constraints for one request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRequestParameters {
    #[serde(default)]
    pub function_tools: Vec<ToolDefinition>,
    /// Tools whose arguments carry the structured final answer
    #[serde(default)]
    pub result_tools: Vec<ToolDefinition>,
    #[serde(default = "default_allow_text_result")]
    pub allow_text_result: bool,
}

fn default_allow_text_result() -> bool {
    true
}

impl Default for ModelRequestParameters {
    fn default() -> Self {
        Self {
            function_tools: Vec::new(),
            result_tools: Vec::new(),
            allow_text_result: default_allow_text_result(),
        }
    }
}

/// Optional sampling settings; unset fields are left to vendor defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelSettings {
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_args_as_object_raw() {
        let call = ToolCallPart::new("weather", r#"{"city":"Paris"}"#, "call_1");
        let args = call.args_as_object().unwrap();
        assert_eq!(args["city"], "Paris");
    }

    #[test]
    fn test_args_as_object_structured() {
        let call = ToolCallPart::new("weather", json!({"city": "Paris"}), "call_1");
        assert_eq!(call.args_as_object().unwrap()["city"], "Paris");
    }

    #[test]
    fn test_args_as_object_empty_raw() {
        let call = ToolCallPart::new("ping", "", "call_1");
        assert!(call.args_as_object().unwrap().is_empty());
    }

    #[test]
    fn test_args_as_object_malformed() {
        let call = ToolCallPart::new("weather", r#"{"city": "Par"#, "call_9");
        match call.args_as_object() {
            Err(AdapterError::MalformedToolCall {
                tool_name,
                tool_call_id,
                ..
            }) => {
                assert_eq!(tool_name, "weather");
                assert_eq!(tool_call_id, "call_9");
            }
            other => panic!("Expected MalformedToolCall, got {:?}", other),
        }
    }

    #[test]
    fn test_args_as_object_not_an_object() {
        let call = ToolCallPart::new("weather", "[1, 2]", "call_1");
        assert!(matches!(
            call.args_as_object(),
            Err(AdapterError::MalformedToolCall { .. })
        ));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let resp = ModelResponse::new(vec![
            ModelResponsePart::Text(TextPart::new("Hello, ")),
            ModelResponsePart::ToolCall(ToolCallPart::new("noop", "{}", "call_1")),
            ModelResponsePart::Text(TextPart::new("world")),
        ]);
        assert_eq!(resp.text(), "Hello, world");
        assert_eq!(resp.tool_calls().len(), 1);
    }
}
