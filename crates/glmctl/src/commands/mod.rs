pub mod ask;
pub mod init;
pub mod stream;

use crate::cli::PromptArgs;
use crate::config::Config;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use zhipu_model::{
    ModelMessage, ModelRequest, ModelRequestParameters, ModelResponse, ModelSettings,
    ToolDefinition, Usage, ZhipuModel,
};

/// Name of the result tool declared for `--result-schema`
pub const RESULT_TOOL: &str = "final_result";

pub fn build_model(config: &Config) -> Result<ZhipuModel> {
    let api_key = config
        .provider
        .resolve_api_key(|key| std::env::var(key).ok())?;
    Ok(ZhipuModel::with_endpoint(
        &config.provider.model,
        &api_key,
        &config.provider.base_url,
        Duration::from_secs(config.provider.timeout_secs),
    ))
}

pub fn build_history(args: &PromptArgs) -> Vec<ModelMessage> {
    let request = match &args.system {
        Some(system) => ModelRequest::with_system(system, &args.prompt),
        None => ModelRequest::user_prompt(&args.prompt),
    };
    vec![request.into()]
}

pub fn build_settings(config: &Config, args: &PromptArgs) -> ModelSettings {
    config.settings(args.max_tokens, args.temperature, args.top_p)
}

/// Plain text when no schema is given, otherwise a single required result tool
pub fn build_params(args: &PromptArgs) -> Result<ModelRequestParameters> {
    match &args.result_schema {
        Some(path) => Ok(ModelRequestParameters {
            function_tools: Vec::new(),
            result_tools: vec![result_tool(path)?],
            allow_text_result: false,
        }),
        None => Ok(ModelRequestParameters::default()),
    }
}

fn result_tool(path: &Path) -> Result<ToolDefinition> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read result schema: {:?}", path))?;
    let schema: serde_json::Value =
        serde_json::from_str(&content).context("Failed to parse result schema JSON")?;
    if !schema.is_object() {
        anyhow::bail!("Result schema must be a JSON object");
    }
    Ok(ToolDefinition::new(
        RESULT_TOOL,
        "The final structured answer",
        schema,
    ))
}

/// Print every tool call with its arguments parsed into a JSON object
pub fn print_tool_calls(response: &ModelResponse) -> Result<()> {
    for call in response.tool_calls() {
        let args = call.args_as_object()?;
        println!(
            "{} ({}): {}",
            call.tool_name,
            call.tool_call_id,
            serde_json::to_string_pretty(&serde_json::Value::Object(args))?
        );
    }
    Ok(())
}

pub fn print_usage(usage: &Usage) {
    eprintln!(
        "usage: request={} response={} total={}",
        usage.request_tokens, usage.response_tokens, usage.total_tokens
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn prompt_args() -> PromptArgs {
        PromptArgs {
            prompt: "Tell me about Paris.".to_string(),
            system: None,
            result_schema: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
        }
    }

    #[test]
    fn test_history_with_system() {
        let mut args = prompt_args();
        args.system = Some("You are helpful.".to_string());
        let history = build_history(&args);
        assert_eq!(
            history,
            vec![ModelMessage::from(ModelRequest::with_system(
                "You are helpful.",
                "Tell me about Paris."
            ))]
        );
    }

    #[test]
    fn test_params_without_schema_allow_text() {
        let params = build_params(&prompt_args()).unwrap();
        assert!(params.allow_text_result);
        assert!(params.result_tools.is_empty());
    }

    #[test]
    fn test_params_with_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type": "object", "properties": {{"city": {{"type": "string"}}}}}}"#
        )
        .unwrap();

        let mut args = prompt_args();
        args.result_schema = Some(file.path().to_path_buf());
        let params = build_params(&args).unwrap();

        assert!(!params.allow_text_result);
        assert_eq!(params.result_tools.len(), 1);
        assert_eq!(params.result_tools[0].name, RESULT_TOOL);
        assert_eq!(
            params.result_tools[0].parameters_json_schema["properties"]["city"]["type"],
            "string"
        );
    }

    #[test]
    fn test_params_rejects_non_object_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();

        let mut args = prompt_args();
        args.result_schema = Some(file.path().to_path_buf());
        assert!(build_params(&args).is_err());
    }

    #[test]
    fn test_build_model_inline_key() {
        let mut config = Config::default();
        config.provider.api_key = "inline".to_string();
        let model = build_model(&config).unwrap();
        assert_eq!(zhipu_model::Model::model_name(&model), "glm-4-flash");
    }
}
