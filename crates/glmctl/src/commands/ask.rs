use super::{
    build_history, build_model, build_params, build_settings, print_tool_calls, print_usage,
};
use crate::cli::PromptArgs;
use crate::config::Config;
use anyhow::{Context, Result};
use tracing::info;
use zhipu_model::Model;

pub async fn execute(args: PromptArgs, config: &Config) -> Result<()> {
    let model = build_model(config)?;
    let history = build_history(&args);
    let settings = build_settings(config, &args);
    let params = build_params(&args)?;

    info!(
        model = %model.model_name(),
        structured = !params.allow_text_result,
        "Sending request"
    );
    let (response, usage) = model
        .request(&history, Some(&settings), &params)
        .await
        .context("Chat request failed")?;

    let text = response.text();
    if !text.is_empty() {
        println!("{}", text);
    }
    print_tool_calls(&response).context("Model returned malformed tool arguments")?;
    print_usage(&usage);
    Ok(())
}
