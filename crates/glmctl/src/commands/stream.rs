use super::{
    build_history, build_model, build_params, build_settings, print_tool_calls, print_usage,
};
use crate::cli::PromptArgs;
use crate::config::Config;
use anyhow::{Context, Result};
use std::io::Write;
use std::time::Duration;
use tracing::{info, warn};
use zhipu_model::{Model, StreamEvent};

pub async fn execute(args: PromptArgs, timeout_secs: Option<u64>, config: &Config) -> Result<()> {
    let model = build_model(config)?;
    let history = build_history(&args);
    let settings = build_settings(config, &args);
    let params = build_params(&args)?;

    info!(model = %model.model_name(), ?timeout_secs, "Opening stream");
    let mut stream = model
        .request_stream(&history, Some(&settings), &params)
        .await
        .context("Failed to open stream")?;

    let deadline = async {
        match timeout_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            event = stream.next_event() => match event {
                Some(Ok(event)) => report(&event, &mut stdout)?,
                Some(Err(e)) => return Err(e).context("Stream failed"),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, closing stream");
                stream.close();
                break;
            }
            _ = &mut deadline => {
                warn!(?timeout_secs, "Timed out, closing stream");
                stream.close();
                break;
            }
        }
    }
    writeln!(stdout)?;

    let response = stream.get();
    print_tool_calls(&response).context("Model returned malformed tool arguments")?;
    if let Some(usage) = stream.usage_snapshot() {
        print_usage(&usage);
    }
    Ok(())
}

/// Text goes to stdout as it arrives; tool-call progress goes to stderr
fn report(event: &StreamEvent, out: &mut impl Write) -> Result<()> {
    match event {
        StreamEvent::TextDelta { content, .. } => {
            write!(out, "{}", content)?;
            out.flush()?;
        }
        StreamEvent::ToolCallDelta {
            part_index,
            tool_name,
            args_delta,
            ..
        } => {
            if let Some(name) = tool_name {
                eprintln!("[part {}] calling {}", part_index, name);
            }
            if let Some(delta) = args_delta {
                eprintln!("[part {}] +{} bytes of arguments", part_index, delta.len());
            }
        }
    }
    Ok(())
}
