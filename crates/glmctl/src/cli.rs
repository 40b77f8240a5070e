use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "glmctl")]
#[command(about = "Zhipu GLM chat client", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Prompt and sampling flags shared by `ask` and `stream`
#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    /// User prompt
    pub prompt: String,

    /// System prompt sent before the user prompt
    #[arg(long)]
    pub system: Option<String>,

    /// JSON schema file; the answer is returned as structured `final_result` arguments
    #[arg(long)]
    pub result_schema: Option<PathBuf>,

    /// Maximum tokens to generate (overrides config)
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (overrides config)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling (overrides config)
    #[arg(long)]
    pub top_p: Option<f32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new config file
    Init {
        /// Path for new config file
        #[arg(default_value = "glmctl.toml")]
        path: PathBuf,
    },
    /// Send one request and print the complete response
    Ask {
        #[command(flatten)]
        prompt: PromptArgs,
    },
    /// Stream a response, printing deltas as they arrive
    Stream {
        #[command(flatten)]
        prompt: PromptArgs,

        /// Close the stream after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}
