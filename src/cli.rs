use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "bash-qwen", about = "Ask a Qwen application for code and run it after review", version)]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
pub struct Cli {
    /// Handle a single request and exit instead of starting the interactive loop.
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// DashScope application id (overrides DASHSCOPE_APP_ID).
    #[arg(long = "app-id")]
    pub app_id: Option<String>,

    /// API key (overrides DASHSCOPE_API_KEY).
    #[arg(long = "api-key")]
    pub api_key: Option<String>,

    /// Base URL of the DashScope API.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Execution timeout in seconds for each block.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Fix attempts allowed per request.
    #[arg(long = "max-retries")]
    pub max_retries: Option<usize>,

    /// Python interpreter used for python blocks.
    #[arg(long)]
    pub python: Option<String>,

    /// Shell used for sh blocks (auto|sh|bash|zsh|powershell|cmd).
    #[arg(long = "shell")]
    pub shell: Option<String>,

    /// Read settings from this file instead of ~/.config/bash_qwen/.bqrc.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Render prose replies as Markdown.
    #[arg(long)]
    pub md: bool,
    /// Print prose replies as plain text.
    #[arg(long = "no-md")]
    pub no_md: bool,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
