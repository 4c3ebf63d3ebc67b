mod cli;

use std::io;

use anyhow::Result;
use bash_qwen::{
    config::Config,
    console::{Console, LineEditor, PipedConsole},
    execution::Executor,
    handlers::Session,
    llm::LlmClient,
    printer::Printer,
};
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: u8) {
    // RUST_LOG wins; otherwise -v/-vv raise the default warn level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    // Load config, then let CLI flags override it
    let mut cfg = Config::load(args.config.as_deref());
    if let Some(v) = &args.app_id { cfg.set("DASHSCOPE_APP_ID", v.as_str()); }
    if let Some(v) = &args.api_key { cfg.set("DASHSCOPE_API_KEY", v.as_str()); }
    if let Some(v) = &args.base_url { cfg.set("API_BASE_URL", v.as_str()); }
    if let Some(v) = args.timeout { cfg.set("EXEC_TIMEOUT", v.to_string()); }
    if let Some(v) = args.max_retries { cfg.set("MAX_RETRIES", v.to_string()); }
    if let Some(v) = &args.python { cfg.set("PYTHON_BIN", v.as_str()); }
    if let Some(v) = &args.shell { cfg.set("SHELL_NAME", v.as_str()); }
    let md = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("PRETTIFY_MARKDOWN")
    };

    let client = LlmClient::from_config(&cfg)?;
    let executor = Executor::from_config(&cfg);
    let printer = Printer::new(md);
    let max_retries = cfg.max_retries();
    tracing::info!(config = %cfg.config_path.display(), max_retries, "configuration loaded");

    if io::stdin().is_terminal() {
        let console = LineEditor::new()?;
        start(Session::new(client, console, executor, printer, max_retries), args.prompt).await
    } else {
        let console = PipedConsole::new(io::stdin().lock());
        start(Session::new(client, console, executor, printer, max_retries), args.prompt).await
    }
}

async fn start<C: Console>(mut session: Session<LlmClient, C>, prompt: Option<String>) -> Result<()> {
    match prompt {
        Some(p) if !p.trim().is_empty() => {
            let outcome = session.handle_request(p.trim()).await?;
            tracing::debug!(?outcome, "single request finished");
            Ok(())
        }
        _ => session.run().await,
    }
}
