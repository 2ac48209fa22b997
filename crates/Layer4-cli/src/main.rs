//! Loom CLI - Main entry point

mod cli;
mod interaction;

use clap::Parser;
use interaction::TerminalInteraction;
use loom_agent::{AgentDeps, RunOutcome, SessionApproval};
use loom_core::{ExtensionDiscovery, ToolRegistry};
use loom_foundation::AgentConfig;
use loom_provider::{OpenAiCompatProvider, Provider, RetryConfig};
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Loom - agentic task runner for the terminal
#[derive(Parser, Debug)]
#[command(name = "loom")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run a single request and exit (otherwise read requests line by line)
    prompt: Option<String>,

    /// OpenAI-compatible base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Model to use
    #[arg(long)]
    model: Option<String>,

    /// API key (overrides env and config)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Allow unsafe tools and skip approval prompts
    #[arg(long = "unsafe")]
    unsafe_mode: bool,

    /// Disable the planner
    #[arg(long)]
    no_plan: bool,
}

impl Args {
    /// CLI 플래그가 마지막으로 적용됨
    fn apply(&self, config: &mut AgentConfig) {
        if let Some(url) = &self.base_url {
            config.provider.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.provider.model = model.clone();
        }
        if let Some(key) = &self.api_key {
            config.provider.api_key = Some(key.clone());
        }
        if self.unsafe_mode {
            config.unsafe_mode = true;
        }
        if self.no_plan {
            config.planning_enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logging → stderr (stdout은 대화 출력용)
    let log_level = if args.debug { "loom=debug" } else { "loom=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load configuration
    let workspace = std::env::current_dir()?;
    let mut config = AgentConfig::load(&workspace)?;
    args.apply(&mut config);
    config.validate()?;

    // Provider
    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_settings(&config.provider));
    info!(
        "Using model {} at {}",
        config.provider.model, config.provider.base_url
    );
    if !provider.is_available().await {
        warn!("Model backend at {} is not reachable", config.provider.base_url);
    }

    // Tools
    let mut registry = ToolRegistry::with_builtins();
    for report in ExtensionDiscovery::from_config(&config)
        .load_into(&mut registry, config.unsafe_mode)
        .await
    {
        for name in &report.skipped_unsafe {
            warn!("Skipped unsafe tool '{}' (run with --unsafe to enable)", name);
        }
    }

    let config = Arc::new(config);
    let interaction = Arc::new(TerminalInteraction::new());
    let deps = AgentDeps::new(provider, Arc::new(registry), interaction.clone())
        .with_approval(SessionApproval::new())
        .with_retry(RetryConfig::with_max_retries(config.max_retries));

    if let Some(prompt) = args.prompt {
        let outcome = cli::run_request(&prompt, config, deps).await;
        if let RunOutcome::Failed(message) = outcome {
            anyhow::bail!(message);
        }
        return Ok(());
    }

    // Interactive: 한 줄 = 요청 하나, 승인 상태는 세션 동안 유지
    println!("Loom - type a request, or /exit to quit.");
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;
        let Some(line) = interaction.read_line().await? else {
            break;
        };
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        if request == "/exit" {
            break;
        }
        cli::run_request(request, Arc::clone(&config), deps.clone()).await;
    }

    Ok(())
}
