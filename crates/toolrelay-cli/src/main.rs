//! toolrelay - ask questions that a model answers with the help of tools
//!
//! Registers the built-in clock and weather providers (plus any remote MCP
//! servers from the config file), then runs each question through the
//! orchestrator and streams the answer to stdout.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use toolrelay_core::builtin::{ClockProvider, WeatherProvider};
use toolrelay_core::{
    ConsoleLogger, ConversationOrchestrator, FileConfig, GenaiBackend, ProviderEndpoint,
    RegistryHandle, RelayConfig, SharedLogger, ToolRegistry,
};

const SAMPLE_QUESTIONS: &[&str] = &[
    "What's the weather like in Tokyo today?",
    "How is the weather in Aomori and in Chiba?",
    "What day of the week is it today?",
];

#[derive(Parser)]
#[command(name = "toolrelay")]
#[command(about = "Answer questions with a model that can call tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/toolrelay/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model identifier, overriding the config file
    #[arg(short, long)]
    model: Option<String>,

    /// Provider endpoint, overriding the config file
    #[arg(long)]
    api_base: Option<String>,

    /// Log level (debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Save the file config with these flags applied, then exit
    #[arg(long)]
    write_config: bool,

    /// Questions to ask; a few sample questions run when none are given
    #[arg(value_name = "QUESTION")]
    questions: Vec<String>,
}

impl Cli {
    fn apply_to(&self, config: &mut RelayConfig) {
        if let Some(model) = &self.model {
            config.backend.model = model.clone();
        }
        if let Some(base) = &self.api_base {
            config.backend.api_base = Some(base.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}

/// Persist `config` with the flag overrides. Environment values are left out
/// so API keys never land in the file.
fn write_config(file: &FileConfig, mut config: RelayConfig, cli: &Cli) -> Result<RelayConfig> {
    cli.apply_to(&mut config);
    config.validate()?;
    file.save(&config)
        .with_context(|| format!("writing {}", file.path().display()))?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let file = cli.config.clone().map(FileConfig::new).unwrap_or_else(FileConfig::user);
    let loaded = file
        .load()
        .with_context(|| format!("loading {}", file.path().display()))?;

    if cli.write_config {
        let written = write_config(&file, loaded, &cli)?;
        println!("Wrote {} (model {})", file.path().display(), written.backend.model);
        return Ok(());
    }

    // Flags win over the environment, which wins over the file
    let mut config = loaded.apply_env();
    cli.apply_to(&mut config);
    config.validate()?;

    let logger: SharedLogger = Arc::new(ConsoleLogger::new().with_min_level(config.log_level()?));

    let mut endpoints = vec![
        ProviderEndpoint::in_process(ClockProvider::new()),
        ProviderEndpoint::in_process(WeatherProvider::demo()),
    ];
    endpoints.extend(config.remote_servers()?.into_iter().map(ProviderEndpoint::Remote));

    let registry = ToolRegistry::new(logger.clone())
        .register(endpoints)
        .await
        .context("registering tool providers")?;

    let backend = Arc::new(GenaiBackend::from_config(config.backend_config(), logger.clone()));
    let orchestrator =
        ConversationOrchestrator::new(backend, config.orchestrator_settings(), logger.clone());

    let questions: Vec<String> = if cli.questions.is_empty() {
        SAMPLE_QUESTIONS.iter().map(|q| q.to_string()).collect()
    } else {
        cli.questions.clone()
    };

    let failures = ask_all(&orchestrator, &registry, &questions).await;

    registry.close().await.context("closing tool providers")?;

    if failures > 0 {
        anyhow::bail!("{} of {} questions failed", failures, questions.len());
    }
    Ok(())
}

/// Ask each question in turn. A failed question is reported and skipped.
async fn ask_all(
    orchestrator: &ConversationOrchestrator,
    registry: &RegistryHandle,
    questions: &[String],
) -> usize {
    let mut failures = 0;
    for question in questions {
        println!("[question] {question}");
        print!("[answer] ");
        let _ = std::io::stdout().flush();

        let result = orchestrator
            .query(registry, question, |fragment| {
                print!("{fragment}");
                let _ = std::io::stdout().flush();
            })
            .await;

        println!();
        if let Err(e) = result {
            eprintln!("[error] {e}");
            failures += 1;
        }
        println!();
    }
    failures
}
