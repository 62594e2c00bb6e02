//! Operator CLI for trying a rule script against a fixture change set.
//!
//! Not part of the sandboxed engine's own capability surface — it just
//! assembles the same `PullRequestPatches` a real caller would provide and
//! drives `run_rule` once, printing the resulting record as JSON.

use clap::{Parser, Subcommand};
use fensak_engine::config::{EngineConfig, LogMode};
use fensak_engine::error::EngineError;
use fensak_engine::patch::{ChangeSetMetadata, Patch};
use fensak_engine::sandbox;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fensak-engine")]
#[command(about = "Evaluate a sandboxed rule script against a locally-supplied change set")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a rule script against a patches/metadata fixture pair.
    Run {
        #[arg(long, help = "Path to the rule script source")]
        rule: PathBuf,

        #[arg(long, help = "Path to a JSON file holding the patch list")]
        patches: PathBuf,

        #[arg(long, help = "Path to a JSON file holding the change-set metadata")]
        metadata: PathBuf,

        #[arg(long, value_enum, default_value = "drop", help = "How console.* calls are handled")]
        log_mode: CliLogMode,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliLogMode {
    Drop,
    Console,
    Capture,
}

impl From<CliLogMode> for LogMode {
    fn from(m: CliLogMode) -> Self {
        match m {
            CliLogMode::Drop => LogMode::Drop,
            CliLogMode::Console => LogMode::Console,
            CliLogMode::Capture => LogMode::Capture,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), EngineError> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            rule,
            patches,
            metadata,
            log_mode,
        } => run_rule_command(rule, patches, metadata, log_mode.into()).await,
    }
}

async fn run_rule_command(
    rule_path: PathBuf,
    patches_path: PathBuf,
    metadata_path: PathBuf,
    log_mode: LogMode,
) -> Result<(), EngineError> {
    let program_text = std::fs::read_to_string(&rule_path)?;
    let patches_text = std::fs::read_to_string(&patches_path)?;
    let metadata_text = std::fs::read_to_string(&metadata_path)?;

    let patch_list: Vec<Patch> =
        serde_json::from_str(&patches_text).map_err(|e| EngineError::EngineInternalError(format!("invalid patches fixture: {e}")))?;
    let metadata: ChangeSetMetadata =
        serde_json::from_str(&metadata_text).map_err(|e| EngineError::EngineInternalError(format!("invalid metadata fixture: {e}")))?;

    let config = EngineConfig::from_env();
    let record = sandbox::run_rule(&program_text, &patch_list, &metadata, config, log_mode).await?;

    let output = serde_json::to_string_pretty(&record).map_err(|e| EngineError::EngineInternalError(e.to_string()))?;
    println!("{output}");
    Ok(())
}
