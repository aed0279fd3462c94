//! Command-line entry point.
//!
//! # Startup sequence
//!
//! 1. Parse arguments and load `.env` from the working directory.
//! 2. Initialise logging (`info`, or `debug` with `--verbose`; `RUST_LOG` wins).
//! 3. Load [`AppConfig`] and overlay credentials from the environment.
//! 4. Build the [`PipelineOrchestrator`] for the project root.
//! 5. Run the requested command, print its report and exit with its code.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use wotd_reel::{
    config::{AppConfig, AppPaths},
    pipeline::{PipelineOrchestrator, RunReport},
};

/// Word-of-the-day reel pipeline.
#[derive(Parser)]
#[command(name = "wotd-reel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Produce, approve and distribute the daily word-of-the-day video")]
struct Cli {
    /// Project root holding data_bridge.json, temp/, exports/ …
    #[arg(short, long, env = "WOTD_ROOT")]
    root: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(short, long, env = "WOTD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire, generate, render and merge today's video
    Produce {
        /// Reuse the persisted content package and narration
        #[arg(long)]
        reuse_cached: bool,
    },

    /// Review the latest export, then distribute and archive it
    Approve,

    /// Show the settings path; with --init, write defaults if it is missing
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let code = match run(cli).await {
        Ok(Some(report)) => {
            println!("{report}");
            report.exit_code()
        }
        Ok(None) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            2
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<Option<RunReport>> {
    let settings_file = cli
        .config
        .clone()
        .unwrap_or_else(AppPaths::default_settings_file);

    if let Commands::Config { init } = cli.command {
        if init && !settings_file.exists() {
            AppConfig::default()
                .save_to(&settings_file)
                .with_context(|| format!("writing {}", settings_file.display()))?;
            println!("wrote defaults to {}", settings_file.display());
        } else {
            println!("{}", settings_file.display());
        }
        return Ok(None);
    }

    let mut config = AppConfig::load_from(&settings_file).unwrap_or_else(|e| {
        log::warn!("Failed to load {} ({e}); using defaults", settings_file.display());
        AppConfig::default()
    });
    config.apply_env(|key| std::env::var(key).ok());

    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("resolving the project root")?,
    };
    log::info!("wotd-reel: project root {}", root.display());
    let orchestrator = PipelineOrchestrator::from_config(&config, AppPaths::new(&root));

    let report = match cli.command {
        Commands::Produce { reuse_cached } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("wotd-reel: interrupt received, stopping the render");
                    on_interrupt.cancel();
                }
            });
            orchestrator.produce(reuse_cached, &cancel).await
        }
        Commands::Approve => orchestrator.approve().await,
        Commands::Config { .. } => return Ok(None),
    };

    Ok(Some(report))
}
