//! buildx-step - docker buildx with a persistent layer cache
//!
//! CLI entry point that dispatches to subcommands.

use buildx_step::cli::args::{ConfigAction, ConfigArgs};
use buildx_step::cli::{Cli, Commands};
use buildx_step::config::{Config, ConfigManager};
use buildx_step::error::StepResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> StepResult<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::locate(cli.config.clone());
    // `config init` must be able to replace a broken settings file
    let rewriting = matches!(
        &cli.command,
        Commands::Config(ConfigArgs {
            action: Some(ConfigAction::Init { .. })
        })
    );
    let config = if rewriting {
        Config::default()
    } else {
        config_manager.load().await?
    };

    init_logging(&config, cli.verbose);
    debug!("Using settings from {}", config_manager.path().display());

    match cli.command {
        Commands::Run(args) => buildx_step::cli::commands::run(args, &config, cli.verbose).await,
        Commands::Cache(args) => buildx_step::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            buildx_step::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// RUST_LOG wins over the verbose input
fn init_logging(config: &Config, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("buildx_step=debug")
        } else {
            EnvFilter::new("buildx_step=info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time();

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
