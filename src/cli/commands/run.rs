//! Run command - build the image with the persistent layer cache

use crate::builder::{BuildOrchestrator, OrchestratorSettings};
use crate::cache::{ArchiveBackend, CacheBackend, CacheKeys, KeyContext};
use crate::cli::args::RunArgs;
use crate::config::Config;
use crate::error::StepResult;
use crate::process::TokioRunner;
use crate::step::BuildConfiguration;
use console::style;
use std::sync::Arc;
use tracing::debug;

/// Execute the run command
pub async fn execute(args: RunArgs, config: &Config, verbose: bool) -> StepResult<()> {
    let build = BuildConfiguration::from_inputs(&args.to_inputs(verbose))?;
    println!("{}", build);
    println!();

    let location = config.cache.location()?;
    let ctx = KeyContext::detect(args.branch.as_deref(), args.commit.as_deref());
    let keys = CacheKeys::new(&config.cache.key_prefix, build.cache_tag(), &ctx);
    debug!("Cache key: {}", keys);

    let backend = ArchiveBackend::new(config.cache.store_dir(), config.cache.compression_level);
    debug!(
        "Using {} cache backend at {}",
        backend.backend_name(),
        backend.store_dir().display()
    );

    let orchestrator = BuildOrchestrator::new(
        Arc::new(TokioRunner::new()),
        Arc::new(backend),
        OrchestratorSettings {
            program: config.builder.program.clone(),
            location,
        },
    );

    let report = orchestrator.run(&build, &keys).await?;

    println!();
    println!(
        "{} Built {}",
        style("✓").green(),
        style(build.tags.join(", ")).cyan()
    );
    if let Some(key) = &report.restored_key {
        println!("  Cache restored from: {}", key);
    }
    if let Some(key) = &report.saved_key {
        println!("  Cache saved as:      {}", key);
    } else if build.use_cache {
        println!("  {} Cache was not updated", style("!").yellow());
    }

    Ok(())
}
