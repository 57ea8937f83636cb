//! Cache command - inspect and manage saved caches

use crate::cache::{format_bytes, ArchiveBackend, CacheKeys, KeyContext, StoredCache};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::{StepError, StepResult};
use crate::step::split_lines;
use console::style;
use std::io::{self, Write};

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> StepResult<()> {
    let backend = ArchiveBackend::new(config.cache.store_dir(), config.cache.compression_level);

    match args.action {
        CacheAction::Keys {
            tags,
            branch,
            commit,
        } => show_keys(config, tags.as_deref(), branch.as_deref(), commit.as_deref()),
        CacheAction::List { format } => list_caches(&backend, format).await,
        CacheAction::Clear { yes } => clear_caches(&backend, yes).await,
    }
}

fn show_keys(
    config: &Config,
    tags: Option<&str>,
    branch: Option<&str>,
    commit: Option<&str>,
) -> StepResult<()> {
    let tag = split_lines(tags)
        .into_iter()
        .next()
        .ok_or_else(|| StepError::ConfigParse("missing required input: tags".to_string()))?;

    let ctx = KeyContext::detect(branch, commit);
    let keys = CacheKeys::new(&config.cache.key_prefix, &tag, &ctx);
    for key in keys.restore_keys() {
        println!("{}", key);
    }
    Ok(())
}

/// List saved caches
async fn list_caches(backend: &ArchiveBackend, format: OutputFormat) -> StepResult<()> {
    let entries = backend.entries().await?;

    if entries.is_empty() {
        println!("No saved caches in {}.", backend.store_dir().display());
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_cache_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_cache_table(entries: &[StoredCache]) {
    println!("{:<60} {:<10} {:<20}", "KEY", "SIZE", "CREATED");
    println!("{}", "-".repeat(90));

    for entry in entries {
        println!(
            "{:<60} {:<10} {:<20}",
            entry.key,
            format_bytes(entry.size_bytes),
            entry.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("Total: {} cache(s)", entries.len());
}

/// Remove all saved caches
async fn clear_caches(backend: &ArchiveBackend, skip_confirm: bool) -> StepResult<()> {
    let entries = backend.entries().await?;

    if entries.is_empty() {
        println!("No saved caches to clear.");
        return Ok(());
    }

    println!("This will remove {} saved cache(s):", entries.len());
    for entry in &entries {
        println!("  {} {}", style("•").red(), entry.key);
    }
    println!();

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = backend.clear().await?;
    println!("{} cleared {} cache(s)", style("✓").green(), removed);

    Ok(())
}
