//! CLI argument definitions using clap derive
//!
//! Step inputs are read from environment variables named like the inputs
//! (`tags`, `file`, `use_bitrise_cache`, ...), which is how CI passes them; each one
//! can also be given as a flag.

use crate::step::StepInputs;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// buildx-step - docker buildx with a persistent layer cache
///
/// Builds an image with docker buildx, restoring and saving the layer
/// cache between otherwise isolated CI runs.
#[derive(Parser, Debug)]
#[command(name = "buildx-step")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(
        short,
        long,
        global = true,
        env = "verbose",
        value_parser = parse_flag,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "no",
        default_missing_value = "yes"
    )]
    pub verbose: bool,

    /// Settings file path
    #[arg(short, long, global = true, env = "BUILDX_STEP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the image, restoring and saving the layer cache
    Run(RunArgs),

    /// Inspect and manage saved caches
    Cache(CacheArgs),

    /// Show or initialize settings
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Restore and save the layer cache
    #[arg(
        long,
        visible_alias = "use-cache",
        env = "use_bitrise_cache",
        value_parser = parse_flag,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "no",
        default_missing_value = "yes"
    )]
    pub use_bitrise_cache: bool,

    /// Push the image instead of loading it into the local daemon
    #[arg(
        long,
        env = "push",
        value_parser = parse_flag,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "no",
        default_missing_value = "yes"
    )]
    pub push: bool,

    /// Give the builder instance host network access
    #[arg(
        long,
        env = "buildx_host_network",
        value_parser = parse_flag,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "no",
        default_missing_value = "yes"
    )]
    pub buildx_host_network: bool,

    /// Image tags, one per line; the first one keys the cache
    #[arg(long, env = "tags")]
    pub tags: Option<String>,

    /// Path to the Dockerfile
    #[arg(long, env = "file")]
    pub file: Option<String>,

    /// Build context path
    #[arg(long, env = "context")]
    pub context: Option<String>,

    /// Build arguments (KEY=VALUE), one per line
    #[arg(long, env = "build_arg")]
    pub build_arg: Option<String>,

    /// External cache sources, one per line (ignored with --use-bitrise-cache)
    #[arg(long, env = "cache_from")]
    pub cache_from: Option<String>,

    /// External cache destinations, one per line (ignored with --use-bitrise-cache)
    #[arg(long, env = "cache_to")]
    pub cache_to: Option<String>,

    /// Extra buildx options; each line is split like a shell would
    #[arg(long, env = "extra_options")]
    pub extra_options: Option<String>,

    /// Git branch used in the cache key
    #[arg(long, env = "BITRISE_GIT_BRANCH")]
    pub branch: Option<String>,

    /// Git commit used in the cache key
    #[arg(long, env = "BITRISE_GIT_COMMIT")]
    pub commit: Option<String>,
}

impl RunArgs {
    pub fn to_inputs(&self, verbose: bool) -> StepInputs {
        StepInputs {
            use_cache: self.use_bitrise_cache,
            push: self.push,
            verbose,
            host_network: self.buildx_host_network,
            tags: self.tags.clone(),
            file: self.file.clone(),
            context: self.context.clone(),
            build_arg: self.build_arg.clone(),
            cache_from: self.cache_from.clone(),
            cache_to: self.cache_to.clone(),
            extra_options: self.extra_options.clone(),
        }
    }
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print the restore keys for an image, most specific first
    Keys {
        /// Image tags; the first line is used
        #[arg(long, env = "tags")]
        tags: Option<String>,

        /// Git branch
        #[arg(long, env = "BITRISE_GIT_BRANCH")]
        branch: Option<String>,

        /// Git commit
        #[arg(long, env = "BITRISE_GIT_COMMIT")]
        commit: Option<String>,
    },

    /// List saved caches
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove all saved caches
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Parse a CI boolean input ("yes"/"no" and friends)
fn parse_flag(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(format!("invalid boolean value '{s}': use yes/no")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_values() {
        assert_eq!(parse_flag("yes"), Ok(true));
        assert_eq!(parse_flag("TRUE"), Ok(true));
        assert_eq!(parse_flag("no"), Ok(false));
        assert_eq!(parse_flag("0"), Ok(false));
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn cli_parses_run() {
        let cli = Cli::parse_from([
            "buildx-step",
            "run",
            "--use-cache",
            "--push=no",
            "--tags",
            "app:1.0",
            "--file",
            "Dockerfile",
            "--context",
            ".",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.use_bitrise_cache);
                assert!(!args.push);
                assert_eq!(args.tags.as_deref(), Some("app:1.0"));

                let inputs = args.to_inputs(cli.verbose);
                assert!(inputs.use_cache);
                assert_eq!(inputs.file.as_deref(), Some("Dockerfile"));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cache_flag_long_name() {
        let cli = Cli::parse_from(["buildx-step", "run", "--use-bitrise-cache=yes"]);
        match cli.command {
            Commands::Run(args) => assert!(args.to_inputs(false).use_cache),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn verbose_flag_before_subcommand() {
        let cli = Cli::parse_from(["buildx-step", "-v", "config", "path"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["buildx-step", "--verbose=no", "config", "path"]);
        assert!(!cli.verbose);
    }

    #[test]
    fn cli_parses_cache_keys() {
        let cli = Cli::parse_from([
            "buildx-step",
            "cache",
            "keys",
            "--tags",
            "app:1.0",
            "--branch",
            "main",
        ]);
        match cli.command {
            Commands::Cache(CacheArgs {
                action: CacheAction::Keys { tags, branch, .. },
            }) => {
                assert_eq!(tags.as_deref(), Some("app:1.0"));
                assert_eq!(branch.as_deref(), Some("main"));
            }
            _ => panic!("expected cache keys"),
        }
    }

    #[test]
    fn cli_parses_cache_list_format() {
        let cli = Cli::parse_from(["buildx-step", "cache", "list", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Commands::Cache(CacheArgs {
                action: CacheAction::List {
                    format: OutputFormat::Json
                }
            })
        ));
    }
}
