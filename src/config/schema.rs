//! Settings schema for buildx-step
//!
//! Settings are stored at `~/.config/buildx-step/config.toml`. Per-build
//! inputs (tags, file, context, ...) are not settings; they arrive through
//! the environment on every run.

use crate::cache::CacheLocation;
use crate::error::StepResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Layer cache settings
    pub cache: CacheConfig,

    /// Builder program settings
    pub builder: BuilderConfig,
}

impl Config {
    /// Reject settings that would only fail halfway through a run
    pub fn check(&self) -> Result<(), String> {
        if self.cache.location().is_err() {
            return Err(format!(
                "cache.staging_dir must differ from cache.dir ({})",
                self.cache.dir.display()
            ));
        }

        let levels = zstd::compression_level_range();
        if !levels.contains(&self.cache.compression_level) {
            return Err(format!(
                "cache.compression_level {} is outside {}..={}",
                self.cache.compression_level,
                levels.start(),
                levels.end()
            ));
        }

        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Layer cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Stable cache directory read by every build
    pub dir: PathBuf,

    /// Staging directory the build exports into (defaults to `<dir>-new`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    /// Prefix of every cache key
    pub key_prefix: String,

    /// Where saved caches are kept (defaults to the user cache directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    /// zstd level for saved archives
    pub compression_level: i32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp/.buildx-cache"),
            staging_dir: None,
            key_prefix: "docker".to_string(),
            store_dir: None,
            compression_level: 3,
        }
    }
}

impl CacheConfig {
    pub fn location(&self) -> StepResult<CacheLocation> {
        match &self.staging_dir {
            Some(staging) => CacheLocation::new(self.dir.clone(), staging.clone()),
            None => CacheLocation::with_sibling_staging(self.dir.clone()),
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("buildx-step")
        })
    }
}

/// Builder program configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Executable providing `buildx`
    pub program: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }
}
