//! Settings file handling
//!
//! The settings file is optional: a missing file means defaults. A file that
//! exists is parsed and checked up front, so a bad cache layout is reported
//! before any cache or builder work starts.

pub mod schema;

pub use schema::Config;

use crate::error::{StepError, StepResult};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Locates, loads and writes the settings file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Use `explicit` (from `--config` / `BUILDX_STEP_CONFIG`) or the
    /// per-user default location
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        Self {
            path: explicit.unwrap_or_else(Self::default_path),
        }
    }

    /// `<config dir>/buildx-step/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("buildx-step")
            .join("config.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the settings
    pub async fn load(&self) -> StepResult<Config> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings at {}, using defaults", self.path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(StepError::io(
                    format!("reading settings from {}", self.path.display()),
                    e,
                ))
            }
        };

        let config: Config = toml::from_str(&content).map_err(|e| self.invalid(e.to_string()))?;
        config.check().map_err(|reason| self.invalid(reason))?;
        Ok(config)
    }

    /// Write `config`, replacing the file in one rename
    pub async fn save(&self, config: &Config) -> StepResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StepError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let mut tmp: OsString = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, toml::to_string_pretty(config)?)
            .await
            .map_err(|e| StepError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StepError::io(format!("replacing {}", self.path.display()), e))?;

        info!("Settings written to {}", self.path.display());
        Ok(())
    }

    fn invalid(&self, reason: String) -> StepError {
        StepError::ConfigInvalid {
            path: self.path.clone(),
            reason,
        }
    }
}
