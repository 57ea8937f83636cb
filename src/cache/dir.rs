//! Cache directory lifecycle
//!
//! The builder reads layers from the stable directory and writes the next
//! generation into the staging directory. Only after a successful build is
//! the staging directory promoted over the stable one, which both keeps a
//! failed build from publishing a partial cache and stops the cache from
//! growing without bound.

use crate::error::{StepError, StepResult};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Suffix appended to the stable path to derive the staging path
pub const STAGING_SUFFIX: &str = "-new";

/// Stable and staging cache directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLocation {
    stable: PathBuf,
    staging: PathBuf,
}

impl CacheLocation {
    /// Create a location from explicit paths. The two must differ.
    pub fn new(stable: impl Into<PathBuf>, staging: impl Into<PathBuf>) -> StepResult<Self> {
        let stable = stable.into();
        let staging = staging.into();
        if stable == staging {
            return Err(StepError::ConfigParse(format!(
                "staging cache directory must differ from {}",
                stable.display()
            )));
        }
        Ok(Self { stable, staging })
    }

    /// Derive the staging directory as a `-new` sibling of `stable`
    pub fn with_sibling_staging(stable: impl Into<PathBuf>) -> StepResult<Self> {
        let stable = stable.into();
        let mut name: OsString = stable.as_os_str().to_owned();
        name.push(STAGING_SUFFIX);
        Self::new(stable, PathBuf::from(name))
    }

    pub fn stable(&self) -> &Path {
        &self.stable
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }
}

/// Create `path` and any missing parents
pub async fn ensure_exists(path: &Path) -> StepResult<()> {
    debug!("Ensuring cache folder {}", path.display());
    fs::create_dir_all(path)
        .await
        .map_err(|e| StepError::cache_io(format!("create cache folder {}", path.display()), e))
}

/// Replace `stable` with `staging`.
///
/// If the old stable directory is removed but the rename fails, `stable` is
/// left absent. Callers treat that as a lost cache, not a failed build.
pub async fn promote(staging: &Path, stable: &Path) -> StepResult<()> {
    debug!(
        "Promoting cache folder {} -> {}",
        staging.display(),
        stable.display()
    );

    match fs::remove_dir_all(stable).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(StepError::cache_io(
                format!("remove cache folder {}", stable.display()),
                e,
            ))
        }
    }

    fs::rename(staging, stable).await.map_err(|e| {
        StepError::cache_io(
            format!(
                "move cache folder {} to {}",
                staging.display(),
                stable.display()
            ),
            e,
        )
    })
}
