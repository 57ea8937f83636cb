//! Cache backend abstraction
//!
//! A backend persists cache directories under a key and restores them into
//! their original locations. Restore takes several keys and uses the first
//! one that is stored.

use crate::error::StepResult;
use async_trait::async_trait;
use std::path::PathBuf;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Restore the first stored key out of `keys`. Returns the key that hit,
    /// or `None` when nothing matched.
    async fn restore(&self, keys: &[String]) -> StepResult<Option<String>>;

    /// Save `paths` under `key`, replacing any previous entry for that key
    async fn save(&self, key: &str, paths: &[PathBuf]) -> StepResult<()>;

    /// Human-readable backend name for logs
    fn backend_name(&self) -> &'static str;
}
