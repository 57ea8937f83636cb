//! Cache key construction
//!
//! Keys follow `<prefix>-<tag>-<os>-<arch>-<branch>-<commit>`. Restore tries
//! the full key first, then drops the commit, then the branch as well, so a
//! new branch still starts from a warm cache of the same image.

use std::fmt;

/// Values substituted into the key template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyContext {
    pub os: String,
    pub arch: String,
    pub branch: String,
    pub commit_hash: String,
}

impl KeyContext {
    /// Context for the current host with the given VCS position
    pub fn detect(branch: Option<&str>, commit_hash: Option<&str>) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            branch: branch.unwrap_or_default().to_string(),
            commit_hash: commit_hash.unwrap_or_default().to_string(),
        }
    }
}

/// Cache keys for one image, most specific first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    full: String,
    without_commit: String,
    without_branch: String,
}

impl CacheKeys {
    /// Expand the key template for `tag`
    pub fn new(prefix: &str, tag: &str, ctx: &KeyContext) -> Self {
        let without_branch = format!("{}-{}-{}-{}", prefix, tag, ctx.os, ctx.arch);
        let without_commit = format!("{}-{}", without_branch, ctx.branch);
        let full = format!("{}-{}", without_commit, ctx.commit_hash);
        Self {
            full,
            without_commit,
            without_branch,
        }
    }

    /// Key the cache is saved under
    pub fn full(&self) -> &str {
        &self.full
    }

    /// Keys to try on restore, in order
    pub fn restore_keys(&self) -> Vec<String> {
        vec![
            self.full.clone(),
            self.without_commit.clone(),
            self.without_branch.clone(),
        ]
    }
}

impl fmt::Display for CacheKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full)
    }
}
