//! Local archive cache backend
//!
//! Every saved key becomes a directory in the store named by the SHA-256 of
//! the key:
//!
//! ```text
//! <store>/<hash>/meta.json      key, saved paths, creation time
//! <store>/<hash>/0.tar.zst      first saved path
//! <store>/<hash>/1.tar.zst      ...
//! ```
//!
//! Restoring unpacks each archive into a temporary sibling of its target and
//! renames it into place, so a target is never half-written.

use crate::cache::backend::CacheBackend;
use crate::error::{StepError, StepResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const META_FILE: &str = "meta.json";
const RESTORE_SUFFIX: &str = ".restoring";

/// Metadata stored next to the archives of one key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCache {
    pub key: String,
    pub paths: Vec<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Cache backend storing zstd-compressed tarballs on the local filesystem
#[derive(Debug, Clone)]
pub struct ArchiveBackend {
    store_dir: PathBuf,
    compression_level: i32,
}

impl ArchiveBackend {
    pub fn new(store_dir: impl Into<PathBuf>, compression_level: i32) -> Self {
        Self {
            store_dir: store_dir.into(),
            compression_level,
        }
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Directory name for a key (first 32 hex chars of its SHA-256)
    pub fn entry_name(key: &str) -> String {
        let digest = Sha256::digest(key.as_bytes());
        hex::encode(digest)[..32].to_string()
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.store_dir.join(Self::entry_name(key))
    }

    /// All stored entries, newest first
    pub async fn entries(&self) -> StepResult<Vec<StoredCache>> {
        let store_dir = self.store_dir.clone();
        blocking(move || list_entries(&store_dir)).await
    }

    /// Remove every stored entry, returning how many were removed
    pub async fn clear(&self) -> StepResult<usize> {
        let store_dir = self.store_dir.clone();
        blocking(move || {
            let entries = list_entries(&store_dir)?;
            for entry in &entries {
                let dir = store_dir.join(Self::entry_name(&entry.key));
                fs::remove_dir_all(&dir)
                    .map_err(|e| backend_io(format!("removing {}", dir.display()), e))?;
            }
            Ok(entries.len())
        })
        .await
    }
}

#[async_trait]
impl CacheBackend for ArchiveBackend {
    async fn restore(&self, keys: &[String]) -> StepResult<Option<String>> {
        for key in keys {
            let entry_dir = self.entry_dir(key);
            if !entry_dir.join(META_FILE).is_file() {
                debug!("Cache miss for key {}", key);
                continue;
            }

            let hit = key.clone();
            blocking(move || restore_entry(&entry_dir)).await?;
            info!("Cache hit for key {}", hit);
            return Ok(Some(hit));
        }
        Ok(None)
    }

    async fn save(&self, key: &str, paths: &[PathBuf]) -> StepResult<()> {
        let store_dir = self.store_dir.clone();
        let key = key.to_string();
        let paths = paths.to_vec();
        let level = self.compression_level;
        blocking(move || save_entry(&store_dir, &key, &paths, level)).await
    }

    fn backend_name(&self) -> &'static str {
        "local archive"
    }
}

async fn blocking<T, F>(f: F) -> StepResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StepResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StepError::CacheBackend(format!("cache task failed: {}", e)))?
}

fn backend_io(context: String, e: std::io::Error) -> StepError {
    StepError::CacheBackend(format!("{}: {}", context, e))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_dir_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn read_meta(entry_dir: &Path) -> StepResult<StoredCache> {
    let meta_path = entry_dir.join(META_FILE);
    let content = fs::read_to_string(&meta_path)
        .map_err(|e| backend_io(format!("reading {}", meta_path.display()), e))?;
    Ok(serde_json::from_str(&content)?)
}

fn list_entries(store_dir: &Path) -> StepResult<Vec<StoredCache>> {
    let read_dir = match fs::read_dir(store_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(backend_io(format!("reading {}", store_dir.display()), e)),
    };

    let mut entries = Vec::new();
    for dir_entry in read_dir.flatten() {
        let path = dir_entry.path();
        if path.join(META_FILE).is_file() {
            entries.push(read_meta(&path)?);
        }
    }
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(entries)
}

fn restore_entry(entry_dir: &Path) -> StepResult<()> {
    let meta = read_meta(entry_dir)?;

    for (index, target) in meta.paths.iter().enumerate() {
        let archive_path = entry_dir.join(format!("{}.tar.zst", index));
        let tmp = with_suffix(target, RESTORE_SUFFIX);

        remove_dir_if_exists(&tmp)
            .map_err(|e| backend_io(format!("removing {}", tmp.display()), e))?;
        fs::create_dir_all(&tmp)
            .map_err(|e| backend_io(format!("creating {}", tmp.display()), e))?;

        let file = File::open(&archive_path)
            .map_err(|e| backend_io(format!("opening {}", archive_path.display()), e))?;
        let decoder = zstd::stream::Decoder::new(file)
            .map_err(|e| backend_io(format!("decompressing {}", archive_path.display()), e))?;
        tar::Archive::new(decoder)
            .unpack(&tmp)
            .map_err(|e| backend_io(format!("unpacking {}", archive_path.display()), e))?;

        remove_dir_if_exists(target)
            .map_err(|e| backend_io(format!("removing {}", target.display()), e))?;
        fs::rename(&tmp, target)
            .map_err(|e| backend_io(format!("moving restored cache to {}", target.display()), e))?;

        debug!("Restored {}", target.display());
    }

    Ok(())
}

fn save_entry(store_dir: &Path, key: &str, paths: &[PathBuf], level: i32) -> StepResult<()> {
    let entry_dir = store_dir.join(ArchiveBackend::entry_name(key));
    let tmp = with_suffix(&entry_dir, ".partial");

    remove_dir_if_exists(&tmp).map_err(|e| backend_io(format!("removing {}", tmp.display()), e))?;
    fs::create_dir_all(&tmp).map_err(|e| backend_io(format!("creating {}", tmp.display()), e))?;

    let mut size_bytes = 0;
    for (index, path) in paths.iter().enumerate() {
        if !path.is_dir() {
            return Err(StepError::CacheBackend(format!(
                "cache path {} is not a directory",
                path.display()
            )));
        }

        let archive_path = tmp.join(format!("{}.tar.zst", index));
        let file = File::create(&archive_path)
            .map_err(|e| backend_io(format!("creating {}", archive_path.display()), e))?;
        let encoder = zstd::stream::Encoder::new(file, level)
            .map_err(|e| backend_io("initializing zstd encoder".to_string(), e))?;

        let mut builder = tar::Builder::new(encoder);
        builder
            .append_dir_all(".", path)
            .map_err(|e| backend_io(format!("archiving {}", path.display()), e))?;
        builder
            .into_inner()
            .and_then(|encoder| encoder.finish())
            .map_err(|e| backend_io(format!("finishing {}", archive_path.display()), e))?;

        size_bytes += fs::metadata(&archive_path).map(|m| m.len()).unwrap_or(0);
    }

    let meta = StoredCache {
        key: key.to_string(),
        paths: paths.to_vec(),
        created_at: Utc::now(),
        size_bytes,
    };
    fs::write(tmp.join(META_FILE), serde_json::to_string_pretty(&meta)?)
        .map_err(|e| backend_io("writing cache metadata".to_string(), e))?;

    remove_dir_if_exists(&entry_dir)
        .map_err(|e| backend_io(format!("removing {}", entry_dir.display()), e))?;
    fs::rename(&tmp, &entry_dir)
        .map_err(|e| backend_io(format!("moving {}", entry_dir.display()), e))?;

    info!("Saved cache key {} ({} bytes)", key, size_bytes);
    Ok(())
}
