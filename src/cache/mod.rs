//! Persistent buildx layer cache
//!
//! | Piece | Role |
//! |-------|------|
//! | `dir` | stable/staging directories and promotion |
//! | `key` | cache keys with fallbacks |
//! | `backend` | restore/save by key |
//! | `archive` | local tar.zst backend |

pub mod archive;
pub mod backend;
pub mod dir;
pub mod key;

pub use archive::{ArchiveBackend, StoredCache};
pub use backend::CacheBackend;
pub use dir::{ensure_exists, promote, CacheLocation};
pub use key::{CacheKeys, KeyContext};

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
