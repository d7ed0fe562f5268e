//! Content-addressed, file-backed cache for remote lookup results.
//!
//! Keys are SHA-256 hex digests over the order-sensitive join of every
//! parameter that affects the result, so identical inputs always hit
//! the same file. Two flavors coexist:
//!
//! - **text entries** (`.txt`): valid for as long as the file exists.
//!   Used for search responses and downloaded file contents.
//! - **JSON entries** (`.json`): wrapped in a timestamp envelope and
//!   checked against a TTL on read. Used for repository term indexes.
//!
//! Writes are whole-file overwrites; there is no partial update. The
//! cache directory is created lazily on first write. A single writer
//! is assumed — concurrent runs can duplicate remote calls but cannot
//! corrupt an entry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use termweave_shared::{Result, TermweaveError};

/// Timestamp envelope around a cached JSON payload.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Envelope<T> {
    timestamp: DateTime<Utc>,
    payload: T,
}

/// File-backed key/value store under a configured directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `dir`. The directory itself is only
    /// created once something is written.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stable, order-sensitive key over the given parts.
    pub fn generate_key<S: AsRef<str>>(parts: &[S]) -> String {
        let joined = parts
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("-");
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    // -----------------------------------------------------------------
    // Text entries (existence-keyed, no TTL)
    // -----------------------------------------------------------------

    /// Read a text entry. Present files are valid indefinitely.
    pub fn get_text(&self, key: &str) -> Option<String> {
        let path = self.text_path(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!(?path, "serving from cache");
                Some(content)
            }
            Err(_) => None,
        }
    }

    /// Write a text entry, overwriting any previous value.
    pub fn put_text(&self, key: &str, content: &str) -> Result<()> {
        self.ensure_dir()?;
        let path = self.text_path(key);
        std::fs::write(&path, content).map_err(|e| TermweaveError::io(&path, e))?;
        debug!(?path, "cached");
        Ok(())
    }

    // -----------------------------------------------------------------
    // JSON entries (timestamped, TTL-checked)
    // -----------------------------------------------------------------

    /// Read a JSON entry if it exists and its timestamp is within `ttl`.
    ///
    /// Expired or unreadable entries report a miss; the stale file is
    /// left in place to be overwritten by the next `put_json`.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let path = self.json_path(key);
        let content = std::fs::read_to_string(&path).ok()?;

        let envelope: Envelope<T> = match serde_json::from_str(&content) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(?path, error = %e, "unreadable cache entry, treating as miss");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(envelope.timestamp);
        let ttl = chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX);
        if age > ttl {
            debug!(key, "cache entry expired");
            return None;
        }

        debug!(key, "using cached data");
        Some(envelope.payload)
    }

    /// Write a JSON entry with the current timestamp.
    pub fn put_json<T: Serialize>(&self, key: &str, payload: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.json_path(key);
        let envelope = Envelope {
            timestamp: Utc::now(),
            payload,
        };
        let content = serde_json::to_string_pretty(&envelope)
            .map_err(|e| TermweaveError::parse(format!("cache serialization: {e}")))?;
        std::fs::write(&path, content).map_err(|e| TermweaveError::io(&path, e))?;
        debug!(key, "saved to cache");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Named files (audit trail)
    // -----------------------------------------------------------------

    /// Write a named file under the cache directory, e.g. the
    /// timestamped term-index audit files. Returns the full path.
    pub fn put_named(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, content).map_err(|e| TermweaveError::io(&path, e))?;
        debug!(?path, "wrote named cache file");
        Ok(path)
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn text_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.txt"))
    }

    fn json_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| TermweaveError::io(&self.dir, e))
    }
}
