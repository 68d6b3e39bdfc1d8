//! Content-addressed cache for finished tables.
//!
//! A cache key is the SHA-256 of the raw input bytes, the serialized
//! transformation settings and the schema version. Any change to one of
//! them yields a different key, so a stale entry can never be served.
//!
//! ```text
//! <cache dir>/
//!   <key>.csv    finished ABT
//!   <key>.json   entry metadata
//! ```

use crate::config::{CacheConfig, CachePolicy, PipelineConfig};
use crate::error::Result;
use crate::schema::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata stored next to a cached table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub schema_version: String,
    pub rows: usize,
    pub columns: usize,
    pub created_at: String,
}

/// Compute the cache key for one run.
///
/// Only settings that change the table take part: the cache location,
/// NumPy export flag and experiment metadata do not.
pub fn cache_key(input: &[u8], config: &PipelineConfig) -> Result<String> {
    let settings = serde_json::to_vec(&(
        &config.imputation,
        &config.features,
        &config.policy,
        config.expected_rows,
        config.delimiter,
    ))?;

    let mut hasher = Sha256::new();
    hasher.update((input.len() as u64).to_le_bytes());
    hasher.update(input);
    hasher.update((settings.len() as u64).to_le_bytes());
    hasher.update(&settings);
    hasher.update(SCHEMA_VERSION.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Directory-backed table cache.
#[derive(Debug, Clone)]
pub struct TableCache {
    dir: PathBuf,
    policy: CachePolicy,
}

impl TableCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            policy: config.policy,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.policy == CachePolicy::ReuseIfPresent
    }

    fn table_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.csv"))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Find a complete entry for `key`.
    ///
    /// Always `None` under [`CachePolicy::RecomputeAlways`]. An entry whose
    /// metadata is unreadable or names another schema version is ignored.
    pub fn lookup(&self, key: &str) -> Option<(PathBuf, CacheEntry)> {
        if !self.is_enabled() {
            return None;
        }
        let table = self.table_path(key);
        if !table.is_file() {
            return None;
        }
        let entry: CacheEntry = fs::read(self.entry_path(key))
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())?;
        if entry.key != key || entry.schema_version != SCHEMA_VERSION {
            log::warn!("Ignoring cache entry {key}: metadata does not match");
            return None;
        }
        Some((table, entry))
    }

    /// Copy a finished table into the cache. No-op unless reuse is enabled.
    pub fn store(&self, key: &str, table: &Path, rows: usize, columns: usize) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;

        // Table first, metadata last: lookup requires both.
        let staged = self.dir.join(format!("{key}.csv.partial"));
        fs::copy(table, &staged)?;
        fs::rename(&staged, self.table_path(key))?;

        let entry = CacheEntry {
            key: key.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            rows,
            columns,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        fs::write(self.entry_path(key), serde_json::to_vec_pretty(&entry)?)?;
        log::info!("Cached table under key {key}");
        Ok(())
    }
}
