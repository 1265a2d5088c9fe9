use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::model::CacheRecord;
use crate::util::{ensure_directory, sha256_hex, write_json_pretty};

const FILE_NAME_PREFIX_CHARS: usize = 40;

/// Content-addressed extraction cache. One JSON file per (locator,
/// mtime-or-string) key. Reads that fail for any reason are misses;
/// writes are best effort.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub hash: String,
    pub file_name: String,
}

impl CacheStore {
    pub fn new(cache_root: &Path) -> Self {
        Self {
            cache_dir: cache_root.join("extraction"),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Local files key on path plus mtime so edits invalidate naturally.
    /// Anything else (URLs, missing paths) keys on the raw locator
    /// string, which keeps remote entries stable across content changes.
    pub fn key_for(&self, locator: &str) -> CacheKey {
        let key_material = match fs::metadata(locator) {
            Ok(metadata) if metadata.is_file() => match mtime_seconds(&metadata) {
                Some(mtime) => format!("{locator}_{mtime}"),
                None => locator.to_string(),
            },
            _ => locator.to_string(),
        };

        let hash = sha256_hex(&key_material);
        let file_name = format!("{}_{}.json", sanitize_locator(locator), hash);

        CacheKey { hash, file_name }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheRecord> {
        let path = self.cache_dir.join(&key.file_name);
        if !path.exists() {
            return None;
        }

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice::<CacheRecord>(&raw) {
            Ok(record) => {
                debug!(path = %path.display(), "cache hit");
                Some(record)
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "cache record corrupt, treating as miss");
                None
            }
        }
    }

    pub fn put(&self, key: &CacheKey, record: &CacheRecord) {
        let path = self.cache_dir.join(&key.file_name);
        if let Err(error) = ensure_directory(&self.cache_dir)
            .and_then(|()| write_json_pretty(&path, record))
        {
            warn!(path = %path.display(), error = %error, "cache write failed, continuing without cache");
        }
    }

    pub fn entries(&self) -> Result<Vec<CacheEntry>> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let reader = fs::read_dir(&self.cache_dir)
            .with_context(|| format!("failed to read cache dir: {}", self.cache_dir.display()))?;

        for entry in reader {
            let entry = entry
                .with_context(|| format!("failed to enumerate: {}", self.cache_dir.display()))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            let size_bytes = entry.metadata().map(|metadata| metadata.len()).unwrap_or(0);
            entries.push(CacheEntry { path, size_bytes });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    pub fn clear(&self) -> Result<usize> {
        let entries = self.entries()?;
        let mut removed = 0usize;

        for entry in &entries {
            fs::remove_file(&entry.path)
                .with_context(|| format!("failed to remove: {}", entry.path.display()))?;
            removed += 1;
        }

        Ok(removed)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
}

fn mtime_seconds(metadata: &fs::Metadata) -> Option<i64> {
    let modified = metadata.modified().ok()?;
    let since_epoch = modified
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?;
    Some(since_epoch.as_secs() as i64)
}

/// Keep cache filenames filesystem-safe and bounded: ascii alphanumerics
/// survive, everything else collapses to single underscores, then the
/// result is truncated before the key hash is appended.
fn sanitize_locator(locator: &str) -> String {
    let mut out = String::with_capacity(locator.len());
    for ch in locator.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }

    while out.contains("__") {
        out = out.replace("__", "_");
    }

    let trimmed = out.trim_matches('_');
    trimmed.chars().take(FILE_NAME_PREFIX_CHARS).collect()
}
