use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::cli::StatusArgs;

#[derive(Debug, Serialize)]
struct CacheStatus {
    cache_dir: String,
    entry_count: usize,
    total_bytes: u64,
    entries: Vec<CacheStatusEntry>,
}

#[derive(Debug, Serialize)]
struct CacheStatusEntry {
    file_name: String,
    size_bytes: u64,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let store = CacheStore::new(&args.cache_root);
    let entries = store.entries()?;

    let status = CacheStatus {
        cache_dir: store.cache_dir().display().to_string(),
        entry_count: entries.len(),
        total_bytes: entries.iter().map(|entry| entry.size_bytes).sum(),
        entries: entries
            .iter()
            .map(|entry| CacheStatusEntry {
                file_name: entry
                    .path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or_default()
                    .to_string(),
                size_bytes: entry.size_bytes,
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    if status.entry_count == 0 {
        warn!(cache_dir = %status.cache_dir, "extraction cache is empty");
        return Ok(());
    }

    info!(
        cache_dir = %status.cache_dir,
        entries = status.entry_count,
        total_bytes = status.total_bytes,
        "extraction cache status"
    );
    for entry in &status.entries {
        info!(file = %entry.file_name, size_bytes = entry.size_bytes, "cache entry");
    }

    Ok(())
}
