use anyhow::Result;
use tracing::info;

use crate::cache::CacheStore;
use crate::cli::ClearCacheArgs;

pub fn run(args: ClearCacheArgs) -> Result<()> {
    let store = CacheStore::new(&args.cache_root);

    if args.dry_run {
        let entries = store.entries()?;
        info!(
            cache_dir = %store.cache_dir().display(),
            entries = entries.len(),
            "dry run, nothing removed"
        );
        for entry in &entries {
            info!(path = %entry.path.display(), "would remove");
        }
        return Ok(());
    }

    let removed = store.clear()?;
    info!(
        cache_dir = %store.cache_dir().display(),
        removed,
        "cleared extraction cache"
    );

    Ok(())
}
