use std::collections::BTreeMap;

use crate::domain::models::{classify_value, format_expiry, CacheEntry, StatsSnapshot};
use crate::infrastructure::memcache::CacheClient;

/// Per-slab-class cap on `stats cachedump`. A slab can hold far more items
/// than is practical to render; anything past the cap is silently omitted.
/// This is a documented limitation of the listing, not an error.
pub const CACHEDUMP_LIMIT: u32 = 1000;

/// What one scan produced: the deduplicated entry mapping plus the general
/// statistics table, which is fetched independently of the scan.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub entries: BTreeMap<String, CacheEntry>,
    pub stats: StatsSnapshot,
}

/// Reconstructs a browsable listing of cache contents from the slab
/// introspection commands. memcached exposes no "list all keys"
/// operation, so the result is inherently best-effort: items can be
/// missed, listed after they expired, or observed twice while other
/// clients mutate the server. Nothing here attempts to compensate beyond
/// key-level deduplication.
pub struct SnapshotBuilder {
    dump_limit: u32,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            dump_limit: CACHEDUMP_LIMIT,
        }
    }

    #[cfg(test)]
    fn with_limit(dump_limit: u32) -> Self {
        Self { dump_limit }
    }

    /// Walks every numeric slab class, dumps a bounded key sample per
    /// class, and re-fetches each key to recover its live value. A failed
    /// introspection call aborts only that slab class's contribution; the
    /// scan always returns whatever it collected. The stats fetch runs
    /// regardless of how the scan went.
    pub async fn build<C: CacheClient + ?Sized>(&self, client: &mut C) -> Snapshot {
        let mut entries = BTreeMap::new();

        match client.slab_classes().await {
            Ok(groups) => {
                for group in groups {
                    // Totals rows ("active_slabs", "total_malloced") are
                    // not dumpable slab classes.
                    let Ok(slab_id) = group.id.parse::<u32>() else {
                        continue;
                    };
                    self.scan_slab(client, slab_id, &mut entries).await;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Slab listing failed, entry scan skipped");
            },
        }

        let stats = match client.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::warn!(error = %e, "Stats query failed");
                StatsSnapshot::default()
            },
        };

        Snapshot { entries, stats }
    }

    async fn scan_slab<C: CacheClient + ?Sized>(
        &self,
        client: &mut C,
        slab_id: u32,
        entries: &mut BTreeMap<String, CacheEntry>,
    ) {
        let dumped = match client.dump_keys(slab_id, self.dump_limit).await {
            Ok(dumped) => dumped,
            Err(e) => {
                tracing::warn!(slab_id, error = %e, "Cachedump failed, slab skipped");
                return;
            },
        };

        for item in dumped {
            // A miss here means the item vanished between the dump and the
            // re-fetch; keep it visible with its stale metadata instead of
            // hiding it.
            let raw = match client.get(&item.key).await {
                Ok(Some(value)) => value,
                Ok(None) => String::new(),
                Err(e) => {
                    tracing::warn!(key = %item.key, error = %e, "Re-fetch failed");
                    String::new()
                },
            };

            let (value_kind, value) = classify_value(&raw);

            // Last write wins: a key dumped from several slab classes
            // collapses to a single entry.
            entries.insert(
                item.key.clone(),
                CacheEntry {
                    key: item.key,
                    value,
                    value_kind,
                    expires_at: format_expiry(item.expires_at),
                    size_bytes: item.size_bytes,
                },
            );
        }
    }
}
