use std::collections::HashMap;

use async_trait::async_trait;

use super::CacheClient;
use crate::domain::models::{DumpedKey, SlabGroup, StatEntry, StatsSnapshot};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct StoredItem {
    pub value: String,
    pub size_bytes: u64,
    pub expires_at: i64,
}

/// In-memory stand-in for a memcached connection. The slab layout is
/// declared up front; dumps reflect whatever is currently stored, so
/// mutations behave like a live server (flush empties later scans).
#[derive(Debug, Default)]
pub struct MockCacheClient {
    pub store: HashMap<String, StoredItem>,
    /// Raw group token -> keys the dump lists under that group. Non-numeric
    /// tokens model the totals rows of `stats slabs`.
    pub slab_layout: Vec<(String, Vec<String>)>,
    /// Keys a dump reports even though the follow-up get will miss
    /// (listed-but-expired items).
    pub ghosts: Vec<(u32, DumpedKey)>,
    pub stats: Vec<StatEntry>,
    pub fail_dump_for: Vec<u32>,
    pub fail_slab_listing: bool,
    /// Chronological record of every command, for asserting what ran.
    pub log: Vec<String>,
}

impl MockCacheClient {
    /// A server whose entire population sits in slab class 1.
    pub fn single_slab(entries: &[(&str, &str, u64, i64)]) -> Self {
        let mut mock = Self::default();
        for (key, value, size_bytes, expires_at) in entries {
            mock.insert(key, value, *size_bytes, *expires_at);
        }
        mock.slab_layout = vec![(
            "1".to_string(),
            entries.iter().map(|(k, ..)| k.to_string()).collect(),
        )];
        mock
    }

    pub fn insert(&mut self, key: &str, value: &str, size_bytes: u64, expires_at: i64) {
        self.store.insert(
            key.to_string(),
            StoredItem {
                value: value.to_string(),
                size_bytes,
                expires_at,
            },
        );
    }
}

#[async_trait]
impl CacheClient for MockCacheClient {
    async fn get(&mut self, key: &str) -> AppResult<Option<String>> {
        self.log.push(format!("get {}", key));
        Ok(self.store.get(key).map(|item| item.value.clone()))
    }

    async fn set(&mut self, key: &str, value: &str, flags: u32, expire: i64) -> AppResult<bool> {
        self.log.push(format!("set {} {} {}", key, flags, expire));
        self.store.insert(
            key.to_string(),
            StoredItem {
                value: value.to_string(),
                size_bytes: value.len() as u64,
                expires_at: expire,
            },
        );
        Ok(true)
    }

    async fn delete(&mut self, key: &str) -> AppResult<bool> {
        self.log.push(format!("delete {}", key));
        Ok(self.store.remove(key).is_some())
    }

    async fn flush(&mut self) -> AppResult<bool> {
        self.log.push("flush_all".to_string());
        self.store.clear();
        Ok(true)
    }

    async fn stats(&mut self) -> AppResult<StatsSnapshot> {
        self.log.push("stats".to_string());
        Ok(StatsSnapshot {
            entries: self.stats.clone(),
        })
    }

    async fn slab_classes(&mut self) -> AppResult<Vec<SlabGroup>> {
        self.log.push("stats slabs".to_string());
        if self.fail_slab_listing {
            return Err(AppError::CacheProtocol("slab listing failed".to_string()));
        }
        Ok(self
            .slab_layout
            .iter()
            .map(|(id, _)| SlabGroup {
                id: id.clone(),
                fields: vec![("chunk_size".to_string(), "96".to_string())],
            })
            .collect())
    }

    async fn dump_keys(&mut self, slab_id: u32, limit: u32) -> AppResult<Vec<DumpedKey>> {
        self.log.push(format!("stats cachedump {} {}", slab_id, limit));
        if self.fail_dump_for.contains(&slab_id) {
            return Err(AppError::CacheProtocol(format!(
                "cachedump failed for slab {}",
                slab_id
            )));
        }

        let mut keys: Vec<DumpedKey> = self
            .slab_layout
            .iter()
            .filter(|(id, _)| id.parse::<u32>() == Ok(slab_id))
            .flat_map(|(_, listed)| listed.iter())
            .filter_map(|key| {
                self.store.get(key).map(|item| DumpedKey {
                    key: key.clone(),
                    size_bytes: item.size_bytes,
                    expires_at: item.expires_at,
                })
            })
            .collect();

        keys.extend(
            self.ghosts
                .iter()
                .filter(|(id, _)| *id == slab_id)
                .map(|(_, dumped)| dumped.clone()),
        );

        keys.truncate(limit as usize);
        Ok(keys)
    }
}
