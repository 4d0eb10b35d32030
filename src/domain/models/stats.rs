use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One `STAT name value` line from the server, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatEntry {
    pub name: String,
    pub value: String,
}

/// The general statistics table, ordered as the server returned it.
/// Opaque to this system beyond display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatsSnapshot {
    pub entries: Vec<StatEntry>,
}

impl StatsSnapshot {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }
}

/// One grouping from `stats slabs`, keyed by the raw group token the
/// server used. Numeric tokens identify slab classes; anything else (the
/// `active_slabs` / `total_malloced` totals rows) is not dumpable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlabGroup {
    pub id: String,
    pub fields: Vec<(String, String)>,
}

/// One `ITEM` line from `stats cachedump`: key plus metadata, no value.
/// `expires_at` is an absolute unix timestamp; 0 means the item never
/// expires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedKey {
    pub key: String,
    pub size_bytes: u64,
    pub expires_at: i64,
}
