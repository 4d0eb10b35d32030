use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use super::{ActionResult, ActiveServer, CacheEntry, ServerDescriptor, StatsSnapshot};

/// Everything one read request produced, assembled once and handed to the
/// presentation layer unchanged. Pure composition, no behavior.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardState {
    pub servers: Vec<ServerDescriptor>,
    pub active_server: ActiveServer,
    /// Best-effort entry listing, keyed (and therefore deduplicated) by
    /// cache key. Empty on pure-mutation requests.
    pub entries: BTreeMap<String, CacheEntry>,
    pub stats: StatsSnapshot,
    pub action: ActionResult,
}
