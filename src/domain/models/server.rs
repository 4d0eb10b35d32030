use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One configured memcached endpoint. The set of descriptors is fixed for
/// the process lifetime (loaded from configuration at startup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ServerDescriptor {
    pub host: String,
    pub port: u16,
    pub friendly_name: String,
}

impl ServerDescriptor {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The server the current request targets, re-derived from input on every
/// request and never persisted. `index` is always a valid position in the
/// configured list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActiveServer {
    pub index: usize,
    pub server: ServerDescriptor,
}
