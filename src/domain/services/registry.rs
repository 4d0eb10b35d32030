use std::sync::Arc;

use crate::domain::models::{ActiveServer, ServerDescriptor};

/// Holds the static, ordered server list and resolves the active server
/// for each request. Resolution is stateless: nothing is cached between
/// requests. The list is guaranteed non-empty by configuration validation.
#[derive(Clone)]
pub struct ServerRegistry {
    servers: Arc<Vec<ServerDescriptor>>,
}

impl ServerRegistry {
    pub fn new(servers: Vec<ServerDescriptor>) -> Self {
        debug_assert!(!servers.is_empty());
        Self {
            servers: Arc::new(servers),
        }
    }

    pub fn servers(&self) -> &[ServerDescriptor] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Resolves the active server from an optional user-supplied index.
    /// Absent or out-of-range input falls back to index 0, so the returned
    /// index is always a valid position in the list. The request boundary
    /// additionally sanitizes its selector and never passes an
    /// out-of-range value.
    pub fn resolve(&self, selector: Option<usize>) -> ActiveServer {
        let index = selector.filter(|i| *i < self.servers.len()).unwrap_or(0);
        ActiveServer {
            index,
            server: self.servers[index].clone(),
        }
    }
}
