use crate::domain::models::{ActionKind, ActionResult, CacheAction, MAX_KEY_LEN};
use crate::infrastructure::memcache::CacheClient;

/// Memcached takes flags alongside every stored value; the dashboard
/// never exposes compression or client-side serialization, so it always
/// stores with flags 0.
const STORE_FLAGS: u32 = 0;

/// Applies the single action a request carries. Failures of the action
/// itself (a miss, a refused set, a delete of a missing key, a transport
/// hiccup mid-command) are outcomes, not errors: they are reported in the
/// result and never abort the request.
pub struct ActionExecutor;

impl ActionExecutor {
    pub async fn execute<C: CacheClient + ?Sized>(
        client: &mut C,
        action: &CacheAction,
    ) -> ActionResult {
        match action {
            CacheAction::Get { key } => Self::get(client, key).await,
            CacheAction::Set { key, value, expire } => {
                Self::set(client, key, value, *expire).await
            },
            CacheAction::Delete { key } => Self::delete(client, key).await,
            CacheAction::Flush => Self::flush(client).await,
            CacheAction::None => ActionResult::none(),
        }
    }

    async fn get<C: CacheClient + ?Sized>(client: &mut C, key: &str) -> ActionResult {
        // An empty key cannot form a valid command line; report the empty
        // lookup without touching the server.
        let (value, succeeded) = if key.is_empty() {
            (String::new(), true)
        } else {
            match client.get(key).await {
                Ok(Some(value)) => (value, true),
                // A miss is an expected outcome; the empty value doubles
                // as the "no result" marker.
                Ok(None) => (String::new(), true),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Get failed");
                    (String::new(), false)
                },
            }
        };

        ActionResult {
            action: ActionKind::Get,
            key: Some(key.to_string()),
            value: Some(value),
            succeeded,
        }
    }

    async fn set<C: CacheClient + ?Sized>(
        client: &mut C,
        key: &str,
        value: &str,
        expire: i64,
    ) -> ActionResult {
        // The boundary already rejects oversized keys; clamp anyway so a
        // missed check cannot push a malformed command onto the wire.
        let key = if key.len() > MAX_KEY_LEN {
            tracing::warn!(len = key.len(), "Oversized key truncated before set");
            truncate_key(key)
        } else {
            key
        };

        // Minimal stored-content safeguard, mirroring the input form's
        // contract. Output encoding stays the presentation layer's job.
        let value: String = value.chars().filter(|c| *c != '<' && *c != '>').collect();

        let succeeded = match client.set(key, &value, STORE_FLAGS, expire).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(key, error = %e, "Set failed");
                false
            },
        };

        tracing::info!(key, expire, succeeded, "Set executed");

        ActionResult {
            action: ActionKind::Set,
            key: Some(key.to_string()),
            value: Some(value),
            succeeded,
        }
    }

    async fn delete<C: CacheClient + ?Sized>(client: &mut C, key: &str) -> ActionResult {
        // Deleting an absent key reports succeeded = false but is not an
        // error.
        let succeeded = match client.delete(key).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(key, error = %e, "Delete failed");
                false
            },
        };

        tracing::info!(key, succeeded, "Delete executed");

        ActionResult {
            action: ActionKind::Delete,
            key: Some(key.to_string()),
            value: None,
            succeeded,
        }
    }

    async fn flush<C: CacheClient + ?Sized>(client: &mut C) -> ActionResult {
        // Irreversible; the request boundary demands explicit confirmation
        // before a flush ever reaches this point.
        let succeeded = match client.flush().await {
            Ok(flushed) => flushed,
            Err(e) => {
                tracing::warn!(error = %e, "Flush failed");
                false
            },
        };

        tracing::info!(succeeded, "Flush executed");

        ActionResult {
            action: ActionKind::Flush,
            key: None,
            value: None,
            succeeded,
        }
    }
}

fn truncate_key(key: &str) -> &str {
    let mut cut = MAX_KEY_LEN;
    while !key.is_char_boundary(cut) {
        cut -= 1;
    }
    &key[..cut]
}
