use std::time::Duration;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::domain::models::{CacheAction, DashboardRequest, DashboardState, ServerDescriptor};
use crate::domain::services::{ActionExecutor, ServerRegistry, SnapshotBuilder};
use crate::error::AppResult;
use crate::infrastructure::memcache::MemcacheClient;

#[derive(Clone)]
pub struct DashboardHandlerState {
    pub registry: ServerRegistry,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardQuery {
    /// Zero-based index into the configured server list.
    pub server: Option<usize>,
    /// Optional single-key lookup, performed before the scan.
    pub getkey: Option<String>,
}

/// The registry trusts its callers to pass valid indices, so the boundary
/// drops anything out of range before resolution.
pub(crate) fn sanitize_server_selector(selector: Option<usize>, len: usize) -> Option<usize> {
    selector.filter(|i| *i < len)
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    params(
        ("server" = Option<usize>, Query, description = "Zero-based index of the server to inspect; defaults to 0"),
        ("getkey" = Option<String>, Query, description = "Key to look up alongside the listing")
    ),
    responses(
        (status = 200, description = "Dashboard snapshot for the active server", body = DashboardState),
        (status = 502, description = "Active server is unreachable")
    ),
    tag = "Dashboard"
)]
pub async fn get_dashboard(
    State(state): State<DashboardHandlerState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<DashboardState>> {
    let selector = sanitize_server_selector(query.server, state.registry.len());
    let active = state.registry.resolve(selector);

    let mut client = MemcacheClient::connect(
        &active.server.host,
        active.server.port,
        state.connect_timeout,
    )
    .await?;

    let request = DashboardRequest {
        server: selector,
        get_key: query.getkey,
        ..Default::default()
    };
    let action = CacheAction::from_request(&request);
    let action_result = ActionExecutor::execute(&mut client, &action).await;

    let snapshot = SnapshotBuilder::new().build(&mut client).await;

    tracing::debug!(
        server = %active.server.friendly_name,
        entries = snapshot.entries.len(),
        "Dashboard assembled"
    );

    Ok(Json(DashboardState {
        servers: state.registry.servers().to_vec(),
        active_server: active,
        entries: snapshot.entries,
        stats: snapshot.stats,
        action: action_result,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/servers",
    responses(
        (status = 200, description = "The configured server list", body = [ServerDescriptor])
    ),
    tag = "Dashboard"
)]
pub async fn list_servers(
    State(state): State<DashboardHandlerState>,
) -> Json<Vec<ServerDescriptor>> {
    Json(state.registry.servers().to_vec())
}
