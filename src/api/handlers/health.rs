use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::services::ServerRegistry;
use crate::infrastructure::memcache::MemcacheClient;

#[derive(Clone)]
pub struct HealthState {
    pub registry: ServerRegistry,
    pub connect_timeout: Duration,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    pub status: String,
    pub servers: Vec<ServerCheck>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServerCheck {
    pub friendly_name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerCheck {
    fn ok(friendly_name: &str) -> Self {
        Self {
            friendly_name: friendly_name.to_string(),
            status: "ok".to_string(),
            message: None,
        }
    }

    fn error(friendly_name: &str, message: &str) -> Self {
        Self {
            friendly_name: friendly_name.to_string(),
            status: "error".to_string(),
            message: Some(message.to_string()),
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "At least one configured server is reachable", body = ReadyResponse),
        (status = 503, description = "No configured server is reachable", body = ReadyResponse)
    ),
    tag = "Health"
)]
pub async fn ready(State(state): State<HealthState>) -> (StatusCode, Json<ReadyResponse>) {
    let mut checks = Vec::new();

    for server in state.registry.servers() {
        let check =
            match MemcacheClient::connect(&server.host, server.port, state.connect_timeout).await {
                Ok(_) => ServerCheck::ok(&server.friendly_name),
                Err(e) => ServerCheck::error(&server.friendly_name, &e.to_string()),
            };
        checks.push(check);
    }

    let any_ok = checks.iter().any(|c| c.status == "ok");
    let status = if any_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if any_ok { "ready" } else { "not_ready" }.to_string(),
            servers: checks,
        }),
    )
}
