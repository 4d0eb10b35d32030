use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::dashboard::{sanitize_server_selector, DashboardHandlerState};
use crate::domain::models::{validate_key, CacheAction, DashboardRequest, SetInput};
use crate::domain::services::ActionExecutor;
use crate::error::{AppError, AppResult};
use crate::infrastructure::memcache::MemcacheClient;

#[derive(Debug, Clone, Deserialize)]
pub struct ActionQuery {
    pub server: Option<usize>,
}

/// Mutation inputs. At most one action is expected; when several are
/// present, Set takes precedence over Delete, and Delete over Flush.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ActionPayload {
    /// Key to store; requires `value` and `expire`.
    pub key: Option<String>,
    pub value: Option<String>,
    /// Seconds (max 30 days) or an absolute unix timestamp; 0 = never.
    pub expire: Option<i64>,
    /// Key to delete.
    pub delete: Option<String>,
    /// Clears the whole keyspace of the active server. Irreversible.
    #[serde(default)]
    pub flush: bool,
    /// Must accompany `flush`; the executor does not re-check it.
    #[serde(default)]
    pub confirm: bool,
}

fn build_request(server: Option<usize>, payload: &ActionPayload) -> AppResult<DashboardRequest> {
    let set = match (&payload.key, &payload.value, &payload.expire) {
        (Some(key), Some(value), Some(expire)) => {
            validate_key(key).map_err(AppError::Validation)?;
            if *expire < 0 {
                return Err(AppError::Validation(
                    "Expire must be zero or positive".to_string(),
                ));
            }
            Some(SetInput {
                key: key.clone(),
                value: value.clone(),
                expire: *expire,
            })
        },
        (None, None, None) => None,
        _ => {
            return Err(AppError::InvalidInput(
                "Set requires key, value and expire together".to_string(),
            ))
        },
    };

    let delete_key = match &payload.delete {
        Some(key) if key.is_empty() => {
            return Err(AppError::Validation("Delete key must not be empty".to_string()))
        },
        other => other.clone(),
    };

    Ok(DashboardRequest {
        server,
        get_key: None,
        set,
        delete_key,
        flush: payload.flush,
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/dashboard/action",
    params(
        ("server" = Option<usize>, Query, description = "Zero-based index of the server to mutate; defaults to 0")
    ),
    request_body = ActionPayload,
    responses(
        (status = 303, description = "Action executed; re-issue a clean read against the Location header"),
        (status = 400, description = "Invalid action input or unconfirmed flush"),
        (status = 502, description = "Active server is unreachable")
    ),
    tag = "Dashboard"
)]
pub async fn execute_action(
    State(state): State<DashboardHandlerState>,
    Query(query): Query<ActionQuery>,
    Json(payload): Json<ActionPayload>,
) -> AppResult<Redirect> {
    let selector = sanitize_server_selector(query.server, state.registry.len());
    let active = state.registry.resolve(selector);

    let request = build_request(selector, &payload)?;
    let action = CacheAction::from_request(&request);

    if matches!(action, CacheAction::Flush) && !payload.confirm {
        return Err(AppError::Validation(
            "Flush requires explicit confirmation".to_string(),
        ));
    }

    if matches!(action, CacheAction::None) {
        tracing::debug!("Mutation request carried no action");
    } else {
        let mut client = MemcacheClient::connect(
            &active.server.host,
            active.server.port,
            state.connect_timeout,
        )
        .await?;

        ActionExecutor::execute(&mut client, &action).await;
    }

    // GET-after-POST: send the caller back to the canonical read URL so a
    // refresh cannot replay the mutation.
    Ok(Redirect::to(&format!(
        "/api/v1/dashboard?server={}",
        active.index
    )))
}
