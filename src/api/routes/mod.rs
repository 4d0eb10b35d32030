use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{self, DashboardHandlerState, HealthState};
use crate::config::Settings;
use crate::domain::services::ServerRegistry;
use crate::middleware::security_headers_middleware;

pub fn create_router(settings: Arc<Settings>) -> Router {
    let registry = ServerRegistry::new(settings.cache.servers.clone());
    let connect_timeout = Duration::from_secs(settings.cache.connect_timeout_secs);

    let dashboard_state = DashboardHandlerState {
        registry: registry.clone(),
        connect_timeout,
    };

    let health_state = HealthState {
        registry,
        connect_timeout,
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready).with_state(health_state));

    let dashboard_routes = Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/dashboard/action", post(handlers::execute_action))
        .route("/servers", get(handlers::list_servers))
        .with_state(dashboard_state);

    let api_routes = Router::new()
        .merge(public_routes)
        .nest("/api/v1", dashboard_routes);

    let static_dir = std::path::Path::new("public");
    let app = if static_dir.exists() {
        tracing::info!("Serving frontend from ./public");
        let serve_dir =
            ServeDir::new("public").not_found_service(ServeFile::new("public/index.html"));
        api_routes.fallback_service(serve_dir)
    } else {
        tracing::warn!("Frontend directory ./public not found, serving API only");
        api_routes
    };

    let origins: Vec<HeaderValue> = settings
        .cors
        .allowed_origins
        .0
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    app.layer(middleware::from_fn(security_headers_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
}
