use std::net::SocketAddr;
use std::sync::Arc;

use memdash::config::Settings;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file from project root
    dotenvy::dotenv().ok();

    let settings = Arc::new(Settings::new()?);

    init_logging(settings.as_ref());

    tracing::info!("Starting Memdash v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Configured cache servers: {}",
        settings
            .cache
            .servers
            .iter()
            .map(|s| format!("{} ({})", s.friendly_name, s.address()))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let app = memdash::create_router(settings.clone());

    let addr: SocketAddr = settings.server.address().parse()?;
    tracing::info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Memdash is ready to accept connections");
    tracing::info!("API available at http://{}/api/v1", addr);
    tracing::info!("Health check at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_logging(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if settings.logging.format == "json" {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
