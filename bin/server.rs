// Laptop Lab - Web Server
// REST API with Axum over the lab pipelines

use anyhow::{Context, Result};
use tracing::{info, warn};

use laptop_lab::{create_router, AppState, LabConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "laptop_lab=info,tower_http=info".into()),
        )
        .init();

    let config = LabConfig::from_env();
    let ws = config.workspace();
    ws.ensure_root()
        .with_context(|| format!("cannot create data dir {}", config.data_dir.display()))?;
    if !config.static_dir.exists() {
        warn!(dir = %config.static_dir.display(), "static dir not found; /static will 404");
    }

    let app = create_router(AppState::new(&config));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!(
        address = %addr,
        data_dir = %config.data_dir.display(),
        seed = ?config.seed,
        "🚀 Laptop Lab server running (press ctrl+c to stop)"
    );

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
