//! churnserve binary.
//!
//! - Config: YAML file (optional) + environment overrides
//! - Storage connect + schema setup before binding; failure exits non-zero
//! - Graceful shutdown on SIGINT/SIGTERM: readiness flips to 503 first

use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

use churnserve_api::{app_state::AppState, config, router};
use churnserve_core::error::{ChurnError, Result};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "churnserve exiting");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let state = AppState::bootstrap(config::load()?).await?;
    let listen: SocketAddr = state
        .cfg()
        .server
        .listen
        .parse()
        .map_err(|e| ChurnError::Startup(format!("server.listen: {e}")))?;
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ChurnError::Startup(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, "churnserve starting");

    let drain = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            drain.set_draining();
            tracing::info!("shutdown signal received, draining");
        })
        .await
        .map_err(|e| ChurnError::Internal(format!("server failed: {e}")))?;

    state.store().close().await;
    tracing::info!("churnserve stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl_c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
