//! HTTP service: multipart upload in, JSON report out.
//!
//! Routes:
//! - `POST /api/upload`  run the pipeline on the `cv` form field
//! - `GET  /api/health`  liveness
//! - `GET  /api/test`    static sample payload
//! - `GET  /api/error`   static 500
//!
//! Anything else gets a JSON 404.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ErrorResponse, ServerError};
pub use state::AppState;

use crate::config::ServerConfig;
use crate::process::Pipeline;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the router around a ready pipeline.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let upload = Router::new()
        .route("/api/upload", post(routes::upload))
        .layer(DefaultBodyLimit::max(state.body_limit()));

    Router::new()
        .merge(upload)
        .route("/api/health", get(routes::health))
        .route("/api/test", get(routes::test_route))
        .route("/api/error", get(routes::error_route))
        .fallback(routes::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig, pipeline: Pipeline) -> std::io::Result<()> {
    if let Err(e) = pipeline.gateway().ensure_ready() {
        warn!("{}; every upload will be rejected until this is fixed", e);
    }

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;

    info!(
        "Max file size: {}MB, allowed types: {}",
        pipeline.config().max_file_size / (1024 * 1024),
        pipeline.config().allowed_types.join(", ")
    );
    let state = Arc::new(AppState::new(pipeline, config));
    let app = router(state);

    info!("Server is running on http://{}", addr);
    info!("Health check: http://{}/api/health", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
