//! HTTP server setup

use axum::{
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::app_api::configure_app_routes;
use crate::core::shared::state::AppState;
use crate::webhooks::{sms::handle_sms, voice::handle_voice};

use super::health_check;

pub fn configure_webhook_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voice", post(handle_voice))
        .route("/sms", post(handle_sms))
}

/// Full application router. Panics inside handlers become plain 500 responses.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(configure_webhook_routes())
        .merge(configure_app_routes())
        .with_state(app_state)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

pub async fn run_axum_server(app_state: Arc<AppState>) -> std::io::Result<()> {
    let server = &app_state.config.server;
    let addr = format!("{}:{}", server.host, server.port);
    let app = build_router(app_state.clone());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {} - is another instance running?", addr, e);
            return Err(e);
        }
    };
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(std::io::Error::other)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
