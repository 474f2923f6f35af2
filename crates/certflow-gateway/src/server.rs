use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use certflow_core::config::ServerConfig;
use certflow_workflow::ValidationWorkflow;

use crate::routes;
use crate::state::AppState;

/// HTTP front door for certificate validation, built on axum.
pub struct GatewayServer {
    config: ServerConfig,
    workflow: Arc<ValidationWorkflow>,
}

impl GatewayServer {
    pub fn new(config: ServerConfig, workflow: Arc<ValidationWorkflow>) -> Self {
        Self { config, workflow }
    }

    /// Build the axum router without binding a socket.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            workflow: self.workflow.clone(),
        });

        Router::new()
            .route("/api/health", get(routes::health))
            .route("/api/document/v2/validate", post(routes::validate_document))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(state.config.max_upload_bytes))
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(
            bind = %self.config.bind,
            max_upload_bytes = self.config.max_upload_bytes,
            "Gateway listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}
