//! HTTP server wiring for the ingestion boundary

pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Ingestion HTTP server
pub struct ReviewServer {
    config: PipelineConfig,
    state: AppState,
}

impl ReviewServer {
    /// Create a new server, building all clients and starting the worker pool
    pub async fn new(config: PipelineConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// State handle, for seeding questions or submitting jobs in-process
    pub fn state(&self) -> &AppState {
        &self.state
    }

    fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(health_check))
            .route("/api/jobs", post(routes::submit_job))
            .route(
                "/api/chats/:chat_id/documents",
                get(routes::list_chat_documents),
            )
            .with_state(self.state.clone())
            .layer(DefaultBodyLimit::max(self.config.server.max_body_size))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
    }

    /// Bind and serve until shutdown
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();
        tracing::info!("Starting ingestion server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Configured listen address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

async fn health_check() -> &'static str {
    "OK"
}
