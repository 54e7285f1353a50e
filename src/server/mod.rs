pub mod handlers;
pub mod routes;

use anyhow::{Context, Result};
use axum::http::Method;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cli::config::ServerSettings;
use crate::pipeline::AuditPipeline;
use self::handlers::AppState;

/// HTTP API server for the audit pipeline
pub struct HttpServer {
    config: ServerSettings,
    pipeline: Arc<AuditPipeline>,
}

impl HttpServer {
    pub fn new(config: ServerSettings, pipeline: Arc<AuditPipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Run the HTTP server until ctrl-c
    pub async fn run(&self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .context("Invalid HTTP listen address")?;

        let state = AppState { pipeline: self.pipeline.clone() };

        let mut app = routes::create_router(state);

        if self.config.cors_enabled {
            let cors = CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .allow_origin(Any);
            app = app.layer(cors);
        }

        app = app.layer(TraceLayer::new_for_http());

        let listener = TcpListener::bind(&addr)
            .await
            .context("Failed to bind HTTP server")?;

        info!("Audit API listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}
