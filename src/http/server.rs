//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the channel handlers
//! - Mount the optional static folder
//! - Wire up middleware (tracing, body limit, request ID)
//! - Bind server to listener
//! - Fail pending requests and drain on shutdown

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer};

use crate::channel::HttpServerChannel;
use crate::config::{ServerConfig, StaticFilesConfig};
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::ShutdownSignal;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub channel: Arc<HttpServerChannel>,
}

/// HTTP server exposing one channel.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    channel: Arc<HttpServerChannel>,
}

impl HttpServer {
    /// Create a new HTTP server for `channel`.
    pub fn new(config: ServerConfig, channel: Arc<HttpServerChannel>) -> Self {
        let state = AppState {
            channel: channel.clone(),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            channel,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/handshake", get(handlers::handshake))
            .route("/message", post(handlers::post_message))
            .with_state(state);

        if let Some(static_files) = &config.static_files {
            router = mount_static(router, static_files);
        }

        router
            .layer(DefaultBodyLimit::disable())
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer())
                    .layer(RequestBodyLimitLayer::new(config.channel.max_body_size)),
            )
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let channel = self.channel.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received");
                // Parked POST /message handlers would otherwise block the drain.
                channel.shutdown();
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

fn mount_static(router: Router, static_files: &StaticFilesConfig) -> Router {
    let serve_dir = ServeDir::new(&static_files.folder);
    let prefix = static_files
        .prefix
        .as_deref()
        .map(|p| p.trim_end_matches('/'))
        .unwrap_or_default();

    let mount_point = if prefix.is_empty() { "/" } else { prefix };
    tracing::info!(
        folder = %static_files.folder,
        prefix = %mount_point,
        "Serving static files"
    );

    if prefix.is_empty() {
        router.fallback_service(serve_dir)
    } else {
        router.nest_service(prefix, serve_dir)
    }
}
