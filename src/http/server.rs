//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all proxy handler
//! - Wire up middleware (tracing, request timeout)
//! - Bind the server to a listener with graceful shutdown
//! - Hand each request to the pipeline; map failures to error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::loader::ConfigError;
use crate::config::ProxyConfig;
use crate::http::{request, response};
use crate::proxy::ProxyPipeline;

/// Application state injected into the handler. Shared read-only across
/// all in-flight requests.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ProxyPipeline>,
    pub config: Arc<ProxyConfig>,
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let pipeline = Arc::new(ProxyPipeline::from_config(&config)?);
        let state = AppState {
            pipeline,
            config: Arc::new(config.clone()),
        };
        Ok(Self {
            router: Self::build_router(&config, state),
        })
    }

    /// Build the Axum router with all middleware layers. The timeout layer
    /// sits above the outbound timeout so upstream failures surface as 502
    /// before the server gives up.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs + 5)))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler: snapshot the inbound request, run the pipeline,
/// emit the outward response.
async fn proxy_handler(State(state): State<AppState>, req: Request) -> Response {
    let request_id = Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let inbound = match request::capture(req, state.config.listener.max_body_bytes, state.config.debug).await {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!(request_id = %request_id, method = %method, path = %path, error = %e, "Failed to capture request");
            return response::error_response(&e);
        }
    };

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Proxying request");

    match state.pipeline.handle(inbound).await {
        Ok(outward) => {
            tracing::debug!(request_id = %request_id, status = outward.status, "Request complete");
            response::into_response(outward)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, method = %method, path = %path, error = %e, "Request failed");
            response::error_response(&e)
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
