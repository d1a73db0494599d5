//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the outbound transport from the loaded configuration
//! - Create the Axum router that sends every path to the forwarder
//! - Serve a bound listener until shutdown is signalled

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::forward::Forwarder;
use crate::net::build_client;
use crate::transport::{DiagnosticTransport, HyperTransport, TracingSink, Transport};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP server for the forward proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server forwarding through the transport built from `config`.
    pub fn new(config: &ProxyConfig) -> Self {
        let transport = build_transport(config);
        Self::with_forwarder(Arc::new(Forwarder::from_config(config, transport)))
    }

    /// Create a server around an existing forwarder.
    pub fn with_forwarder(forwarder: Arc<Forwarder>) -> Self {
        let router = Self::build_router(AppState { forwarder });
        Self { router }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Real client transport, wrapped for dumping in verbose mode.
pub fn build_transport(config: &ProxyConfig) -> Arc<dyn Transport> {
    let transport = HyperTransport::new(build_client(config.tls()));
    if config.verbose() {
        tracing::info!(dump_body = config.dump_body(), "Diagnostic dumps enabled");
        Arc::new(
            DiagnosticTransport::new(transport, Arc::new(TracingSink))
                .with_response_body(config.dump_body()),
        )
    } else {
        Arc::new(transport)
    }
}

async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.forwarder.handle(request).await
}
