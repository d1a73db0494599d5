//! Outbound round trips.
//!
//! # Data Flow
//! ```text
//! Forwarder
//!     → [dump.rs DiagnosticTransport]  (verbose mode only)
//!     → HyperTransport (pooled client from net::client)
//!     → destination
//! ```
//!
//! # Design Decisions
//! - Round trips go through the [`Transport`] trait so the diagnostic
//!   wrapper and tests can stand in for the real client
//! - Dump failures are a separate error kind from upstream failures

pub mod decode;
pub mod dump;

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::net::HttpsClient;

pub use dump::{DiagnosticTransport, DumpError, DumpSink, RoundTripDump, TracingSink};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single round trip.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, connect, TLS or I/O failure talking to the destination.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] BoxError),

    #[error("diagnostic dump failed: {0}")]
    Dump(#[from] DumpError),
}

/// Sends one request and yields its response.
pub trait Transport: Send + Sync {
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, TransportError>>;
}

/// The real client-backed transport.
#[derive(Clone)]
pub struct HyperTransport {
    client: HttpsClient,
}

impl HyperTransport {
    pub fn new(client: HttpsClient) -> Self {
        Self { client }
    }
}

impl Transport for HyperTransport {
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, TransportError>> {
        Box::pin(async move {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| TransportError::Upstream(Box::new(e)))?;
            Ok(response.map(Body::new))
        })
    }
}
