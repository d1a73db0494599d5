//! Diagnostic request/response dumping.
//!
//! # Responsibilities
//! - Buffer and render the outbound request (line, headers, body)
//! - Render the response status line and headers
//! - Optionally buffer, decode and render the response body
//! - Hand one combined record per round trip to a [`DumpSink`]
//!
//! # Design Decisions
//! - Buffered bodies are replayed byte for byte; callers never see the
//!   decoded form and the original `Content-Length` is kept
//! - Response bodies are only dumped when asked for, since buffering
//!   defeats streaming

use std::fmt::Write as _;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, request, response, HeaderMap, Request, Response};
use futures_util::future::BoxFuture;
use http_body_util::BodyExt;
use thiserror::Error;
use uuid::Uuid;

use crate::transport::decode::decode_body;
use crate::transport::{Transport, TransportError};

/// Failure while producing a dump.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to read the request body: {0}")]
    RequestBody(#[source] axum::Error),

    #[error("failed to read the response body: {0}")]
    ResponseBody(#[source] axum::Error),

    #[error("failed to decode the {encoding} response body: {source}")]
    Decode {
        encoding: String,
        #[source]
        source: std::io::Error,
    },
}

/// One round trip as rendered text.
#[derive(Debug, Clone)]
pub struct RoundTripDump {
    pub id: Uuid,
    pub request: String,
    /// `None` when the round trip failed before a response arrived.
    pub response: Option<String>,
}

/// Destination for dump records.
pub trait DumpSink: Send + Sync {
    fn record(&self, dump: &RoundTripDump);
}

/// Writes dumps as `tracing` events under the `hfwd::dump` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DumpSink for TracingSink {
    fn record(&self, dump: &RoundTripDump) {
        let response = dump.response.as_deref().unwrap_or("(no response)");
        tracing::info!(
            target: "hfwd::dump",
            dump_id = %dump.id,
            "\n{}\n{}",
            dump.request,
            response
        );
    }
}

/// Transport wrapper that dumps every round trip.
pub struct DiagnosticTransport<T> {
    inner: T,
    sink: Arc<dyn DumpSink>,
    dump_body: bool,
}

impl<T: Transport> DiagnosticTransport<T> {
    pub fn new(inner: T, sink: Arc<dyn DumpSink>) -> Self {
        Self {
            inner,
            sink,
            dump_body: false,
        }
    }

    /// Include decoded response bodies in dumps.
    pub fn with_response_body(mut self, enabled: bool) -> Self {
        self.dump_body = enabled;
        self
    }

    async fn dump_round_trip(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let id = Uuid::new_v4();

        let (parts, body) = request.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(DumpError::RequestBody)?
            .to_bytes();
        let request_dump = render_request(&parts, &bytes);
        let request = Request::from_parts(parts, Body::from(bytes));

        let response = match self.inner.round_trip(request).await {
            Ok(response) => response,
            Err(e) => {
                self.sink.record(&RoundTripDump {
                    id,
                    request: request_dump,
                    response: None,
                });
                return Err(e);
            }
        };

        let (parts, body) = response.into_parts();
        let mut response_dump = render_response_head(&parts);
        let body = if self.dump_body {
            let decoded = match body.collect().await {
                Ok(collected) => {
                    let bytes = collected.to_bytes();
                    decode_body(&parts.headers, &bytes).map(|text| (text, bytes))
                }
                Err(e) => Err(DumpError::ResponseBody(e)),
            };
            match decoded {
                Ok((text, bytes)) => {
                    response_dump.push_str(&text);
                    Body::from(bytes)
                }
                Err(e) => {
                    let _ = write!(response_dump, "(response dump failed: {})", e);
                    self.sink.record(&RoundTripDump {
                        id,
                        request: request_dump,
                        response: Some(response_dump),
                    });
                    return Err(e.into());
                }
            }
        } else {
            body
        };

        self.sink.record(&RoundTripDump {
            id,
            request: request_dump,
            response: Some(response_dump),
        });
        Ok(Response::from_parts(parts, body))
    }
}

impl<T: Transport> Transport for DiagnosticTransport<T> {
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, TransportError>> {
        Box::pin(self.dump_round_trip(request))
    }
}

fn render_request(parts: &request::Parts, body: &[u8]) -> String {
    let mut out = String::new();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let _ = writeln!(out, "{} {} {:?}", parts.method, target, parts.version);

    if !parts.headers.contains_key(header::HOST) {
        if let Some(authority) = parts.uri.authority() {
            let _ = writeln!(out, "host: {}", authority.as_str());
        }
    }
    render_headers(&mut out, &parts.headers);
    out.push('\n');
    out.push_str(&String::from_utf8_lossy(body));
    out
}

fn render_response_head(parts: &response::Parts) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:?} {}", parts.version, parts.status);
    render_headers(&mut out, &parts.headers);
    out.push('\n');
    out
}

fn render_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
}
