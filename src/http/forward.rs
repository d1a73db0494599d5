//! Per-request forwarding pipeline.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → HeaderPolicy (strip hop-by-hop, inject, Host override)
//!     → RewriteSet (first matching path rule)
//!     → compose (graft onto destination)
//!     → Transport round trip
//!     → relay status, headers and streamed body
//! ```
//!
//! # Design Decisions
//! - The inbound request is consumed into a fresh outbound request
//! - No retries: an upstream failure becomes a 502 immediately
//! - Response bodies are streamed, never buffered

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{self, HeaderValue};
use axum::http::{request, Request, Response, StatusCode, Uri};
use percent_encoding::percent_decode_str;
use url::{Position, Url};

use crate::config::destination::{has_userinfo, Destination};
use crate::config::ProxyConfig;
use crate::http::headers::{basic_auth, HeaderPolicy};
use crate::rewrite::{compose, RewriteSet};
use crate::transport::{Transport, TransportError};

/// Forwards every inbound request to the fixed destination.
pub struct Forwarder {
    destination: Destination,
    rewrites: RewriteSet,
    headers: HeaderPolicy,
    transport: Arc<dyn Transport>,
}

impl Forwarder {
    pub fn new(
        destination: Destination,
        rewrites: RewriteSet,
        headers: HeaderPolicy,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            destination,
            rewrites,
            headers,
            transport,
        }
    }

    pub fn from_config(config: &ProxyConfig, transport: Arc<dyn Transport>) -> Self {
        Self::new(
            config.destination().clone(),
            config.rewrites().clone(),
            config.headers().clone(),
            transport,
        )
    }

    /// Forwards `request` and relays the destination's response.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let (parts, body) = request.into_parts();

        let mut url = match inbound_url(&parts) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(uri = %parts.uri, error = %e, "Failed to interpret the request URL");
                return status_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let mut headers = self.headers.apply(&parts.headers);

        if self.rewrites.apply(&mut url) {
            tracing::debug!(from = %parts.uri, to = %url.path(), "Path rewritten");
        }
        let target = compose(&self.destination, &url);

        if let Some(host) = self.headers.host() {
            headers.insert(header::HOST, host.clone());
        }
        if !headers.contains_key(header::AUTHORIZATION) {
            if let Some(credentials) = userinfo_credentials(&target) {
                headers.insert(header::AUTHORIZATION, credentials);
            }
        }

        let uri = match wire_uri(&target) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(target_url = %target, error = %e, "Failed to build the outbound request");
                return status_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let mut outbound = Request::new(body);
        *outbound.method_mut() = parts.method.clone();
        *outbound.uri_mut() = uri;
        *outbound.headers_mut() = headers;

        tracing::debug!(method = %parts.method, uri = %outbound.uri(), "Forwarding request");

        match self.transport.round_trip(outbound).await {
            Ok(response) => relay(response),
            Err(TransportError::Dump(e)) => {
                tracing::error!(error = %e, "Failed to dump the round trip");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Err(e) => {
                tracing::error!(method = %parts.method, uri = %parts.uri, error = %e, "Upstream error");
                status_response(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

/// Reconstructs the full inbound URL from an origin-form or absolute-form
/// request target.
fn inbound_url(parts: &request::Parts) -> Result<Url, url::ParseError> {
    if parts.uri.scheme().is_some() && parts.uri.authority().is_some() {
        return Url::parse(&parts.uri.to_string());
    }

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    let mut url = Url::parse(&format!("http://{}/", host))
        .or_else(|_| Url::parse("http://localhost/"))?;
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());
    Ok(url)
}

/// The request target sent on the wire: no credentials, no fragment.
fn wire_uri(url: &Url) -> Result<Uri, axum::http::uri::InvalidUri> {
    let without_userinfo = &url[Position::BeforeHost..Position::AfterQuery];
    format!("{}://{}", url.scheme(), without_userinfo).parse()
}

/// `Authorization: Basic` value derived from URL credentials.
fn userinfo_credentials(url: &Url) -> Option<HeaderValue> {
    if !has_userinfo(url) {
        return None;
    }
    let username = percent_decode_str(url.username()).decode_utf8_lossy();
    let password = percent_decode_str(url.password().unwrap_or("")).decode_utf8_lossy();
    basic_auth(&username, &password).ok()
}

fn relay(response: Response<Body>) -> Response<Body> {
    let (parts, body) = response.into_parts();
    let mut relayed = Response::new(body);
    *relayed.status_mut() = parts.status;
    for (name, value) in &parts.headers {
        relayed.headers_mut().append(name.clone(), value.clone());
    }
    relayed
}

fn status_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::from(status.canonical_reason().unwrap_or("")));
    *response.status_mut() = status;
    response
}
