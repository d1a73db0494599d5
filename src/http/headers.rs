//! Outbound header policy.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from the inbound set
//! - Overwrite configured headers on every request
//! - Carry the `Host` override separately from ordinary headers
//! - Synthesize the `Authorization: Basic` credential
//!
//! # Design Decisions
//! - Configured headers replace inbound values, they are never appended
//! - The inbound `Host` header is not copied; the outbound host comes from
//!   the destination or the override

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Connection-scoped headers that are never forwarded.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Returns true for headers that only apply to a single connection.
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

/// `Basic` credential for the `Authorization` header.
pub fn basic_auth(username: &str, password: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let encoded = STANDARD.encode(format!("{}:{}", username, password));
    HeaderValue::try_from(format!("Basic {}", encoded))
}

/// Immutable header transformation applied to every outbound request.
#[derive(Debug, Clone, Default)]
pub struct HeaderPolicy {
    inject: HeaderMap,
    host: Option<HeaderValue>,
}

impl HeaderPolicy {
    /// Builds the policy from configured headers and optional Basic-Auth
    /// credentials. A configured `Host` becomes the host override.
    pub fn new(configured: HeaderMap, credentials: Option<HeaderValue>) -> Self {
        let mut inject = HeaderMap::with_capacity(configured.len() + 1);
        let mut host = None;

        for (name, value) in &configured {
            if name == header::HOST {
                host = Some(value.clone());
            } else {
                inject.append(name.clone(), value.clone());
            }
        }
        if let Some(credentials) = credentials {
            inject.insert(header::AUTHORIZATION, credentials);
        }

        Self { inject, host }
    }

    /// Headers injected on every request. Never contains `Host`.
    pub fn injected(&self) -> &HeaderMap {
        &self.inject
    }

    /// Host override, if one was configured.
    pub fn host(&self) -> Option<&HeaderValue> {
        self.host.as_ref()
    }

    /// Produces the outbound header set for an inbound one.
    pub fn apply(&self, inbound: &HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::with_capacity(inbound.len() + self.inject.len());
        for (name, value) in inbound {
            if is_hop_by_hop(name) || name == header::HOST {
                continue;
            }
            out.append(name.clone(), value.clone());
        }

        for name in self.inject.keys() {
            out.remove(name);
            for value in self.inject.get_all(name) {
                out.append(name.clone(), value.clone());
            }
        }
        out
    }
}
