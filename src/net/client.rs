//! Shared outbound HTTP client.

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::net::tls::TlsIdentity;

/// Pooled client used for every forwarded request.
pub type HttpsClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Builds the pooled HTTP/1.1 client, speaking TLS with `identity` for
/// `https` destinations and plain TCP for `http` ones.
pub fn build_client(identity: &TlsIdentity) -> HttpsClient {
    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(identity.client_config().as_ref().clone())
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Client::builder(TokioExecutor::new()).build(https)
}
