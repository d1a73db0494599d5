//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use axum::{Json, Router};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use p12_keystore::{KeyStore, KeyStoreEntry, PrivateKeyChain};
use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

use hfwd::config::Parameters;
use hfwd::http::{Forwarder, HttpServer};
use hfwd::lifecycle::Shutdown;

/// Start an Axum backend on an ephemeral port.
pub async fn start_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Backend answering every request with a JSON description of it.
pub fn echo_router() -> Router {
    Router::new().fallback(echo)
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let mut header_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        header_map
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": header_map,
        "body": String::from_utf8_lossy(&body),
    }))
}

/// First value of `name` as seen by the echo backend.
pub fn echoed_header<'a>(echo: &'a Value, name: &str) -> Option<&'a str> {
    echo["headers"][name][0].as_str()
}

/// Load `params` and serve the proxy on an ephemeral port.
pub async fn start_proxy(params: Parameters) -> (SocketAddr, Shutdown) {
    let config = params.load().expect("configuration should load");
    serve(HttpServer::new(&config)).await
}

/// Serve a proxy around a prepared forwarder.
pub async fn start_proxy_with(forwarder: Forwarder) -> (SocketAddr, Shutdown) {
    serve(HttpServer::with_forwarder(Arc::new(forwarder))).await
}

async fn serve(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

/// Parameters pointing at `destination` with everything else defaulted.
pub fn params(destination: impl Into<String>) -> Parameters {
    Parameters {
        destination: Some(destination.into()),
        ..Default::default()
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A throwaway certificate authority plus files written to a temp dir.
pub struct TestPki {
    pub dir: TempDir,
    ca_cert: rcgen::Certificate,
    ca_key: KeyPair,
}

impl TestPki {
    pub fn new(name: &str) -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.distinguished_name.push(DnType::CommonName, name);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca_cert = params.self_signed(&ca_key).unwrap();

        Self {
            dir: tempfile::tempdir().unwrap(),
            ca_cert,
            ca_key,
        }
    }

    pub fn ca_der(&self) -> CertificateDer<'static> {
        self.ca_cert.der().clone()
    }

    /// Write the CA certificate as PEM and return its path.
    pub fn write_ca_pem(&self) -> PathBuf {
        let path = self.dir.path().join("ca.pem");
        std::fs::write(&path, self.ca_cert.pem()).unwrap();
        path
    }

    fn issue(&self, key: &KeyPair, purpose: ExtendedKeyUsagePurpose) -> rcgen::Certificate {
        let mut params =
            CertificateParams::new(vec!["127.0.0.1".to_string(), "localhost".to_string()]).unwrap();
        params.distinguished_name.push(DnType::CommonName, "hfwd test leaf");
        params.extended_key_usages = vec![purpose];
        params.signed_by(key, &self.ca_cert, &self.ca_key).unwrap()
    }

    /// Server certificate chain and key for 127.0.0.1.
    pub fn server_identity(&self) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        let key = KeyPair::generate().unwrap();
        let cert = self.issue(&key, ExtendedKeyUsagePurpose::ServerAuth);
        (
            vec![cert.der().clone()],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der())),
        )
    }

    /// Issue a client certificate for `key` and write it with the key as a
    /// PKCS12 file protected by `password`.
    pub fn write_pkcs12(&self, key: &KeyPair, password: &str) -> PathBuf {
        let cert = self.issue(key, ExtendedKeyUsagePurpose::ClientAuth);
        let chain = PrivateKeyChain::new(
            key.serialize_der(),
            b"hfwd-client",
            vec![
                p12_keystore::Certificate::from_der(cert.der()).unwrap(),
                p12_keystore::Certificate::from_der(self.ca_cert.der()).unwrap(),
            ],
        );
        let mut keystore = KeyStore::new();
        keystore.add_entry("client", KeyStoreEntry::PrivateKeyChain(chain));
        let data = keystore.writer(password).write().unwrap();

        let path = self.dir.path().join("client.p12");
        std::fs::write(&path, data).unwrap();
        path
    }

    /// rustls server config, demanding client certificates from this CA
    /// when `require_client_cert` is set.
    pub fn server_config(&self, require_client_cert: bool) -> ServerConfig {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ServerConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .unwrap();
        let builder = if require_client_cert {
            let mut roots = RootCertStore::empty();
            roots.add(self.ca_der()).unwrap();
            let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider)
                .build()
                .unwrap();
            builder.with_client_cert_verifier(verifier)
        } else {
            builder.with_no_client_auth()
        };

        let (certs, key) = self.server_identity();
        builder.with_single_cert(certs, key).unwrap()
    }
}

/// HTTPS backend answering every request with `body`. Failed handshakes are
/// dropped silently.
pub async fn start_tls_backend(config: ServerConfig, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(tls) = acceptor.accept(stream).await else {
                    return;
                };
                let service = service_fn(move |_req: hyper::Request<Incoming>| async move {
                    Ok::<_, Infallible>(hyper::Response::new(Full::new(Bytes::from_static(
                        body.as_bytes(),
                    ))))
                });
                let _ = hyper::server::conn::http1::Builder::new()
                    .serve_connection(TokioIo::new(tls), service)
                    .await;
            });
        }
    });
    addr
}
