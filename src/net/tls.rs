//! Outbound TLS client identity.
//!
//! # Responsibilities
//! - Read an extra CA certificate to trust alongside the system store
//! - Decode a PKCS12 bundle into a PEM client certificate and key
//! - Build the rustls client configuration shared by every connection
//!
//! # Data Flow
//! ```text
//! TlsOptions
//!     → load_ca_cert  (ca_cert_pem)
//!     → load_pkcs12   (client_cert_pem, client_key_pem)
//!     → build_client_config (system roots + CA, optional client auth)
//!     → TlsIdentity (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Steps run in a fixed order and the first failure aborts the rest
//! - Every step is skipped when its input is not configured
//! - An unavailable system store degrades to an empty one with a warning
//! - Only RSA and EC client keys are accepted

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use p12_keystore::KeyStore;
use pkcs8::{ObjectIdentifier, PrivateKeyInfo};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};

use crate::config::error::ConfigError;

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// Paths and secrets for the outbound TLS identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// PEM file with one or more CA certificates to trust.
    pub ca_cert: Option<PathBuf>,
    /// PKCS12 bundle holding the client certificate and key.
    pub pkcs12: Option<PathBuf>,
    /// Password protecting the PKCS12 bundle.
    pub pkcs12_password: String,
}

impl fmt::Display for TlsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ca_cert: {}, pkcs12: {}, pkcs12_password: {}",
            display_path(&self.ca_cert),
            display_path(&self.pkcs12),
            "*".repeat(self.pkcs12_password.chars().count()),
        )
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

/// Decoded intermediate artifacts.
#[derive(Clone, Default)]
pub struct TlsMaterial {
    pub ca_cert_pem: Option<Vec<u8>>,
    pub client_cert_pem: Option<String>,
    pub client_key_pem: Option<String>,
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca_cert_pem", &self.ca_cert_pem.as_ref().map(Vec::len))
            .field("client_cert_pem", &self.client_cert_pem.is_some())
            .field("client_key_pem", &self.client_key_pem.as_ref().map(|_| "<KEY>"))
            .finish()
    }
}

/// Ready-to-use outbound TLS configuration.
#[derive(Debug, Clone)]
pub struct TlsIdentity {
    material: TlsMaterial,
    config: Arc<ClientConfig>,
}

impl TlsIdentity {
    pub fn load(options: &TlsOptions) -> Result<Self, ConfigError> {
        let mut material = TlsMaterial::default();
        load_ca_cert(options, &mut material)?;
        load_pkcs12(options, &mut material)?;
        let config = build_client_config(options, &material)?;

        tracing::debug!(
            ca_cert = material.ca_cert_pem.is_some(),
            client_cert = material.client_cert_pem.is_some(),
            "TLS client identity loaded"
        );

        Ok(Self {
            material,
            config: Arc::new(config),
        })
    }

    pub fn material(&self) -> &TlsMaterial {
        &self.material
    }

    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.config.clone()
    }

    pub fn has_client_certificate(&self) -> bool {
        self.material.client_cert_pem.is_some() && self.material.client_key_pem.is_some()
    }
}

fn load_ca_cert(options: &TlsOptions, material: &mut TlsMaterial) -> Result<(), ConfigError> {
    let Some(path) = &options.ca_cert else {
        return Ok(());
    };
    let pem = fs::read(path).map_err(|source| ConfigError::CaCertUnreadable {
        path: path.clone(),
        source,
    })?;
    material.ca_cert_pem = Some(pem);
    Ok(())
}

fn load_pkcs12(options: &TlsOptions, material: &mut TlsMaterial) -> Result<(), ConfigError> {
    let Some(path) = &options.pkcs12 else {
        return Ok(());
    };
    let data = fs::read(path).map_err(|source| ConfigError::Pkcs12Unreadable {
        path: path.clone(),
        source,
    })?;

    let keystore = KeyStore::from_pkcs12(&data, &options.pkcs12_password)
        .map_err(|e| pkcs12_decode(path, e.to_string()))?;
    let (_, chain) = keystore
        .private_key_chain()
        .ok_or_else(|| pkcs12_decode(path, "no private key entry".into()))?;
    let leaf = chain
        .chain()
        .first()
        .ok_or_else(|| pkcs12_decode(path, "no certificate for the private key".into()))?;

    let key_info = PrivateKeyInfo::try_from(chain.key())
        .map_err(|e| pkcs12_decode(path, e.to_string()))?;
    let algorithm = key_info.algorithm.oid;
    if algorithm != RSA_ENCRYPTION && algorithm != EC_PUBLIC_KEY {
        return Err(ConfigError::UnsupportedKeyType { path: path.clone() });
    }

    material.client_cert_pem = Some(pem::encode(&pem::Pem::new(
        "CERTIFICATE",
        leaf.as_der().to_vec(),
    )));
    material.client_key_pem = Some(pem::encode(&pem::Pem::new(
        "PRIVATE KEY",
        chain.key().to_vec(),
    )));
    Ok(())
}

fn pkcs12_decode(path: &Path, reason: String) -> ConfigError {
    ConfigError::Pkcs12Decode {
        path: path.to_path_buf(),
        reason,
    }
}

fn build_client_config(
    options: &TlsOptions,
    material: &TlsMaterial,
) -> Result<ClientConfig, ConfigError> {
    let mut roots = system_roots();
    if let Some(pem) = &material.ca_cert_pem {
        let path = options.ca_cert.clone().unwrap_or_default();
        append_ca_pem(&mut roots, pem, path)?;
    }

    let builder = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots);

    match (&material.client_cert_pem, &material.client_key_pem) {
        (Some(cert_pem), Some(key_pem)) => {
            let (certs, key) = parse_client_identity(cert_pem, key_pem)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| ConfigError::ClientCertificate(e.to_string()))
        }
        _ => Ok(builder.with_no_client_auth()),
    }
}

fn system_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        tracing::warn!(error = %error, "Failed to load part of the system trust store");
    }
    if native.certs.is_empty() {
        tracing::warn!("System trust store unavailable, starting from an empty pool");
        return roots;
    }

    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    tracing::debug!(added, ignored, "System trust store loaded");
    roots
}

fn append_ca_pem(roots: &mut RootCertStore, pem: &[u8], path: PathBuf) -> Result<(), ConfigError> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::CaCertAppend {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    if certs.is_empty() {
        return Err(ConfigError::CaCertAppend {
            path,
            reason: "no PEM certificates found".into(),
        });
    }

    for cert in certs {
        roots.add(cert).map_err(|e| ConfigError::CaCertAppend {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn parse_client_identity(
    cert_pem: &str,
    key_pem: &str,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ConfigError> {
    let certs = rustls_pemfile::certs(&mut cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::ClientCertificate(e.to_string()))?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_bytes())
        .map_err(|e| ConfigError::ClientCertificate(e.to_string()))?
        .ok_or_else(|| ConfigError::ClientCertificate("no private key found".into()))?;
    Ok((certs, key))
}
