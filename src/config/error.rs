//! Configuration errors.
//!
//! Every error here is fatal and only produced during startup. Independent
//! failures are collected into [`ConfigErrors`] so that one run reports all
//! of them at once.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A single configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: no destination URL given")]
    MissingDestination,

    #[error("config: failed to parse the destination {input:?}: {source}")]
    DestinationParse {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("config: unsupported destination scheme {0:?} (must be http or https)")]
    DestinationScheme(String),

    #[error("config: the destination must not contain {component}: {url}")]
    DestinationComponent { component: &'static str, url: String },

    #[error("config: failed to interpret the rewrite pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("config: malformed {flag} {value:?} (expected {expected})")]
    MalformedFlag {
        flag: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("config: invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("config: failed to read the CA certificate {path:?}: {source}")]
    CaCertUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config: failed to append the CA certificate {path:?}: {reason}")]
    CaCertAppend { path: PathBuf, reason: String },

    #[error("config: failed to read the PKCS12 file {path:?}: {source}")]
    Pkcs12Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config: failed to decode the PKCS12 file {path:?}: {reason}")]
    Pkcs12Decode { path: PathBuf, reason: String },

    #[error("config: unsupported private key type in {path:?} (must be RSA or EC)")]
    UnsupportedKeyType { path: PathBuf },

    #[error("config: failed to use the client certificate: {0}")]
    ClientCertificate(String),

    #[error("config: failed to build the TLS client configuration: {0}")]
    Tls(#[from] rustls::Error),

    #[error("config: failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config: failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Ordered collection of configuration failures.
///
/// Displays one error per line.
#[derive(Debug, Default)]
pub struct ConfigErrors {
    errors: Vec<ConfigError>,
}

impl ConfigErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ConfigError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ConfigErrors) {
        self.errors.extend(other.errors);
    }

    /// Records the error of `result`, if any, and hands back the success value.
    pub fn absorb<T, E>(&mut self, result: Result<T, E>) -> Option<T>
    where
        E: Into<ConfigErrors>,
    {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.extend(e.into());
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), ConfigErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ConfigError> for ConfigErrors {
    fn from(error: ConfigError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}
