//! Configuration loading.
//!
//! Reads the optional TOML file and runs the startup pipeline that turns
//! [`Parameters`] into an immutable [`ProxyConfig`].

use std::fs;
use std::path::Path;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::destination::Destination;
use crate::config::error::{ConfigError, ConfigErrors};
use crate::config::schema::Parameters;
use crate::http::headers::{basic_auth, HeaderPolicy};
use crate::net::TlsIdentity;
use crate::rewrite::{RegexPathRewriter, RewriteSet};

/// Fully loaded, immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    listen: String,
    destination: Destination,
    rewrites: RewriteSet,
    headers: HeaderPolicy,
    tls: TlsIdentity,
    verbose: bool,
    dump_body: bool,
}

impl ProxyConfig {
    pub fn listen(&self) -> &str {
        &self.listen
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn rewrites(&self) -> &RewriteSet {
        &self.rewrites
    }

    pub fn headers(&self) -> &HeaderPolicy {
        &self.headers
    }

    pub fn tls(&self) -> &TlsIdentity {
        &self.tls
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn dump_body(&self) -> bool {
        self.dump_body
    }
}

/// Load parameters from a TOML file.
pub fn load_parameters(path: &Path) -> Result<Parameters, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Parameters {
    /// Runs every loader and collects all of their errors.
    pub fn load(&self) -> Result<ProxyConfig, ConfigErrors> {
        let mut errors = ConfigErrors::new();

        let destination = errors.absorb(self.load_destination());
        let rewrites = errors.absorb(self.load_rewrites());
        let headers = errors.absorb(self.load_headers());
        let tls = errors.absorb(TlsIdentity::load(&self.tls.options()));

        match (destination, rewrites, headers, tls) {
            (Some(destination), Some(rewrites), Some(headers), Some(tls)) if errors.is_empty() => {
                Ok(ProxyConfig {
                    listen: self.listen.clone(),
                    destination,
                    rewrites,
                    headers,
                    tls,
                    verbose: self.verbose,
                    dump_body: self.dump_body,
                })
            }
            _ => Err(errors),
        }
    }

    fn load_destination(&self) -> Result<Destination, ConfigError> {
        match self.destination.as_deref() {
            Some(raw) if !raw.is_empty() => Destination::parse(raw),
            _ => Err(ConfigError::MissingDestination),
        }
    }

    fn load_rewrites(&self) -> Result<RewriteSet, ConfigErrors> {
        let mut errors = ConfigErrors::new();
        let mut set = RewriteSet::new();
        for rule in &self.rewrite {
            if let Some(rewriter) =
                errors.absorb(RegexPathRewriter::new(&rule.pattern, rule.replacement.as_str()))
            {
                set.push(rewriter);
            }
        }
        errors.into_result().map(|()| set)
    }

    fn load_headers(&self) -> Result<HeaderPolicy, ConfigErrors> {
        let mut errors = ConfigErrors::new();
        let mut configured = HeaderMap::with_capacity(self.header.len());
        for entry in &self.header {
            if let Some((name, value)) = errors.absorb(parse_header(&entry.name, &entry.value)) {
                configured.append(name, value);
            }
        }

        let credentials = match self.username.as_deref().filter(|u| !u.is_empty()) {
            Some(username) => {
                let password = self.password.as_deref().unwrap_or("");
                errors.absorb(basic_auth(username, password).map_err(|e| {
                    ConfigError::InvalidHeader {
                        name: "Authorization".into(),
                        reason: e.to_string(),
                    }
                }))
            }
            None => None,
        };

        errors
            .into_result()
            .map(|()| HeaderPolicy::new(configured, credentials))
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidHeader {
        name: name.to_string(),
        reason,
    };
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    Ok((header_name, header_value))
}
