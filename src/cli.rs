//! Command-line interface.
//!
//! Flags are layered on top of the optional TOML file: scalars override
//! it, rewrite rules and headers are appended after the file's entries.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, ConfigErrors, HeaderEntry, Parameters, RewriteRule};

#[derive(Debug, Parser)]
#[command(name = "hfwd")]
#[command(about = "A simple HTTP forward proxy for a single destination", long_about = None)]
pub struct Cli {
    /// Destination base URL, http[s]://[user:pass@]host[:port][/base]
    pub destination: Option<String>,

    /// Address to listen on
    #[arg(short, long)]
    pub listen: Option<String>,

    /// TOML configuration file, loaded before the flags are applied
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Username for the basic authentication
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password for the basic authentication
    #[arg(short, long)]
    pub password: Option<String>,

    /// Path rewrite rule (-r /old:/new -r /o:/n OR -r /old:/new,/o:/n)
    #[arg(short, long, value_delimiter = ',')]
    pub rewrite: Vec<String>,

    /// Additional header (-H Host:example.com -H 'User-Agent: My Agent')
    #[arg(short = 'H', long)]
    pub header: Vec<String>,

    /// Path of the PEM encoded CA certificate
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Path of the PKCS12 encoded file for the client certificate
    #[arg(long)]
    pub pkcs12: Option<PathBuf>,

    /// Password for the PKCS12 file
    #[arg(long, env = "HFWD_PKCS12_PASSWORD", hide_env_values = true)]
    pub pkcs12_password: Option<String>,

    /// Dump every request and response
    #[arg(short, long)]
    pub verbose: bool,

    /// Include response bodies in dumps
    #[arg(long)]
    pub dump_body: bool,
}

impl Cli {
    /// Applies the flags on top of `params`, reporting every malformed
    /// rewrite or header flag.
    pub fn apply(&self, params: &mut Parameters) -> Result<(), ConfigErrors> {
        let mut errors = ConfigErrors::new();

        if let Some(destination) = &self.destination {
            params.destination = Some(destination.clone());
        }
        if let Some(listen) = &self.listen {
            params.listen = listen.clone();
        }
        if let Some(username) = &self.username {
            params.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            params.password = Some(password.clone());
        }

        for raw in &self.rewrite {
            if let Some(rule) = errors.absorb(parse_rewrite(raw)) {
                params.rewrite.push(rule);
            }
        }
        for raw in &self.header {
            if let Some(entry) = errors.absorb(parse_header(raw)) {
                params.header.push(entry);
            }
        }

        if let Some(path) = &self.ca_cert {
            params.tls.ca_cert = Some(path.clone());
        }
        if let Some(path) = &self.pkcs12 {
            params.tls.pkcs12 = Some(path.clone());
        }
        if let Some(password) = &self.pkcs12_password {
            params.tls.pkcs12_password = Some(password.clone());
        }
        params.verbose |= self.verbose;
        params.dump_body |= self.dump_body;

        errors.into_result()
    }
}

/// Parses `PATTERN:REPLACEMENT`, split at the first `:`.
pub fn parse_rewrite(raw: &str) -> Result<RewriteRule, ConfigError> {
    let (pattern, replacement) = raw.split_once(':').ok_or_else(|| ConfigError::MalformedFlag {
        flag: "rewrite",
        value: raw.to_string(),
        expected: "PATTERN:REPLACEMENT",
    })?;
    Ok(RewriteRule {
        pattern: pattern.to_string(),
        replacement: replacement.to_string(),
    })
}

/// Parses `Name:Value`, split at the first `:`, both sides trimmed.
pub fn parse_header(raw: &str) -> Result<HeaderEntry, ConfigError> {
    let malformed = || ConfigError::MalformedFlag {
        flag: "header",
        value: raw.to_string(),
        expected: "Name:Value",
    };
    let (name, value) = raw.split_once(':').ok_or_else(malformed)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(malformed());
    }
    Ok(HeaderEntry {
        name: name.to_string(),
        value: value.trim().to_string(),
    })
}
