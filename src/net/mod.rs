//! Outbound network layer.
//!
//! # Data Flow
//! ```text
//! TlsOptions
//!     → tls.rs (CA trust, PKCS12 client identity, rustls config)
//!     → client.rs (pooled hyper client over hyper-rustls)
//!     → transport layer
//! ```
//!
//! # Design Decisions
//! - One client per process, shared by every request
//! - Connection target and SNI always come from the destination URL

pub mod client;
pub mod tls;

pub use client::{build_client, HttpsClient};
pub use tls::{TlsIdentity, TlsMaterial, TlsOptions};
