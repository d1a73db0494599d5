//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file (optional) + command-line flags
//!     → schema.rs (Parameters, raw and unvalidated)
//!     → loader.rs (Parameters::load pipeline)
//!         → destination.rs
//!         → rewrite rules
//!         → header policy
//!         → TLS identity
//!     → ProxyConfig (immutable, shared with the server)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Independent loaders run even after one fails, so every error is
//!   reported in a single pass

pub mod destination;
pub mod error;
pub mod loader;
pub mod schema;

pub use destination::Destination;
pub use error::{ConfigError, ConfigErrors};
pub use loader::{load_parameters, ProxyConfig};
pub use schema::{HeaderEntry, Parameters, RewriteRule, TlsParameters};
