//! hfwd: a single-destination HTTP/HTTPS forward proxy library.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod rewrite;
pub mod transport;

pub use config::{Parameters, ProxyConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
