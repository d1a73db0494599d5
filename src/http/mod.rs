//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request tracing)
//!     → forward.rs (per-request pipeline)
//!     → headers.rs (outbound header policy)
//!     → transport layer
//!     → response relayed to the client
//! ```

pub mod forward;
pub mod headers;
pub mod server;

pub use forward::Forwarder;
pub use headers::HeaderPolicy;
pub use server::HttpServer;
