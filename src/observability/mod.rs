//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured fields)
//!     → hfwd::dump target (diagnostic round-trip dumps, verbose only)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, filtered by RUST_LOG)
//! ```

pub mod logging;

pub use logging::init;
