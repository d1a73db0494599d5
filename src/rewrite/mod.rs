//! Request URL rewriting.
//!
//! # Data Flow
//! ```text
//! inbound URL
//!     → set.rs (ordered rules, first change wins)
//!     → path.rs (regex substitution on the path)
//!     → compose.rs (graft onto the fixed destination)
//!     → outbound URL
//! ```
//!
//! # Design Decisions
//! - Rules are an ordered list; evaluation order is configuration order
//! - At most one rule fires per request
//! - Strategies only see the URL they rewrite, through [`Rewrite`]

pub mod compose;
pub mod path;
pub mod set;

use url::Url;

pub use compose::compose;
pub use path::RegexPathRewriter;
pub use set::RewriteSet;

/// A URL rewriting strategy.
pub trait Rewrite: Send + Sync + std::fmt::Debug {
    /// Rewrites `url` in place. Returns true only if the URL changed.
    fn apply(&self, url: &mut Url) -> bool;
}
