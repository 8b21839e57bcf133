//! Small shared helpers.

/// Per-invocation session identifiers.
pub mod session_hash;

pub use session_hash::SessionHash;
