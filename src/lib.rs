//! hfspaces – schema inference and remote invocation for hosted Gradio Spaces
//!
//! This crate:
//! - Fetches a Space's application source and parses it into a syntax tree
//! - Finds the interfaces and event bindings the application registers
//! - Reconstructs the ordered input schema of every remote function
//! - Invokes a function through the Space's queue WebSocket

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Python source analysis: parsing, search, resolution and schemas
pub mod analyzer;
/// Queue protocol client
pub mod client;
/// Settings and their environment overrides
pub mod config;
/// Crate-level error type
pub mod error;
/// Application model of a Space
pub mod space;
/// Shared helpers
pub mod util;

// Re-export key types for convenience
pub use analyzer::{ComponentDescriptor, InvocationSchema};
pub use client::{ClientError, invoke};
pub use config::Settings;
pub use error::{Error, Result};
pub use space::ApplicationModel;

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
