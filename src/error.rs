//! Crate-level error aggregating the per-subsystem errors.

use thiserror::Error;

use crate::analyzer::AnalyzerError;
use crate::client::ClientError;
use crate::space::FetchError;

/// Convenience result alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Source retrieval errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parsing and analysis errors
    #[error("Analysis error: {0}")]
    Analyzer(#[from] AnalyzerError),

    /// Invocation errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}
