//! Retrieval of application source, over HTTP from the hub or from a local
//! checkout.

use reqwest::blocking::Client;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Settings;

/// Errors raised while retrieving application source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Failed to construct HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request failed before a response arrived.
    #[error("Request to {url} failed: {source}")]
    Http {
        /// Requested URL.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// Status code received.
        status: u16,
    },

    /// A local source file could not be read.
    #[error("Failed to read {path:?}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Supplies the source text of a Space application file.
pub trait SourceFetcher {
    /// Source of `path` in the Space `owner/application`.
    fn fetch(&self, owner: &str, application: &str, path: &str) -> Result<String, FetchError>;
}

/// Downloads raw files from the Space repository over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    hub_url: String,
    branch: String,
}

impl HttpFetcher {
    /// Fetcher configured from `settings`.
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.fetch_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self {
            client,
            hub_url: settings.hub_url.trim_end_matches('/').to_string(),
            branch: settings.branch.clone(),
        })
    }

    /// Raw download URL for a file of a Space.
    pub fn source_url(&self, owner: &str, application: &str, path: &str) -> String {
        format!(
            "{}/{owner}/{application}/raw/{}/{}",
            self.hub_url,
            self.branch,
            path.trim_start_matches('/')
        )
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, owner: &str, application: &str, path: &str) -> Result<String, FetchError> {
        let url = self.source_url(owner, application, path);
        debug!(%url, "fetching application source");

        let response = match self.client.get(&url).send() {
            Ok(response) => response,
            Err(source) => return Err(FetchError::Http { url, source }),
        };
        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        response
            .text()
            .map_err(|source| FetchError::Http { url, source })
    }
}

/// Reads application files from a local directory laid out like the Space
/// repository.
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    root: PathBuf,
}

impl LocalFetcher {
    /// Fetcher rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory files are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SourceFetcher for LocalFetcher {
    fn fetch(&self, owner: &str, application: &str, path: &str) -> Result<String, FetchError> {
        let file = self.root.join(path.trim_start_matches('/'));
        debug!(owner, application, path = ?file, "reading local application source");
        std::fs::read_to_string(&file).map_err(|source| FetchError::Io { path: file, source })
    }
}
