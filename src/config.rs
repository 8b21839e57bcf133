//! Runtime settings for fetching sources and reaching Space endpoints.

use serde::{Deserialize, Serialize};

/// Base URL Space repositories are served from.
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co/spaces";
/// Host suffix of the per-Space WebSocket endpoint.
pub const DEFAULT_WS_HOST: &str = "hf.space";
/// Repository branch source files are read from.
pub const DEFAULT_BRANCH: &str = "main";
/// Timeout applied to source downloads.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Where sources come from and where invocations go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the Space repositories (`HFSPACES_HUB_URL`).
    pub hub_url: String,
    /// WebSocket host suffix (`HFSPACES_WS_HOST`).
    pub ws_host: String,
    /// Branch to read sources from (`HFSPACES_BRANCH`).
    pub branch: String,
    /// Source download timeout in seconds (`HFSPACES_FETCH_TIMEOUT_SECS`).
    pub fetch_timeout_secs: Option<u64>,
}

impl Settings {
    /// Built-in defaults, ignoring the environment.
    pub fn builtin() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            ws_host: DEFAULT_WS_HOST.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            fetch_timeout_secs: Some(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Defaults overridden by any non-blank `HFSPACES_*` variables.
    pub fn from_env() -> Self {
        let builtin = Self::builtin();
        Self {
            hub_url: env_value("HFSPACES_HUB_URL").unwrap_or(builtin.hub_url),
            ws_host: env_value("HFSPACES_WS_HOST").unwrap_or(builtin.ws_host),
            branch: env_value("HFSPACES_BRANCH").unwrap_or(builtin.branch),
            fetch_timeout_secs: env_value("HFSPACES_FETCH_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .or(builtin.fetch_timeout_secs),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults() {
        let settings = Settings::builtin();
        assert_eq!(settings.hub_url, "https://huggingface.co/spaces");
        assert_eq!(settings.ws_host, "hf.space");
        assert_eq!(settings.branch, "main");
        assert_eq!(settings.fetch_timeout_secs, Some(10));
    }

    #[test]
    fn unset_variables_fall_back() {
        assert_eq!(env_value("HFSPACES_TEST_SURELY_UNSET_VARIABLE"), None);
    }
}
