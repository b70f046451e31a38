//! Runtime settings, optionally loaded from a YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.
//!
//! ```yaml
//! concurrency_limit: 8
//! default_timeout_secs: 20
//! max_parse_errors: 500
//! listen: 0.0.0.0:8080
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// User-Agent sent with every fetch.
    pub user_agent: String,
    /// Maximum article fetches in flight during the batch stage.
    pub concurrency_limit: usize,
    /// Entries emitted when the request does not set `limit`.
    pub default_limit: usize,
    /// Per-fetch timeout when the request does not set `timeout`.
    pub default_timeout_secs: u64,
    /// Requested timeouts below this are replaced by `fallback_timeout_secs`.
    pub min_timeout_secs: u64,
    pub fallback_timeout_secs: u64,
    /// Redirect hops followed per fetch.
    pub max_redirects: usize,
    /// Article bodies larger than this count as failed fetches.
    pub max_body_bytes: usize,
    /// HTML parse-error budget before the regex fallback takes over.
    pub max_parse_errors: Option<usize>,
    /// Sort entries newest-first before truncating to the limit.
    pub order_by_date: bool,
    /// Socket address for `serve`.
    pub listen: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: format!("FullTextRSS/{}", env!("CARGO_PKG_VERSION")),
            concurrency_limit: 6,
            default_limit: 50,
            default_timeout_secs: 15,
            min_timeout_secs: 3,
            fallback_timeout_secs: 10,
            max_redirects: 3,
            max_body_bytes: 5 * 1024 * 1024,
            max_parse_errors: None,
            order_by_date: false,
            listen: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML text. Missing keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load settings from `path`, or defaults when no path is given.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_yaml(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(settings)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Batch concurrency, never below one.
    pub fn concurrency(&self) -> usize {
        self.concurrency_limit.max(1)
    }
}
