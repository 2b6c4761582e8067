//! Source configuration with sensible defaults.
//!
//! [`SourceConfig`] controls where the catalog lives, request timeouts and
//! how long the unit directory is cached. Defaults target the Vanderbilt
//! Campus Dining instance.

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Default NetNutrition instance.
pub const DEFAULT_BASE_URL: &str = "https://netnutrition.cbord.com/nn-prod/vucampusdining";

/// Configuration for a [`crate::NetNutritionSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Root URL of the NetNutrition instance, without a trailing slash.
    pub base_url: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// How long the unit name → oid directory is cached, in seconds.
    pub unit_cache_ttl_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_seconds: 15,
            user_agent: None,
            unit_cache_ttl_seconds: 24 * 3600,
        }
    }
}

impl SourceConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.base_url.trim().is_empty() {
            return Err(SourceError::Config("base_url must not be empty".into()));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(SourceError::Config(format!(
                "base_url is not a valid URL: {}",
                self.base_url
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(SourceError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Build the absolute URL for an endpoint path such as `Unit/GetHoursOfOperationMarkup`.
    pub fn endpoint(&self, path: &str) -> Result<url::Url, SourceError> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        url::Url::parse(&base)
            .and_then(|u| u.join(path.trim_start_matches('/')))
            .map_err(|e| SourceError::Config(format!("invalid endpoint {path}: {e}")))
    }
}
