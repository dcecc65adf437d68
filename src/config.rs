//! Widget configuration with the timings the song search widget ships with.
//!
//! [`AutocompleteConfig`] controls where suggestions come from, how eagerly
//! they are requested while typing, and how long the deferred UI timers
//! wait. It is supplied by the embedding page and never read from the
//! environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AutocompleteError, Result};

/// Configuration for one autocomplete widget instance.
///
/// Use [`Default::default()`] for the production values, or load a TOML
/// file with [`AutocompleteConfig::from_file`]. Missing keys fall back to
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutocompleteConfig {
    /// Origin of the search site. Suggestions are fetched from here and
    /// full searches navigate here.
    pub server: String,
    /// Path of the suggestion endpoint, joined onto `server`.
    pub endpoint_path: String,
    /// Minimum interval between throttled requests (short or word-complete queries).
    pub throttle_ms: u64,
    /// Debounce delay for medium-length queries.
    pub short_debounce_ms: u64,
    /// Debounce delay for long queries.
    pub long_debounce_ms: u64,
    /// Queries shorter than this many characters are throttled, not debounced.
    pub short_query_chars: usize,
    /// Queries longer than this many characters use the long debounce.
    /// Word-complete queries below it are throttled.
    pub long_query_chars: usize,
    /// Grace period after blur before the list is hidden, so clicks land.
    pub blur_grace_ms: u64,
    /// How long fetches stay suppressed after a navigation in case the page
    /// never unloads.
    pub redirect_reset_ms: u64,
    /// HTTP timeout for suggestion and thumbnail requests.
    pub timeout_seconds: u64,
    /// Input length at which the maxlength warning is shown.
    pub max_length: usize,
    /// Maximum cached responses. 0 keeps every response for the widget's lifetime.
    pub cache_max_entries: u64,
    /// Seconds a cached response stays valid. 0 never expires.
    pub cache_ttl_seconds: u64,
    /// Thumbnail shown while the real image is still loading.
    pub placeholder_image: String,
    /// Custom User-Agent string for outgoing requests.
    pub user_agent: Option<String>,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            server: "https://songsear.ch".into(),
            endpoint_path: "/api/search/autocomplete".into(),
            throttle_ms: 1100,
            short_debounce_ms: 800,
            long_debounce_ms: 1800,
            short_query_chars: 4,
            long_query_chars: 24,
            blur_grace_ms: 300,
            redirect_reset_ms: 3000,
            timeout_seconds: 5,
            max_length: 150,
            cache_max_entries: 0,
            cache_ttl_seconds: 0,
            placeholder_image: "/static/placeholder.png".into(),
            user_agent: None,
        }
    }
}

impl AutocompleteConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`AutocompleteError::Config`] if the TOML is malformed.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AutocompleteError::Config(e.to_string()))
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `server` is an absolute `http`/`https` URL
    /// - `throttle_ms` and `timeout_seconds` are greater than 0
    /// - `short_query_chars` is below `long_query_chars`
    /// - `max_length` is greater than 0
    pub fn validate(&self) -> Result<()> {
        self.server_url()?;
        if self.throttle_ms == 0 {
            return Err(AutocompleteError::Config(
                "throttle_ms must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(AutocompleteError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.short_query_chars >= self.long_query_chars {
            return Err(AutocompleteError::Config(
                "short_query_chars must be less than long_query_chars".into(),
            ));
        }
        if self.max_length == 0 {
            return Err(AutocompleteError::Config(
                "max_length must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// The parsed search-site origin.
    ///
    /// # Errors
    ///
    /// Returns [`AutocompleteError::Config`] if `server` is not an absolute
    /// `http` or `https` URL.
    pub fn server_url(&self) -> Result<Url> {
        let url = Url::parse(&self.server)
            .map_err(|e| AutocompleteError::Config(format!("invalid server URL: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(AutocompleteError::Config(format!(
                "server URL must be http or https, got {other}"
            ))),
        }
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn short_debounce(&self) -> Duration {
        Duration::from_millis(self.short_debounce_ms)
    }

    pub fn long_debounce(&self) -> Duration {
        Duration::from_millis(self.long_debounce_ms)
    }

    pub fn blur_grace(&self) -> Duration {
        Duration::from_millis(self.blur_grace_ms)
    }

    pub fn redirect_reset(&self) -> Duration {
        Duration::from_millis(self.redirect_reset_ms)
    }
}
