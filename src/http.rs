//! Shared HTTP client for suggestion and thumbnail requests.

use std::time::Duration;

use crate::config::AutocompleteConfig;
use crate::error::AutocompleteError;

/// User-Agent sent when the embedding page does not supply one.
const DEFAULT_USER_AGENT: &str = concat!("songsearch-autocomplete/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for the suggestion service.
///
/// The client has:
/// - Timeout from config
/// - Custom User-Agent if configured, otherwise the crate's own
/// - Gzip and Brotli decompression
///
/// # Errors
///
/// Returns [`AutocompleteError::Http`] if the client cannot be constructed.
pub fn build_client(config: &AutocompleteConfig) -> Result<reqwest::Client, AutocompleteError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| AutocompleteError::Http(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_client_with_default_config() {
        assert!(build_client(&AutocompleteConfig::default()).is_ok());
    }

    #[test]
    fn build_client_with_custom_ua() {
        let config = AutocompleteConfig {
            user_agent: Some("CustomAgent/1.0".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn default_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("songsearch-autocomplete/"));
    }
}
