//! Pluggable suggestion backends.
//!
//! The widget only needs one thing from the outside world: given a query,
//! a ranked list of suggestions. [`SuggestionSource`] is that seam;
//! [`HttpSuggestionSource`] talks to the real search service.

use url::Url;

use crate::config::AutocompleteConfig;
use crate::error::{AutocompleteError, Result};
use crate::http;
use crate::navigation::suggest_url;
use crate::types::AutocompleteResponse;

/// A backend that turns a query into suggestions.
///
/// Implementations must be `Send + Sync` so requests can run as
/// independent tasks. They do no caching and no staleness checking; the
/// controller handles both.
pub trait SuggestionSource: Send + Sync {
    /// Fetch suggestions for a trimmed query.
    ///
    /// # Errors
    ///
    /// Returns [`AutocompleteError::Http`] on transport failure or a
    /// non-success status, and [`AutocompleteError::Parse`] if the body is
    /// not the expected JSON shape.
    fn fetch(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<AutocompleteResponse>> + Send;
}

/// `GET {server}/api/search/autocomplete?q=<query>` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSuggestionSource {
    client: reqwest::Client,
    server: Url,
    endpoint_path: String,
}

impl HttpSuggestionSource {
    /// # Errors
    ///
    /// Returns [`AutocompleteError::Config`] if the server URL is invalid,
    /// or [`AutocompleteError::Http`] if the client cannot be built.
    pub fn new(config: &AutocompleteConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config)?,
            server: config.server_url()?,
            endpoint_path: config.endpoint_path.clone(),
        })
    }

    /// Reuse an existing client, e.g. one shared with the thumbnail loader.
    ///
    /// # Errors
    ///
    /// Returns [`AutocompleteError::Config`] if the server URL is invalid.
    pub fn with_client(config: &AutocompleteConfig, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            client,
            server: config.server_url()?,
            endpoint_path: config.endpoint_path.clone(),
        })
    }
}

impl SuggestionSource for HttpSuggestionSource {
    async fn fetch(&self, query: &str) -> Result<AutocompleteResponse> {
        tracing::trace!(query, "fetching suggestions");
        let url = suggest_url(&self.server, &self.endpoint_path, query)?;

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AutocompleteError::Http(format!("suggestion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AutocompleteError::Http(format!(
                "suggestion service returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AutocompleteError::Http(format!("suggestion response read failed: {e}")))?;
        tracing::trace!(bytes = body.len(), "suggestion response received");

        parse_response(&body)
    }
}

/// Decode a suggestion service body.
///
/// # Errors
///
/// Returns [`AutocompleteError::Parse`] if `body` is not valid response JSON.
pub fn parse_response(body: &str) -> Result<AutocompleteResponse> {
    serde_json::from_str(body)
        .map_err(|e| AutocompleteError::Parse(format!("unexpected suggestion JSON: {e}")))
}
