//! URL construction for suggestion requests and page navigations.

use url::Url;

use crate::error::Result;
use crate::types::Trigger;

/// Build the suggestion endpoint URL: `{server}{path}?q=<query>`.
///
/// # Errors
///
/// Returns [`crate::AutocompleteError::Url`] if `path` cannot be joined onto `server`.
pub fn suggest_url(server: &Url, path: &str, query: &str) -> Result<Url> {
    let mut url = server.join(path)?;
    url.query_pairs_mut().clear().append_pair("q", query);
    Ok(url)
}

/// Build the full-search page URL: `{server}/q/<query>?autocomplete=<trigger>`.
///
/// The query is trimmed and percent-encoded as a single path segment.
///
/// # Examples
///
/// ```
/// use songsearch_autocomplete::navigation::full_search_url;
/// use songsearch_autocomplete::Trigger;
/// use url::Url;
///
/// let server = Url::parse("https://songsear.ch").unwrap();
/// let url = full_search_url(&server, " hello world ", Trigger::Enter).unwrap();
/// assert_eq!(url.as_str(), "https://songsear.ch/q/hello%20world?autocomplete=enter");
/// ```
///
/// # Errors
///
/// Returns [`crate::AutocompleteError::Url`] if the joined URL is invalid.
pub fn full_search_url(server: &Url, query: &str, trigger: Trigger) -> Result<Url> {
    let path = format!("/q/{}", urlencoding::encode(query.trim()));
    let mut url = server.join(&path)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("autocomplete", trigger.as_str());
    Ok(url)
}

/// Resolve a suggestion's destination against the search-site origin.
///
/// Absolute URLs are returned as-is; root-relative (and protocol-relative)
/// URLs are resolved against `server`.
///
/// # Errors
///
/// Returns [`crate::AutocompleteError::Url`] if `raw` cannot be resolved.
pub fn absolutize(server: &Url, raw: &str) -> Result<Url> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(server.join(raw)?),
        Err(e) => Err(e.into()),
    }
}
