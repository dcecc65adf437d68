//! Wire types returned by the suggestion service.
//!
//! These are consumed, never produced, by the widget. The client wraps them
//! with local UI state but must not change their content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single suggestion row: either a song or a plain-text completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Song identity. Absent for plain-text suggestions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display text; what replaces (or extends) the query when chosen.
    pub text: String,
    /// Extend the last word of the current query rather than replacing it.
    #[serde(default)]
    pub append: bool,
    /// Direct destination. Root-relative URLs resolve against the server.
    #[serde(default, rename = "_url", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Song name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<Artist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<SuggestionImage>,
    /// Highlighted lyric fragments (HTML).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fragments: Vec<String>,
    /// Pre-rendered markup for plain-text suggestions (HTML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl Suggestion {
    /// Returns `true` for song suggestions, `false` for plain-text ones.
    pub fn is_song(&self) -> bool {
        self.id.is_some() || self.name.is_some()
    }

    /// The thumbnail to show for this row, preferring the 100px variant.
    pub fn thumbnail(&self) -> Option<&str> {
        let image = self.image.as_ref()?;
        image
            .thumbnail100
            .as_deref()
            .or(image.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SuggestionImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail100: Option<String>,
}

/// Aggregate "N results" row for the full search term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSuggestionSummary {
    pub term: String,
    pub total: u64,
    /// The count stopped at a server-side cap.
    #[serde(default)]
    pub capped: bool,
    /// The count is a rough approximation.
    #[serde(default)]
    pub desperate: bool,
}

impl SearchSuggestionSummary {
    /// Human-readable text for the summary row.
    pub fn label(&self) -> String {
        let noun = if self.total == 1 { "match" } else { "matches" };
        if self.capped {
            format!("More than {} {noun} for \"{}\"", self.total, self.term)
        } else if self.desperate {
            format!("About {} {noun} for \"{}\"", self.total, self.term)
        } else {
            format!("{} {noun} for \"{}\"", self.total, self.term)
        }
    }
}

/// Body of a successful `GET /api/search/autocomplete` response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    #[serde(default)]
    pub matches: Vec<Suggestion>,
    #[serde(default)]
    pub search_suggestions: Option<SearchSuggestionSummary>,
}

impl AutocompleteResponse {
    /// Number of selectable rows, counting the summary row if present.
    pub fn row_count(&self) -> usize {
        self.matches.len() + usize::from(self.search_suggestions.is_some())
    }
}

/// How a full-search navigation was triggered, reported to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Enter pressed in the input.
    Enter,
    /// The search icon was clicked.
    Search,
    /// A suggestion or summary row was clicked.
    Clicked,
    /// Tab accepted the summary row.
    Tab,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Search => "search",
            Self::Clicked => "clicked",
            Self::Tab => "tab",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
