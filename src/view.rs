//! Render boundary: an immutable snapshot of what the widget shows.
//!
//! Presentation layers never read controller internals. They take a
//! [`SuggestionsView`] after each [`Effect::Render`](crate::Effect::Render)
//! and draw it however they like.

use scraper::Html;

use crate::controller::Autocomplete;
use crate::selection::Highlight;
use crate::types::Suggestion;

/// Snapshot of the widget for one render.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionsView {
    /// Current input text.
    pub query: String,
    /// Whether the suggestion list is shown at all.
    pub visible: bool,
    pub rows: Vec<RowView>,
    pub highlight: Highlight,
    /// The input hit the configured maximum length.
    pub max_length_warning: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub kind: RowKind,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    /// The "N matches for ..." row.
    Summary { label: String },
    Song {
        name: String,
        artist: Option<String>,
        image: Option<ImageView>,
        /// Lyric fragments with highlight markup.
        fragments: Vec<String>,
    },
    /// A plain-text completion; `html` carries highlight markup.
    Text { html: String },
}

/// Thumbnail source for a song row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageView {
    pub src: String,
    /// `src` is the placeholder while the real thumbnail preloads.
    pub placeholder: bool,
}

impl SuggestionsView {
    pub fn highlighted_row(&self) -> Option<&RowView> {
        self.rows.iter().find(|row| row.highlighted)
    }
}

impl Autocomplete {
    /// Snapshot the current state for rendering.
    pub fn view(&self) -> SuggestionsView {
        let highlight = self.highlight();
        let mut rows = Vec::new();

        if let Some(response) = self.suggestions() {
            if let Some(summary) = &response.search_suggestions {
                rows.push(RowView {
                    kind: RowKind::Summary {
                        label: summary.label(),
                    },
                    highlighted: highlight == Highlight::Summary,
                });
            }
            for (index, suggestion) in response.matches.iter().enumerate() {
                rows.push(RowView {
                    kind: self.row_kind(suggestion),
                    highlighted: highlight == Highlight::Suggestion(index),
                });
            }
        }

        SuggestionsView {
            query: self.query().to_owned(),
            visible: self.is_visible(),
            rows,
            highlight,
            max_length_warning: self.query().chars().count() >= self.config().max_length,
        }
    }

    fn row_kind(&self, suggestion: &Suggestion) -> RowKind {
        if !suggestion.is_song() {
            return RowKind::Text {
                html: suggestion
                    .html
                    .clone()
                    .unwrap_or_else(|| suggestion.text.clone()),
            };
        }
        let image = self.thumbnail_url(suggestion).map(|url| {
            if self.images().is_loaded(&url) {
                ImageView {
                    src: url,
                    placeholder: false,
                }
            } else {
                ImageView {
                    src: self.config().placeholder_image.clone(),
                    placeholder: true,
                }
            }
        });
        RowKind::Song {
            name: suggestion
                .name
                .clone()
                .unwrap_or_else(|| suggestion.text.clone()),
            artist: suggestion.artist.as_ref().map(|artist| artist.name.clone()),
            image,
            fragments: suggestion.fragments.clone(),
        }
    }
}

/// Strip markup from a highlighted fragment, keeping only its text.
pub fn plain_text(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
}
