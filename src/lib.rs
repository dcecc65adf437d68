//! Songsearch autocomplete: a headless search-as-you-type controller.
//!
//! The crate drives the song search box: it decides when to ask the
//! suggestion service for matches, keeps out-of-order answers from
//! clobbering newer ones, tracks the keyboard highlight, and turns a
//! selection into a navigation.
//!
//! # Architecture
//!
//! - **Scheduler**: throttles short queries, debounces long ones
//! - **Cache**: per-widget memo of responses keyed by trimmed query
//! - **Controller**: the state machine; pure, time injected, returns effects
//! - **Source**: the suggestion service behind a trait (`reqwest` by default)
//! - **Images**: off-screen thumbnail preloads with abandonable tickets
//! - **Driver**: a `tokio` task that performs the controller's effects
//!
//! Rendering is left to the host: every change yields a [`SuggestionsView`].

pub mod cache;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod http;
pub mod images;
pub mod navigation;
pub mod scheduler;
pub mod selection;
pub mod source;
pub mod types;
pub mod view;

pub use cache::{CachePolicy, SuggestionCache};
pub use config::AutocompleteConfig;
pub use controller::{Autocomplete, Effect, Key, KeyOutcome, Lifecycle};
pub use driver::{AutocompleteDriver, WidgetEvent, WidgetOutput};
pub use error::{AutocompleteError, Result};
pub use images::{HttpImageMaterializer, ImageMaterializer, PreloadTicket};
pub use selection::Highlight;
pub use source::{HttpSuggestionSource, SuggestionSource};
pub use types::{AutocompleteResponse, SearchSuggestionSummary, Suggestion, Trigger};
pub use view::{RowKind, RowView, SuggestionsView};
