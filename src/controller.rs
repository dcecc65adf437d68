//! The autocomplete widget state machine.
//!
//! [`Autocomplete`] owns every piece of per-widget state and reacts to
//! input events. It performs no I/O: each handler returns the
//! [`Effect`]s the embedding runtime must carry out (send a request, start
//! a thumbnail preload, navigate, re-render). Completions come back in
//! through [`Autocomplete::on_response`] and friends, and timers are driven
//! by polling [`Autocomplete::next_deadline`] and calling
//! [`Autocomplete::on_tick`].
//!
//! # Ordering
//!
//! Requests are never cancelled. A response for query `q` is applied only
//! if `q` starts with the most recently issued query and the current input
//! still starts with `q`; anything else is stale and dropped.
//!
//! ```text
//!            input (non-empty)            response / cache hit
//!   ┌──────┐ ───────────────► ┌─────────┐ ◄───────────────┐
//!   │ Idle │                  │ Waiting │                 │
//!   └──▲───┘ ◄─────────────── └────┬────┘ ──────────► ┌────┴───────┐
//!      │     input cleared         │                  │ Suggesting │
//!      │                           │ select / submit  └────┬───────┘
//!      │  redirect timer      ┌────▼────────┐              │
//!      └───────────────────── │ Redirecting │ ◄────────────┘
//!                             └─────────────┘
//! ```

use std::collections::HashSet;
use std::time::Instant;

use url::Url;

use crate::cache::{CachePolicy, SuggestionCache};
use crate::config::AutocompleteConfig;
use crate::error::Result;
use crate::images::{ImagePreloader, ImageSlot, PreloadTicket};
use crate::navigation::{absolutize, full_search_url};
use crate::scheduler::{RequestScheduler, Timer};
use crate::selection::{Highlight, Rows, merge_last_word};
use crate::types::{AutocompleteResponse, Suggestion, Trigger};

/// Keys the widget reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Tab,
    Enter,
    Escape,
}

/// Work the embedding runtime must perform on the widget's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Request suggestions for this trimmed query and report back via
    /// [`Autocomplete::on_response`].
    Fetch { query: String },
    /// Leave the page.
    Navigate { url: Url },
    /// Overwrite the text shown in the input.
    ReplaceInput(String),
    /// Materialise a thumbnail off-screen, then report back via
    /// [`Autocomplete::on_image_loaded`] or [`Autocomplete::on_image_failed`].
    Preload { ticket: PreloadTicket, url: String },
    /// The row needing this preload is gone; its result no longer matters.
    Abandon { ticket: PreloadTicket },
    /// Visible state changed.
    Render,
}

/// Result of a key press.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyOutcome {
    /// The widget consumed the key; the host should suppress its default action.
    pub prevent_default: bool,
    pub effects: Vec<Effect>,
}

impl KeyOutcome {
    fn handled(effects: Vec<Effect>) -> Self {
        Self {
            prevent_default: true,
            effects,
        }
    }

    fn ignored() -> Self {
        Self::default()
    }
}

/// Whether deferred callbacks may still touch the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Mounted,
    Unmounting,
}

/// Headless search-as-you-type controller for one input.
#[derive(Debug)]
pub struct Autocomplete {
    config: AutocompleteConfig,
    server: Url,
    lifecycle: Lifecycle,
    query: String,
    scheduler: RequestScheduler,
    cache: SuggestionCache,
    waiting_for: Option<String>,
    in_flight: HashSet<String>,
    suggestions: Option<AutocompleteResponse>,
    highlight: Highlight,
    visible: bool,
    blur_timer: Timer,
    redirect_timer: Timer,
    images: ImagePreloader,
}

impl Autocomplete {
    /// Create a widget with a cache built from the configured policy.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AutocompleteError::Config`] if `config` is invalid.
    pub fn new(config: AutocompleteConfig) -> Result<Self> {
        let cache = SuggestionCache::new(CachePolicy::from_config(&config));
        Self::with_cache(config, cache)
    }

    /// Create a widget around an injected cache.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AutocompleteError::Config`] if `config` is invalid.
    pub fn with_cache(config: AutocompleteConfig, cache: SuggestionCache) -> Result<Self> {
        config.validate()?;
        let server = config.server_url()?;
        Ok(Self {
            scheduler: RequestScheduler::new(&config),
            config,
            server,
            lifecycle: Lifecycle::Mounted,
            query: String::new(),
            cache,
            waiting_for: None,
            in_flight: HashSet::new(),
            suggestions: None,
            highlight: Highlight::None,
            visible: false,
            blur_timer: Timer::default(),
            redirect_timer: Timer::default(),
            images: ImagePreloader::new(),
        })
    }

    pub fn config(&self) -> &AutocompleteConfig {
        &self.config
    }

    /// The raw input text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The query of the most recently issued (or cache-served) request.
    pub fn waiting_for(&self) -> Option<&str> {
        self.waiting_for.as_deref()
    }

    /// Current suggestions; `None` means nothing to show for this input.
    pub fn suggestions(&self) -> Option<&AutocompleteResponse> {
        self.suggestions.as_ref()
    }

    /// The highlighted row, re-bounded against the current rows.
    pub fn highlight(&self) -> Highlight {
        match self.rows() {
            Some(rows) => self.highlight.clamped(rows),
            None => Highlight::None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible && self.suggestions.is_some()
    }

    /// A navigation was triggered and fetches are suppressed.
    pub fn is_redirecting(&self) -> bool {
        self.redirect_timer.is_armed()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn cache(&self) -> &SuggestionCache {
        &self.cache
    }

    pub fn images(&self) -> &ImagePreloader {
        &self.images
    }

    /// Absolute thumbnail URL for a suggestion, if it has one.
    pub fn thumbnail_url(&self, suggestion: &Suggestion) -> Option<String> {
        let raw = suggestion.thumbnail()?;
        absolutize(&self.server, raw).ok().map(String::from)
    }

    /// When the controller next needs [`on_tick`](Self::on_tick).
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.scheduler.next_deadline(),
            self.blur_timer.deadline(),
            self.redirect_timer.deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn is_mounted(&self) -> bool {
        self.lifecycle == Lifecycle::Mounted
    }

    fn rows(&self) -> Option<Rows> {
        self.suggestions.as_ref().map(|response| Rows {
            suggestions: response.matches.len(),
            has_summary: response.search_suggestions.is_some(),
        })
    }

    fn visible_rows(&self) -> Option<Rows> {
        self.rows()
            .filter(|rows| self.visible && !rows.is_empty())
    }

    fn is_in_flight(&self, query: &str) -> bool {
        self.waiting_for.as_deref() == Some(query) && self.in_flight.contains(query)
    }

    // ── Input ────────────────────────────────────────────────────────────

    /// The input text changed.
    pub fn on_input(&mut self, text: &str, now: Instant) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        self.query = text.to_owned();
        let mut effects = vec![Effect::Render];

        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.scheduler.cancel_all();
            self.waiting_for = None;
            effects.extend(self.clear_suggestions());
            return effects;
        }

        if self.is_redirecting() {
            tracing::debug!("redirect in progress, not fetching suggestions");
            return effects;
        }

        if let Some(cached) = self.cache.get(trimmed) {
            tracing::trace!(query = trimmed, "suggestion cache hit");
            self.scheduler.cancel_all();
            self.waiting_for = Some(trimmed.to_owned());
            effects.extend(self.apply(cached));
            return effects;
        }

        if self.is_in_flight(trimmed) {
            // Back to the outstanding query: drop calls parked for
            // intermediate keystrokes.
            self.scheduler.cancel_all();
            return effects;
        }

        if let Some(query) = self.scheduler.schedule(text, now) {
            effects.extend(self.issue(query));
        }
        effects
    }

    fn issue(&mut self, query: String) -> Vec<Effect> {
        if let Some(cached) = self.cache.get(&query) {
            self.waiting_for = Some(query);
            let mut effects = self.apply(cached);
            effects.push(Effect::Render);
            return effects;
        }
        if self.is_in_flight(&query) {
            return Vec::new();
        }
        tracing::trace!(query = %query, "issuing suggestion request");
        self.waiting_for = Some(query.clone());
        self.in_flight.insert(query.clone());
        vec![Effect::Fetch { query }]
    }

    // ── Responses ────────────────────────────────────────────────────────

    /// A suggestion request finished.
    ///
    /// Failures are logged and leave the current suggestions untouched.
    /// Stale responses are dropped silently.
    pub fn on_response(
        &mut self,
        query: &str,
        result: Result<AutocompleteResponse>,
    ) -> Vec<Effect> {
        self.in_flight.remove(query);
        if !self.is_mounted() {
            return Vec::new();
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "suggestion fetch failed");
                return Vec::new();
            }
        };

        if !self.is_fresh(query) {
            tracing::debug!(
                matches = response.matches.len(),
                "discarding stale suggestion response"
            );
            return Vec::new();
        }

        tracing::debug!(matches = response.matches.len(), "applying suggestions");
        self.cache.put(query, response.clone());
        let mut effects = self.apply(response);
        effects.push(Effect::Render);
        effects
    }

    fn is_fresh(&self, query: &str) -> bool {
        if self.is_redirecting() {
            return false;
        }
        let issued_after = self
            .waiting_for
            .as_deref()
            .is_some_and(|waiting| query.starts_with(waiting));
        issued_after && self.query.trim().starts_with(query)
    }

    fn apply(&mut self, response: AutocompleteResponse) -> Vec<Effect> {
        self.highlight = Highlight::None;
        self.visible = true;
        let effects = self.sync_images(&response);
        self.suggestions = Some(response);
        effects
    }

    fn sync_images(&mut self, response: &AutocompleteResponse) -> Vec<Effect> {
        let urls: Vec<String> = response
            .matches
            .iter()
            .filter_map(|suggestion| self.thumbnail_url(suggestion))
            .collect();
        let keep: HashSet<&str> = urls.iter().map(String::as_str).collect();

        let mut effects: Vec<Effect> = self
            .images
            .abandon_except(&keep)
            .into_iter()
            .map(|ticket| Effect::Abandon { ticket })
            .collect();
        for url in &urls {
            if let ImageSlot::Started(ticket) = self.images.request(url) {
                effects.push(Effect::Preload {
                    ticket,
                    url: url.clone(),
                });
            }
        }
        effects
    }

    fn clear_suggestions(&mut self) -> Vec<Effect> {
        self.suggestions = None;
        self.highlight = Highlight::None;
        self.visible = false;
        self.images
            .abandon_all()
            .into_iter()
            .map(|ticket| Effect::Abandon { ticket })
            .collect()
    }

    // ── Keyboard ─────────────────────────────────────────────────────────

    pub fn on_key(&mut self, key: Key, now: Instant) -> KeyOutcome {
        if !self.is_mounted() {
            return KeyOutcome::ignored();
        }
        match key {
            Key::ArrowDown | Key::ArrowUp => {
                let Some(rows) = self.visible_rows() else {
                    return KeyOutcome::ignored();
                };
                let current = self.highlight.clamped(rows);
                self.highlight = if key == Key::ArrowDown {
                    current.down(rows)
                } else {
                    current.up(rows)
                };
                KeyOutcome::handled(vec![Effect::Render])
            }
            Key::Tab => self.tab_complete(now),
            Key::Enter => match self.visible_rows().map(|rows| self.highlight.clamped(rows)) {
                Some(Highlight::Suggestion(index)) => {
                    KeyOutcome::handled(self.select_suggestion(index, Trigger::Enter, now))
                }
                Some(Highlight::Summary) => {
                    KeyOutcome::handled(self.select_summary(Trigger::Enter, now))
                }
                _ if self.query.trim().is_empty() => KeyOutcome::ignored(),
                _ => KeyOutcome::handled(self.submit(Trigger::Enter, now)),
            },
            Key::Escape => {
                if self.is_visible() {
                    self.visible = false;
                    self.highlight = Highlight::None;
                    KeyOutcome::handled(vec![Effect::Render])
                } else {
                    KeyOutcome::ignored()
                }
            }
        }
    }

    fn tab_complete(&mut self, now: Instant) -> KeyOutcome {
        let Some(rows) = self.visible_rows() else {
            return KeyOutcome::ignored();
        };
        let target = match self.highlight.clamped(rows) {
            Highlight::None if rows.suggestions > 0 => Highlight::Suggestion(0),
            Highlight::None => Highlight::Summary,
            other => other,
        };
        match target {
            Highlight::Suggestion(index) => {
                let Some(suggestion) = self.suggestion_at(index) else {
                    return KeyOutcome::ignored();
                };
                let completed = if suggestion.append {
                    merge_last_word(&self.query, &suggestion.text)
                } else {
                    format!("{} ", suggestion.text.trim())
                };
                let mut effects = vec![Effect::ReplaceInput(completed.clone())];
                effects.extend(self.on_input(&completed, now));
                KeyOutcome::handled(effects)
            }
            Highlight::Summary => KeyOutcome::handled(self.select_summary(Trigger::Tab, now)),
            Highlight::None => KeyOutcome::ignored(),
        }
    }

    // ── Pointer & focus ──────────────────────────────────────────────────

    /// A suggestion row was clicked, whatever the keyboard highlight.
    pub fn on_suggestion_click(&mut self, index: usize, now: Instant) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        self.select_suggestion(index, Trigger::Clicked, now)
    }

    /// The summary ("N matches") row was clicked.
    pub fn on_summary_click(&mut self, now: Instant) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        self.select_summary(Trigger::Clicked, now)
    }

    /// The search icon next to the input was clicked.
    pub fn on_search_icon(&mut self, now: Instant) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        self.submit(Trigger::Search, now)
    }

    /// Focus returned: re-show suggestions still in memory, no refetch.
    pub fn on_focus(&mut self, _now: Instant) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        self.blur_timer.cancel();
        if self.suggestions.is_some() && !self.visible {
            self.visible = true;
            return vec![Effect::Render];
        }
        Vec::new()
    }

    /// Focus left the input. The list hides after the grace period so a
    /// click on a row still lands.
    pub fn on_blur(&mut self, now: Instant) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        self.blur_timer.arm(now + self.config.blur_grace());
        Vec::new()
    }

    // ── Selection & navigation ───────────────────────────────────────────

    fn suggestion_at(&self, index: usize) -> Option<Suggestion> {
        self.suggestions
            .as_ref()
            .and_then(|response| response.matches.get(index))
            .cloned()
    }

    fn select_suggestion(&mut self, index: usize, trigger: Trigger, now: Instant) -> Vec<Effect> {
        let Some(suggestion) = self.suggestion_at(index) else {
            return Vec::new();
        };
        if let Some(raw) = suggestion.url.as_deref() {
            match absolutize(&self.server, raw) {
                Ok(url) => return self.navigate(url, now),
                Err(err) => tracing::warn!(error = %err, "unusable suggestion URL"),
            }
        }
        self.query = suggestion.text;
        self.submit(trigger, now)
    }

    fn select_summary(&mut self, trigger: Trigger, now: Instant) -> Vec<Effect> {
        let Some(term) = self
            .suggestions
            .as_ref()
            .and_then(|response| response.search_suggestions.as_ref())
            .map(|summary| summary.term.clone())
        else {
            return Vec::new();
        };
        self.query = term;
        self.submit(trigger, now)
    }

    fn submit(&mut self, trigger: Trigger, now: Instant) -> Vec<Effect> {
        let query = self.query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        match full_search_url(&self.server, query, trigger) {
            Ok(url) => self.navigate(url, now),
            Err(err) => {
                tracing::warn!(error = %err, "could not build search URL");
                Vec::new()
            }
        }
    }

    fn navigate(&mut self, url: Url, now: Instant) -> Vec<Effect> {
        tracing::trace!(%url, "navigating");
        self.scheduler.cancel_all();
        self.blur_timer.cancel();
        self.waiting_for = None;
        self.query.clear();
        let mut effects = self.clear_suggestions();
        self.redirect_timer.arm(now + self.config.redirect_reset());
        effects.push(Effect::ReplaceInput(String::new()));
        effects.push(Effect::Navigate { url });
        effects.push(Effect::Render);
        effects
    }

    // ── Deferred completions ─────────────────────────────────────────────

    /// Fire whatever timers have expired by `now`.
    pub fn on_tick(&mut self, now: Instant) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if self.blur_timer.take_if_due(now) && self.visible {
            self.visible = false;
            effects.push(Effect::Render);
        }
        if self.redirect_timer.take_if_due(now) {
            tracing::debug!("page did not unload, re-enabling suggestions");
        }
        for query in self.scheduler.fire_due(now) {
            effects.extend(self.issue(query));
        }
        effects
    }

    /// A thumbnail preload finished decoding.
    pub fn on_image_loaded(&mut self, ticket: PreloadTicket) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        match self.images.complete(ticket) {
            Some(_) => vec![Effect::Render],
            None => Vec::new(),
        }
    }

    /// A thumbnail preload failed; the row keeps its placeholder.
    pub fn on_image_failed(&mut self, ticket: PreloadTicket) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        if self.images.fail(ticket).is_some() {
            tracing::debug!(?ticket, "thumbnail preload failed");
        }
        Vec::new()
    }

    /// The widget is going away. Timers stop, pending preloads are
    /// abandoned, and every later callback becomes a no-op.
    pub fn unmount(&mut self) -> Vec<Effect> {
        if !self.is_mounted() {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Unmounting;
        self.scheduler.cancel_all();
        self.blur_timer.cancel();
        self.redirect_timer.cancel();
        self.images
            .abandon_all()
            .into_iter()
            .map(|ticket| Effect::Abandon { ticket })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AutocompleteError;
    use crate::types::{SearchSuggestionSummary, SuggestionImage};
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn widget() -> Autocomplete {
        Autocomplete::new(AutocompleteConfig::default()).expect("valid config")
    }

    fn text(text: &str) -> Suggestion {
        Suggestion {
            id: None,
            text: text.into(),
            append: false,
            url: None,
            name: None,
            artist: None,
            image: None,
            fragments: vec![],
            html: None,
        }
    }

    fn response(texts: &[&str]) -> AutocompleteResponse {
        AutocompleteResponse {
            matches: texts.iter().map(|t| text(t)).collect(),
            search_suggestions: None,
        }
    }

    fn fetches(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Fetch { query } => Some(query.clone()),
                _ => None,
            })
            .collect()
    }

    fn navigation(effects: &[Effect]) -> Option<String> {
        effects.iter().find_map(|effect| match effect {
            Effect::Navigate { url } => Some(url.to_string()),
            _ => None,
        })
    }

    /// Type `query` (throttled, fires immediately) and answer it.
    fn with_suggestions(w: &mut Autocomplete, query: &str, resp: AutocompleteResponse, now: Instant) {
        let effects = w.on_input(query, now);
        assert_eq!(fetches(&effects), vec![query.trim().to_string()]);
        w.on_response(query.trim(), Ok(resp));
        assert!(w.suggestions().is_some());
    }

    #[test]
    fn invalid_config_rejected() {
        let config = AutocompleteConfig {
            throttle_ms: 0,
            ..Default::default()
        };
        assert!(Autocomplete::new(config).is_err());
    }

    #[test]
    fn short_query_fetches_immediately() {
        let mut w = widget();
        let effects = w.on_input("d", Instant::now());
        assert_eq!(fetches(&effects), vec!["d"]);
        assert_eq!(w.waiting_for(), Some("d"));
    }

    #[test]
    fn rapid_short_keystrokes_one_call_per_window() {
        let mut w = widget();
        let start = Instant::now();
        let mut sent = fetches(&w.on_input("a", start));
        sent.extend(fetches(&w.on_input("ab", start + ms(100))));
        sent.extend(fetches(&w.on_input("abc", start + ms(200))));
        assert_eq!(sent, vec!["a"]);

        assert_eq!(w.next_deadline(), Some(start + ms(1100)));
        sent.extend(fetches(&w.on_tick(start + ms(1100))));
        assert_eq!(sent, vec!["a", "abc"]);
    }

    #[test]
    fn long_query_burst_sends_only_last() {
        let mut w = widget();
        let start = Instant::now();
        let base = "the quick brown fox jumps over";
        let mut sent = Vec::new();
        for (i, extra) in ["", " t", " th", " the"].iter().enumerate() {
            let now = start + ms(i as u64 * 200);
            sent.extend(fetches(&w.on_input(&format!("{base}{extra}"), now)));
            sent.extend(fetches(&w.on_tick(now)));
        }
        assert!(sent.is_empty());
        sent.extend(fetches(&w.on_tick(start + ms(600 + 1800))));
        assert_eq!(sent, vec![format!("{base} the")]);
    }

    #[test]
    fn identical_query_in_flight_not_reissued() {
        let mut w = widget();
        let start = Instant::now();
        assert_eq!(fetches(&w.on_input("dog", start)).len(), 1);
        assert!(fetches(&w.on_input("dog ", start + ms(2000))).is_empty());
        assert!(fetches(&w.on_input(" dog", start + ms(4000))).is_empty());
        assert!(!w.scheduler.has_pending());
    }

    #[test]
    fn stale_response_does_not_override_newer() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "cat", response(&["cat"]), start);

        // Issue A ("ca", throttled) then B ("cats") before either answers.
        let a = fetches(&w.on_input("ca", start + ms(1200)));
        assert_eq!(a, vec!["ca"]);
        let _ = w.on_input("cats", start + ms(1300));
        let b = fetches(&w.on_tick(start + ms(1300 + 800)));
        assert_eq!(b, vec!["cats"]);

        w.on_response("cats", Ok(response(&["cats", "catsup"])));
        let effects = w.on_response("ca", Ok(response(&["cake"])));
        assert!(effects.is_empty());
        let shown: Vec<&str> = w
            .suggestions()
            .expect("suggestions")
            .matches
            .iter()
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(shown, vec!["cats", "catsup"]);
    }

    #[test]
    fn prefix_response_rejected_once_newer_issued() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("cat", start);
        let _ = w.on_input("cats", start + ms(10));
        let _ = w.on_tick(start + ms(10 + 800));
        assert_eq!(w.waiting_for(), Some("cats"));
        assert!(w.on_response("cat", Ok(response(&["cat"]))).is_empty());
        assert!(w.suggestions().is_none());
    }

    #[test]
    fn response_for_abandoned_longer_query_is_dropped() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("cat", start);
        w.on_response("cat", Ok(response(&["cat"])));
        let _ = w.on_input("catsx", start + ms(10));
        let _ = w.on_tick(start + ms(810));
        // Back to a cached query before "catsx" answers.
        let _ = w.on_input("cat", start + ms(900));
        assert!(w.on_response("catsx", Ok(response(&["catsx"]))).is_empty());
        assert_eq!(w.suggestions().expect("cached").matches[0].text, "cat");
    }

    #[test]
    fn cache_hit_is_synchronous_and_skips_network() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "dog", response(&["dog", "dogs"]), start);
        let _ = w.on_input("", start + ms(10));
        assert!(w.suggestions().is_none());

        let effects = w.on_input("dog", start + ms(20));
        assert!(fetches(&effects).is_empty());
        assert_eq!(w.suggestions(), Some(&response(&["dog", "dogs"])));
        assert_eq!(w.highlight(), Highlight::None);
        assert!(!w.scheduler.has_pending());
    }

    #[test]
    fn clearing_input_resets_and_cancels() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "dog", response(&["dog"]), start);
        let _ = w.on_input("dogsled", start + ms(100));
        assert!(w.scheduler.has_pending());

        let effects = w.on_input("   ", start + ms(200));
        assert!(effects.contains(&Effect::Render));
        assert!(w.suggestions().is_none());
        assert!(w.waiting_for().is_none());
        assert!(w.next_deadline().is_none());
        assert!(fetches(&w.on_tick(start + ms(10_000))).is_empty());
    }

    #[test]
    fn late_response_after_clear_is_ignored() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("dog", start);
        let _ = w.on_input("", start + ms(10));
        assert!(w.on_response("dog", Ok(response(&["dog"]))).is_empty());
        assert!(w.suggestions().is_none());
    }

    #[test]
    fn failed_fetch_keeps_previous_suggestions() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "dog", response(&["dog"]), start);
        let _ = w.on_input("dogs", start + ms(10));
        let _ = w.on_tick(start + ms(810));
        let effects = w.on_response("dogs", Err(AutocompleteError::Http("status 500".into())));
        assert!(effects.is_empty());
        assert_eq!(w.suggestions(), Some(&response(&["dog"])));
        assert_eq!(w.query(), "dogs");
    }

    #[test]
    fn returning_to_in_flight_query_drops_parked_call() {
        let mut w = widget();
        let start = Instant::now();
        let mut sent = fetches(&w.on_input("do", start));
        sent.extend(fetches(&w.on_input("dox", start + ms(50))));
        sent.extend(fetches(&w.on_input("do", start + ms(100))));
        assert!(w.next_deadline().is_none());
        sent.extend(fetches(&w.on_tick(start + ms(1100))));
        assert_eq!(sent, vec!["do"]);
        assert_eq!(w.waiting_for(), Some("do"));

        let effects = w.on_response("do", Ok(response(&["dog", "door"])));
        assert!(effects.contains(&Effect::Render));
        assert_eq!(w.suggestions(), Some(&response(&["dog", "door"])));
    }

    #[test]
    fn failed_fetch_can_be_retried() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("dog", start);
        w.on_response("dog", Err(AutocompleteError::Http("timeout".into())));
        let effects = w.on_input("dog ", start + ms(2000));
        assert_eq!(fetches(&effects), vec!["dog"]);
    }

    #[test]
    fn arrows_stay_in_bounds() {
        let mut w = widget();
        let start = Instant::now();
        let mut resp = response(&["a1", "a2", "a3"]);
        resp.search_suggestions = Some(SearchSuggestionSummary {
            term: "a".into(),
            total: 3,
            capped: false,
            desperate: false,
        });
        with_suggestions(&mut w, "a", resp, start);

        for _ in 0..5 {
            let outcome = w.on_key(Key::ArrowDown, start);
            assert!(outcome.prevent_default);
            assert!(w.highlight().index() <= 3);
        }
        assert_eq!(w.highlight(), Highlight::Suggestion(2));
        for _ in 0..10 {
            w.on_key(Key::ArrowUp, start);
            assert!(w.highlight().index() >= -1);
        }
        assert_eq!(w.highlight(), Highlight::None);
    }

    #[test]
    fn arrows_ignored_without_suggestions() {
        let mut w = widget();
        let outcome = w.on_key(Key::ArrowDown, Instant::now());
        assert!(!outcome.prevent_default);
        assert_eq!(w.highlight(), Highlight::None);
    }

    #[test]
    fn tab_appends_to_last_word_and_refetches() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("hello wor", start);
        let sent = fetches(&w.on_tick(start + ms(800)));
        assert_eq!(sent, vec!["hello wor"]);
        let mut world = text("world");
        world.append = true;
        w.on_response(
            "hello wor",
            Ok(AutocompleteResponse {
                matches: vec![world],
                search_suggestions: None,
            }),
        );
        w.on_key(Key::ArrowDown, start + ms(850));

        let outcome = w.on_key(Key::Tab, start + ms(900));
        assert!(outcome.prevent_default);
        assert!(outcome
            .effects
            .contains(&Effect::ReplaceInput("hello world ".into())));
        assert_eq!(w.query(), "hello world ");
        assert_eq!(fetches(&outcome.effects), vec!["hello world"]);
        assert!(navigation(&outcome.effects).is_none());
    }

    #[test]
    fn tab_without_highlight_replaces_with_first() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "bo", response(&["bohemian rhapsody", "born to run"]), start);
        let outcome = w.on_key(Key::Tab, start + ms(10));
        assert!(outcome
            .effects
            .contains(&Effect::ReplaceInput("bohemian rhapsody ".into())));
        assert_eq!(w.query(), "bohemian rhapsody ");
    }

    #[test]
    fn tab_ignored_without_suggestions() {
        let mut w = widget();
        let _ = w.on_input("zzzz", Instant::now());
        assert!(!w.on_key(Key::Tab, Instant::now()).prevent_default);
    }

    #[test]
    fn tab_on_summary_submits_full_search() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(
            &mut w,
            "dog",
            AutocompleteResponse {
                matches: vec![],
                search_suggestions: Some(SearchSuggestionSummary {
                    term: "dog".into(),
                    total: 9,
                    capped: false,
                    desperate: false,
                }),
            },
            start,
        );
        let outcome = w.on_key(Key::Tab, start + ms(10));
        assert_eq!(
            navigation(&outcome.effects).as_deref(),
            Some("https://songsear.ch/q/dog?autocomplete=tab")
        );
    }

    #[test]
    fn click_with_direct_url_navigates_without_search() {
        let mut w = widget();
        let start = Instant::now();
        let mut resp = response(&["Queen"]);
        resp.matches[0].url = Some("/artist/123".into());
        with_suggestions(&mut w, "que", resp, start);

        let effects = w.on_suggestion_click(0, start + ms(10));
        assert_eq!(
            navigation(&effects).as_deref(),
            Some("https://songsear.ch/artist/123")
        );
        assert!(w.suggestions().is_none());
        assert_eq!(w.highlight(), Highlight::None);
        assert!(w.is_redirecting());
    }

    #[test]
    fn click_without_url_submits_text() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "bor", response(&["born to run"]), start);
        let effects = w.on_suggestion_click(0, start + ms(10));
        assert_eq!(
            navigation(&effects).as_deref(),
            Some("https://songsear.ch/q/born%20to%20run?autocomplete=clicked")
        );
        assert_eq!(w.query(), "");
    }

    #[test]
    fn enter_without_highlight_submits_raw_query() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("  thunder road ", start);
        let outcome = w.on_key(Key::Enter, start + ms(10));
        assert!(outcome.prevent_default);
        assert_eq!(
            navigation(&outcome.effects).as_deref(),
            Some("https://songsear.ch/q/thunder%20road?autocomplete=enter")
        );
    }

    #[test]
    fn enter_on_empty_input_does_nothing() {
        let mut w = widget();
        let outcome = w.on_key(Key::Enter, Instant::now());
        assert!(!outcome.prevent_default);
        assert!(outcome.effects.is_empty());
    }

    #[test]
    fn enter_with_highlight_resolves_selection() {
        let mut w = widget();
        let start = Instant::now();
        let mut resp = response(&["first", "second"]);
        resp.matches[1].url = Some("https://example.com/song/2".into());
        with_suggestions(&mut w, "s", resp, start);
        w.on_key(Key::ArrowDown, start);
        w.on_key(Key::ArrowDown, start);
        let outcome = w.on_key(Key::Enter, start);
        assert_eq!(
            navigation(&outcome.effects).as_deref(),
            Some("https://example.com/song/2")
        );
    }

    #[test]
    fn search_icon_submits_with_search_trigger() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("dog", start);
        let effects = w.on_search_icon(start);
        assert_eq!(
            navigation(&effects).as_deref(),
            Some("https://songsear.ch/q/dog?autocomplete=search")
        );
    }

    #[test]
    fn redirect_suppresses_fetches_until_reset() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("dog", start);
        let _ = w.on_key(Key::Enter, start);
        assert!(w.is_redirecting());

        assert!(fetches(&w.on_input("cat", start + ms(1500))).is_empty());
        assert!(w.on_response("dog", Ok(response(&["dog"]))).is_empty());

        let _ = w.on_tick(start + ms(3000));
        assert!(!w.is_redirecting());
        assert_eq!(fetches(&w.on_input("cow", start + ms(3100))), vec!["cow"]);
    }

    #[test]
    fn blur_hides_after_grace_and_focus_reshows() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "dog", response(&["dog"]), start);
        w.on_blur(start);
        assert!(w.on_tick(start + ms(299)).is_empty());
        assert!(w.is_visible());
        assert_eq!(w.on_tick(start + ms(300)), vec![Effect::Render]);
        assert!(!w.is_visible());

        let effects = w.on_focus(start + ms(5000));
        assert_eq!(effects, vec![Effect::Render]);
        assert!(w.is_visible());
        assert!(fetches(&effects).is_empty());
    }

    #[test]
    fn click_during_blur_grace_still_lands() {
        let mut w = widget();
        let start = Instant::now();
        let mut resp = response(&["x"]);
        resp.matches[0].url = Some("/song/1".into());
        with_suggestions(&mut w, "x", resp, start);
        w.on_blur(start);
        let effects = w.on_suggestion_click(0, start + ms(150));
        assert!(navigation(&effects).is_some());
    }

    #[test]
    fn focus_cancels_pending_blur() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "dog", response(&["dog"]), start);
        w.on_blur(start);
        w.on_focus(start + ms(100));
        assert!(w.on_tick(start + ms(400)).is_empty());
        assert!(w.is_visible());
    }

    #[test]
    fn escape_hides_list() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "dog", response(&["dog"]), start);
        assert!(w.on_key(Key::Escape, start).prevent_default);
        assert!(!w.is_visible());
        assert!(!w.on_key(Key::Escape, start).prevent_default);
    }

    #[test]
    fn highlight_clamped_when_list_shrinks() {
        let mut w = widget();
        let start = Instant::now();
        with_suggestions(&mut w, "a", response(&["a1", "a2", "a3"]), start);
        w.on_key(Key::ArrowDown, start);
        w.on_key(Key::ArrowDown, start);
        w.on_key(Key::ArrowDown, start);
        assert_eq!(w.highlight(), Highlight::Suggestion(2));
        // Shrink underneath the highlight without going through apply().
        w.suggestions = Some(response(&["a1"]));
        assert_eq!(w.highlight(), Highlight::Suggestion(0));
        w.on_key(Key::ArrowDown, start);
        assert_eq!(w.highlight(), Highlight::Suggestion(0));
    }

    fn song_with_thumb(url: &str) -> Suggestion {
        let mut song = text("song");
        song.id = Some("1".into());
        song.image = Some(SuggestionImage {
            url: None,
            thumbnail100: Some(url.into()),
        });
        song
    }

    #[test]
    fn new_thumbnails_are_preloaded_once() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("so", start);
        let effects = w.on_response(
            "so",
            Ok(AutocompleteResponse {
                matches: vec![song_with_thumb("/img/1.jpg")],
                search_suggestions: None,
            }),
        );
        let ticket = effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Preload { ticket, url } => {
                    assert_eq!(url, "https://songsear.ch/img/1.jpg");
                    Some(*ticket)
                }
                _ => None,
            })
            .expect("preload started");
        assert_eq!(w.on_image_loaded(ticket), vec![Effect::Render]);
        assert!(w.images().is_loaded("https://songsear.ch/img/1.jpg"));
    }

    #[test]
    fn replaced_rows_abandon_their_preloads() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("so", start);
        let first = w.on_response(
            "so",
            Ok(AutocompleteResponse {
                matches: vec![song_with_thumb("/img/1.jpg")],
                search_suggestions: None,
            }),
        );
        let Some(Effect::Preload { ticket, .. }) = first
            .iter()
            .find(|effect| matches!(effect, Effect::Preload { .. }))
            .cloned()
        else {
            panic!("expected a preload");
        };

        let cleared = w.on_input("", start + ms(10));
        assert!(cleared.contains(&Effect::Abandon { ticket }));
        assert!(w.on_image_loaded(ticket).is_empty());
        assert!(!w.images().is_loaded("https://songsear.ch/img/1.jpg"));
    }

    #[test]
    fn unmount_turns_callbacks_into_noops() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("dog", start);
        let _ = w.on_input("dogsled", start + ms(10));
        w.unmount();
        assert_eq!(w.lifecycle(), Lifecycle::Unmounting);
        assert!(w.next_deadline().is_none());
        assert!(w.on_response("dog", Ok(response(&["dog"]))).is_empty());
        assert!(w.suggestions().is_none());
        assert!(w.on_input("cat", start + ms(20)).is_empty());
        assert!(w.unmount().is_empty());
    }

    #[test]
    fn image_callbacks_after_unmount_are_noops() {
        let mut w = widget();
        let start = Instant::now();
        let _ = w.on_input("so", start);
        let effects = w.on_response(
            "so",
            Ok(AutocompleteResponse {
                matches: vec![song_with_thumb("/img/1.jpg")],
                search_suggestions: None,
            }),
        );
        let ticket = effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Preload { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("preload started");

        assert_eq!(w.unmount(), vec![Effect::Abandon { ticket }]);
        assert!(w.on_image_failed(ticket).is_empty());
        assert!(w.on_image_loaded(ticket).is_empty());
        assert!(!w.images().is_pending(ticket));
        assert!(!w.images().is_loaded("https://songsear.ch/img/1.jpg"));
    }
}
