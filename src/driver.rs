//! Async runtime for one autocomplete widget.
//!
//! [`AutocompleteDriver`] owns an [`Autocomplete`] and carries out its
//! [`Effect`]s: suggestion requests and thumbnail preloads run as tasks on
//! [`JoinSet`]s, timers become a single `sleep_until` on the controller's
//! next deadline, and everything the host page must act on goes out as a
//! [`WidgetOutput`].
//!
//! All controller calls happen on the driver's task, so state is never
//! shared across threads.
//!
//! # Usage
//!
//! ```rust,ignore
//! let (event_tx, event_rx) = mpsc::channel(64);
//! let (output_tx, mut output_rx) = mpsc::unbounded_channel();
//! let cancel = CancellationToken::new();
//! let driver = AutocompleteDriver::connect(config, output_tx, cancel.child_token())?;
//! tokio::spawn(driver.run(event_rx));
//! event_tx.send(WidgetEvent::Input("dog".into())).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::config::AutocompleteConfig;
use crate::controller::{Autocomplete, Effect, Key};
use crate::error::{AutocompleteError, Result};
use crate::http;
use crate::images::{HttpImageMaterializer, ImageMaterializer, PreloadTicket};
use crate::source::{HttpSuggestionSource, SuggestionSource};
use crate::types::AutocompleteResponse;
use crate::view::SuggestionsView;

/// Gestures from the host page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    Input(String),
    Key(Key),
    Focus,
    Blur,
    ClickSuggestion(usize),
    ClickSummary,
    SearchIcon,
}

/// What the host page must do.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetOutput {
    Render(SuggestionsView),
    Navigate(Url),
    ReplaceInput(String),
}

type FetchOutcome = Result<AutocompleteResponse>;
type PreloadOutcome = (PreloadTicket, Result<()>);

enum Wake {
    Stop,
    Event(WidgetEvent),
    Fetched(std::result::Result<(Id, FetchOutcome), JoinError>),
    Preloaded(std::result::Result<PreloadOutcome, JoinError>),
    Tick,
}

/// Drives an [`Autocomplete`] against a suggestion source and image loader.
pub struct AutocompleteDriver<S, I> {
    widget: Autocomplete,
    source: Arc<S>,
    images: Arc<I>,
    output: mpsc::UnboundedSender<WidgetOutput>,
    cancel: CancellationToken,
    fetches: JoinSet<FetchOutcome>,
    /// Query of each running fetch, so a task that dies still reports back.
    fetch_queries: HashMap<Id, String>,
    preloads: JoinSet<PreloadOutcome>,
    preload_handles: HashMap<PreloadTicket, AbortHandle>,
    output_closed: bool,
}

impl AutocompleteDriver<HttpSuggestionSource, HttpImageMaterializer> {
    /// Build a driver talking to the configured server over HTTP. The
    /// suggestion source and thumbnail loader share one client.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AutocompleteError::Config`] for invalid config, or
    /// [`crate::AutocompleteError::Http`] if the HTTP client cannot be built.
    pub fn connect(
        config: AutocompleteConfig,
        output: mpsc::UnboundedSender<WidgetOutput>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let widget = Autocomplete::new(config)?;
        let client = http::build_client(widget.config())?;
        let source = HttpSuggestionSource::with_client(widget.config(), client.clone())?;
        let images = HttpImageMaterializer::with_client(client);
        Ok(Self::new(widget, source, images, output, cancel))
    }
}

impl<S, I> AutocompleteDriver<S, I>
where
    S: SuggestionSource + 'static,
    I: ImageMaterializer + 'static,
{
    pub fn new(
        widget: Autocomplete,
        source: S,
        images: I,
        output: mpsc::UnboundedSender<WidgetOutput>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            widget,
            source: Arc::new(source),
            images: Arc::new(images),
            output,
            cancel,
            fetches: JoinSet::new(),
            fetch_queries: HashMap::new(),
            preloads: JoinSet::new(),
            preload_handles: HashMap::new(),
            output_closed: false,
        }
    }

    /// Run until cancelled, the event channel closes, or the output
    /// receiver is dropped. The widget is unmounted on the way out and
    /// handed back.
    pub async fn run(mut self, mut events: mpsc::Receiver<WidgetEvent>) -> Autocomplete {
        debug!("autocomplete driver started");
        loop {
            let deadline = self.widget.next_deadline();
            let wake = tokio::select! {
                _ = self.cancel.cancelled() => Wake::Stop,
                event = events.recv() => match event {
                    Some(event) => Wake::Event(event),
                    None => Wake::Stop,
                },
                Some(joined) = self.fetches.join_next_with_id(), if !self.fetches.is_empty() => {
                    Wake::Fetched(joined)
                }
                Some(joined) = self.preloads.join_next(), if !self.preloads.is_empty() => {
                    Wake::Preloaded(joined)
                }
                _ = sleep_until(deadline) => Wake::Tick,
            };

            let effects = match wake {
                Wake::Stop => break,
                Wake::Event(event) => self.dispatch(event),
                Wake::Fetched(Ok((id, result))) => match self.fetch_queries.remove(&id) {
                    Some(query) => self.widget.on_response(&query, result),
                    None => Vec::new(),
                },
                Wake::Fetched(Err(err)) => {
                    warn!(error = %err, "suggestion task failed");
                    match self.fetch_queries.remove(&err.id()) {
                        Some(query) => self.widget.on_response(
                            &query,
                            Err(AutocompleteError::Http(format!(
                                "suggestion task failed: {err}"
                            ))),
                        ),
                        None => Vec::new(),
                    }
                }
                Wake::Preloaded(Ok((ticket, result))) => {
                    self.preload_handles.remove(&ticket);
                    match result {
                        Ok(()) => self.widget.on_image_loaded(ticket),
                        Err(err) => {
                            debug!(error = %err, "thumbnail preload failed");
                            self.widget.on_image_failed(ticket)
                        }
                    }
                }
                Wake::Preloaded(Err(err)) if err.is_cancelled() => Vec::new(),
                Wake::Preloaded(Err(err)) => {
                    warn!(error = %err, "thumbnail task failed");
                    Vec::new()
                }
                Wake::Tick => self.widget.on_tick(now()),
            };
            self.perform(effects);

            if self.output_closed {
                debug!("widget output closed, stopping driver");
                break;
            }
        }

        let effects = self.widget.unmount();
        self.perform(effects);
        self.fetches.abort_all();
        self.preloads.abort_all();
        debug!("autocomplete driver stopped");
        self.widget
    }

    fn dispatch(&mut self, event: WidgetEvent) -> Vec<Effect> {
        let now = now();
        match event {
            WidgetEvent::Input(text) => self.widget.on_input(&text, now),
            WidgetEvent::Key(key) => self.widget.on_key(key, now).effects,
            WidgetEvent::Focus => self.widget.on_focus(now),
            WidgetEvent::Blur => self.widget.on_blur(now),
            WidgetEvent::ClickSuggestion(index) => self.widget.on_suggestion_click(index, now),
            WidgetEvent::ClickSummary => self.widget.on_summary_click(now),
            WidgetEvent::SearchIcon => self.widget.on_search_icon(now),
        }
    }

    fn perform(&mut self, effects: Vec<Effect>) {
        let mut render = false;
        for effect in effects {
            match effect {
                Effect::Fetch { query } => {
                    let source = Arc::clone(&self.source);
                    let task_query = query.clone();
                    let handle = self
                        .fetches
                        .spawn(async move { source.fetch(&task_query).await });
                    self.fetch_queries.insert(handle.id(), query);
                }
                Effect::Preload { ticket, url } => {
                    let images = Arc::clone(&self.images);
                    let handle = self
                        .preloads
                        .spawn(async move { (ticket, images.materialize(&url).await) });
                    self.preload_handles.insert(ticket, handle);
                }
                Effect::Abandon { ticket } => {
                    if let Some(handle) = self.preload_handles.remove(&ticket) {
                        handle.abort();
                    }
                }
                Effect::Navigate { url } => self.emit(WidgetOutput::Navigate(url)),
                Effect::ReplaceInput(text) => self.emit(WidgetOutput::ReplaceInput(text)),
                Effect::Render => render = true,
            }
        }
        if render {
            let view = self.widget.view();
            self.emit(WidgetOutput::Render(view));
        }
    }

    fn emit(&mut self, output: WidgetOutput) {
        if self.output.send(output).is_err() {
            self.output_closed = true;
        }
    }
}

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
