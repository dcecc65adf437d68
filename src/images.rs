//! Lazy thumbnail loading for song suggestion rows.
//!
//! The first time a thumbnail URL shows up the row renders a placeholder
//! while the real image is downloaded and decoded off-screen. Only once
//! that finishes does the row switch to the real source. URLs that have
//! loaded once this session render directly.
//!
//! Each preload is tracked by a [`PreloadTicket`]. Abandoning a ticket
//! (the row went away) turns its eventual completion into a no-op.

use std::collections::{HashMap, HashSet};

use crate::config::AutocompleteConfig;
use crate::error::{AutocompleteError, Result};

/// Handle for one in-flight thumbnail preload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreloadTicket(u64);

/// What a row should show for its thumbnail right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    /// Already decoded this session: show the real URL.
    Ready,
    /// A new preload was started; show the placeholder until it completes.
    Started(PreloadTicket),
    /// A preload for this URL is already running; keep the placeholder.
    Pending,
}

/// URLs that have finished loading at least once. Only ever grows.
#[derive(Debug, Clone, Default)]
pub struct LoadedImageSet {
    urls: HashSet<String>,
}

impl LoadedImageSet {
    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn insert(&mut self, url: impl Into<String>) {
        self.urls.insert(url.into());
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Tracks preload tickets and the loaded-once set for one widget.
#[derive(Debug, Default)]
pub struct ImagePreloader {
    loaded: LoadedImageSet,
    pending: HashMap<PreloadTicket, String>,
    next_ticket: u64,
}

impl ImagePreloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide how to show `url`, starting a preload if it has never loaded.
    pub fn request(&mut self, url: &str) -> ImageSlot {
        if self.loaded.contains(url) {
            return ImageSlot::Ready;
        }
        if self.pending.values().any(|pending| pending == url) {
            return ImageSlot::Pending;
        }
        let ticket = PreloadTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.insert(ticket, url.to_owned());
        ImageSlot::Started(ticket)
    }

    /// A preload finished decoding.
    ///
    /// Returns the URL to swap in, or `None` if the ticket was abandoned.
    pub fn complete(&mut self, ticket: PreloadTicket) -> Option<String> {
        let url = self.pending.remove(&ticket)?;
        self.loaded.insert(url.clone());
        Some(url)
    }

    /// A preload failed. The row keeps its placeholder; a later request
    /// for the same URL will try again.
    pub fn fail(&mut self, ticket: PreloadTicket) -> Option<String> {
        self.pending.remove(&ticket)
    }

    /// Forget a preload whose row is gone. Returns `true` if it was live.
    pub fn abandon(&mut self, ticket: PreloadTicket) -> bool {
        self.pending.remove(&ticket).is_some()
    }

    /// Abandon every preload whose URL is not in `keep`.
    pub fn abandon_except(&mut self, keep: &HashSet<&str>) -> Vec<PreloadTicket> {
        let mut dropped: Vec<PreloadTicket> = self
            .pending
            .iter()
            .filter(|(_, url)| !keep.contains(url.as_str()))
            .map(|(ticket, _)| *ticket)
            .collect();
        dropped.sort();
        for ticket in &dropped {
            self.pending.remove(ticket);
        }
        dropped
    }

    /// Abandon everything still pending.
    pub fn abandon_all(&mut self) -> Vec<PreloadTicket> {
        self.abandon_except(&HashSet::new())
    }

    pub fn is_loaded(&self, url: &str) -> bool {
        self.loaded.contains(url)
    }

    pub fn is_pending(&self, ticket: PreloadTicket) -> bool {
        self.pending.contains_key(&ticket)
    }

    pub fn loaded(&self) -> &LoadedImageSet {
        &self.loaded
    }
}

/// Materialises a thumbnail off-screen so the row can switch without flicker.
pub trait ImageMaterializer: Send + Sync {
    /// Download and decode the image at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`AutocompleteError`] if the image cannot be fetched or decoded.
    fn materialize(&self, url: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Downloads thumbnails over HTTP and decodes them with the [`image`] crate.
#[derive(Debug, Clone)]
pub struct HttpImageMaterializer {
    client: reqwest::Client,
}

impl HttpImageMaterializer {
    /// # Errors
    ///
    /// Returns [`AutocompleteError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &AutocompleteConfig) -> Result<Self> {
        Ok(Self {
            client: crate::http::build_client(config)?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ImageMaterializer for HttpImageMaterializer {
    async fn materialize(&self, url: &str) -> Result<()> {
        tracing::trace!(url, "preloading thumbnail");
        let bytes = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AutocompleteError::Http(format!("thumbnail request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AutocompleteError::Http(format!("thumbnail HTTP error: {e}")))?
            .bytes()
            .await
            .map_err(|e| AutocompleteError::Http(format!("thumbnail read failed: {e}")))?;

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| AutocompleteError::Parse(format!("thumbnail decode failed: {e}")))?;
        tracing::trace!(
            url,
            width = decoded.width(),
            height = decoded.height(),
            "thumbnail decoded"
        );
        Ok(())
    }
}
