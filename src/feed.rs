// src/feed.rs

//! Consumer side of the pipeline: what a display layer reads.
//!
//! A [`FeedView`] owns a snapshot of the committed articles in display order
//! and the receiving end of the thumbnail completion channel. It re-reads
//! the store only when told to (after an ingest outcome arrives), and it is
//! the only place completed image fetches are applied to the cache.
//! Structural changes (row deletes) go through the [`Ingestor`] so they are
//! serialized with ingests.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::{Arc, PoisonError};

use tokio::sync::mpsc;

use crate::cache::{ImageBytes, ImageLoader, ImageReady, ImageTicket, SharedImageCache};
use crate::error::Result;
use crate::models::Article;
use crate::pipeline::Ingestor;
use crate::services::ImageFetcher;
use crate::storage::ArticleStore;

/// Consecutive rows sharing a source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub rows: Range<usize>,
}

/// Image to show for a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// Fetched during this session
    Cached(ImageBytes),
    /// Persisted by an earlier session; a fresh fetch may be in flight
    Stored(ImageBytes),
    /// Nothing available yet
    Placeholder,
}

pub struct FeedView {
    ingestor: Arc<Ingestor>,
    store: Arc<dyn ArticleStore>,
    cache: SharedImageCache,
    loader: ImageLoader,
    completions: mpsc::UnboundedReceiver<ImageReady>,
    rows: Vec<Article>,
    requested: HashSet<ImageTicket>,
}

impl FeedView {
    /// View over the store and cache owned by `ingestor`.
    pub fn new(ingestor: Arc<Ingestor>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let (loader, completions) = ImageLoader::channel(fetcher);
        Self {
            store: ingestor.store(),
            cache: ingestor.cache(),
            ingestor,
            loader,
            completions,
            rows: Vec::new(),
            requested: HashSet::new(),
        }
    }

    /// Re-read the committed articles. Returns the row count.
    ///
    /// If the display order changed since the cache was last laid out, the
    /// cache is rebuilt for the new order.
    pub async fn refresh(&mut self) -> Result<usize> {
        self.rows = self.store.list_sorted().await?;
        let order: Vec<_> = self.rows.iter().map(|a| a.id.clone()).collect();

        let generation = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            if !cache.matches_order(&order) {
                cache.reset_with_order(order);
            }
            cache.generation()
        };
        self.requested.retain(|ticket| ticket.generation == generation);

        Ok(self.rows.len())
    }

    pub fn rows(&self) -> &[Article] {
        &self.rows
    }

    pub fn row(&self, position: usize) -> Option<&Article> {
        self.rows.get(position)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows grouped by source name, in display order.
    pub fn sections(&self) -> Vec<Section> {
        let mut sections: Vec<Section> = Vec::new();
        for (position, article) in self.rows.iter().enumerate() {
            match sections.last_mut() {
                Some(section) if section.name == article.source_name => {
                    section.rows.end = position + 1;
                }
                _ => sections.push(Section {
                    name: article.source_name.clone(),
                    rows: position..position + 1,
                }),
            }
        }
        sections
    }

    /// Image for the row at `position`.
    ///
    /// On a cache miss this starts a background fetch, so it must be called
    /// from within a tokio runtime.
    pub fn thumbnail(&mut self, position: usize) -> Thumbnail {
        let Some(article) = self.rows.get(position) else {
            return Thumbnail::Placeholder;
        };

        let cached = {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            (cache.id_at(position) == Some(&article.id))
                .then(|| cache.get(position))
                .flatten()
        };
        if let Some(image) = cached {
            return Thumbnail::Cached(image);
        }

        let stored = article.image.as_deref().map(ImageBytes::from);
        self.request_image(position);
        match stored {
            Some(image) => Thumbnail::Stored(image),
            None => Thumbnail::Placeholder,
        }
    }

    fn request_image(&mut self, position: usize) -> bool {
        let Some(article) = self.rows.get(position) else {
            return false;
        };
        let Some(url) = article.image_url.clone() else {
            return false;
        };
        let ticket = {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            cache.ticket(position, &article.id)
        };
        let Some(ticket) = ticket else {
            return false;
        };
        if !self.requested.insert(ticket.clone()) {
            return false;
        }

        log::debug!("Requesting thumbnail for row {} from {}", position, url);
        self.loader.request(ticket, url);
        true
    }

    /// Number of image fetches issued and not yet applied.
    pub fn pending(&self) -> usize {
        self.requested.len()
    }

    /// Apply every completion that has already arrived. Returns how many were accepted.
    pub async fn apply_completions(&mut self) -> Result<usize> {
        let mut accepted = 0;
        while let Ok(ready) = self.completions.try_recv() {
            if self.apply(ready).await? {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns whether it was accepted, or `None` once nothing is pending.
    pub async fn next_completion(&mut self) -> Result<Option<bool>> {
        if self.requested.is_empty() {
            return Ok(None);
        }
        match self.completions.recv().await {
            Some(ready) => self.apply(ready).await.map(Some),
            None => Ok(None),
        }
    }

    async fn apply(&mut self, ready: ImageReady) -> Result<bool> {
        let ImageReady { ticket, bytes } = ready;
        self.requested.remove(&ticket);
        let Some(bytes) = bytes else {
            log::debug!("No thumbnail available for row {}", ticket.position);
            return Ok(false);
        };

        let accepted = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            cache.fill(&ticket, ImageBytes::from(bytes.as_slice()))
        };
        if !accepted {
            log::debug!(
                "Discarding stale thumbnail for row {} (generation {})",
                ticket.position,
                ticket.generation
            );
            return Ok(false);
        }

        self.store.store_image(&ticket.id, bytes.clone()).await?;
        if let Some(row) = self.rows.get_mut(ticket.position) {
            if row.id == ticket.id {
                row.image = Some(bytes);
            }
        }
        Ok(true)
    }

    /// Delete the article at `position` and re-lay out the view.
    ///
    /// Returns `false` if the row no longer exists in the store, for example
    /// because an ingest replaced the set since the last refresh.
    pub async fn delete_row(&mut self, position: usize) -> Result<bool> {
        let Some(article) = self.rows.get(position) else {
            return Ok(false);
        };
        let id = article.id.clone();

        let deleted = self.ingestor.delete(&id).await?;
        if deleted {
            log::info!("Deleted row {}", position);
        }
        self.refresh().await?;
        Ok(deleted)
    }
}
