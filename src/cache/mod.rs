//! Position-indexed thumbnail cache.
//!
//! Slots are keyed by a row's current position in the displayed (sorted)
//! sequence. Positions are not identities: any structural change to that
//! sequence rebuilds the cache and bumps its generation, and every
//! asynchronous fill must present an [`ImageTicket`] whose generation and
//! article id still match the slot it targets. Late completions for a
//! previous layout are rejected instead of landing in a reassigned slot.

pub mod loader;

use std::sync::{Arc, RwLock};

use crate::models::ArticleId;

pub use loader::{ImageLoader, ImageReady};

/// Decoded thumbnail bytes shared between the cache and readers.
pub type ImageBytes = Arc<[u8]>;

/// Cache handle shared by the pipeline (reset) and the consumer (fill).
pub type SharedImageCache = Arc<RwLock<ImageCache>>;

/// Create an empty shared cache.
pub fn shared() -> SharedImageCache {
    Arc::new(RwLock::new(ImageCache::new()))
}

/// Identifies the slot an in-flight image fetch was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageTicket {
    pub position: usize,
    pub id: ArticleId,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct ImageCache {
    slots: Vec<Option<ImageBytes>>,
    /// position -> article id; empty when the layout is unknown
    order: Vec<ArticleId>,
    generation: u64,
}

impl ImageCache {
    pub fn new() -> Self {
        let mut cache = Self::default();
        cache.reset(0);
        cache
    }

    /// Image cached at `position`, if any. Never blocks or fetches.
    pub fn get(&self, position: usize) -> Option<ImageBytes> {
        self.slots.get(position).cloned().flatten()
    }

    /// Store an image at `position` without an identity check.
    ///
    /// Only safe from the context that owns the current layout; completions
    /// of asynchronous fetches go through [`fill`](Self::fill).
    pub fn set(&mut self, position: usize, image: ImageBytes) -> bool {
        match self.slots.get_mut(position) {
            Some(slot) => {
                *slot = Some(image);
                true
            }
            None => false,
        }
    }

    /// Discard everything and allocate `size` empty slots with no known layout.
    pub fn reset(&mut self, size: usize) {
        self.generation += 1;
        self.slots = vec![None; size];
        self.order.clear();
        log::debug!("Image cache reset to {} slots (generation {})", size, self.generation);
    }

    /// Discard everything and adopt `order` as the new position -> id layout.
    pub fn reset_with_order(&mut self, order: Vec<ArticleId>) {
        self.reset(order.len());
        self.order = order;
    }

    /// Drop all cached images and fence off in-flight fills, keeping the layout.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        log::debug!("Image cache invalidated (generation {})", self.generation);
    }

    /// Whether the known layout already equals `order`.
    pub fn matches_order(&self, order: &[ArticleId]) -> bool {
        self.order.len() == self.slots.len() && self.order == order
    }

    /// Ticket for fetching the image of `id` shown at `position`.
    pub fn ticket(&self, position: usize, id: &ArticleId) -> Option<ImageTicket> {
        if position >= self.slots.len() {
            return None;
        }
        if let Some(current) = self.order.get(position) {
            if current != id {
                return None;
            }
        }
        Some(ImageTicket {
            position,
            id: id.clone(),
            generation: self.generation,
        })
    }

    /// Accept a completed fetch if its ticket still describes the slot.
    ///
    /// Returns `false` and leaves the cache untouched for stale tickets.
    pub fn fill(&mut self, ticket: &ImageTicket, image: ImageBytes) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        if let Some(current) = self.order.get(ticket.position) {
            if current != &ticket.id {
                return false;
            }
        }
        self.set(ticket.position, image)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn id_at(&self, position: usize) -> Option<&ArticleId> {
        self.order.get(position)
    }

    /// Number of slots currently holding an image.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
