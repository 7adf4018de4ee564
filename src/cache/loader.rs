//! Background thumbnail fetching.
//!
//! Each request runs on its own task and reports back through a
//! single-consumer channel as an immutable [`ImageReady`] message. The
//! owner of the cache drains the channel and decides whether the result is
//! still wanted; fetch tasks never touch shared state themselves.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::cache::ImageTicket;
use crate::services::ImageFetcher;

/// Finished thumbnail fetch.
#[derive(Debug, Clone)]
pub struct ImageReady {
    pub ticket: ImageTicket,
    /// `None` when the image could not be fetched
    pub bytes: Option<Vec<u8>>,
}

/// Spawns image fetches and forwards their results.
#[derive(Clone)]
pub struct ImageLoader {
    fetcher: Arc<dyn ImageFetcher>,
    tx: mpsc::UnboundedSender<ImageReady>,
}

impl ImageLoader {
    /// Create a loader and the receiving end its completions arrive on.
    pub fn channel(fetcher: Arc<dyn ImageFetcher>) -> (Self, mpsc::UnboundedReceiver<ImageReady>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { fetcher, tx }, rx)
    }

    /// Fetch `url` in the background for the slot described by `ticket`.
    ///
    /// Exactly one message is sent per request, including for failed fetches.
    pub fn request(&self, ticket: ImageTicket, url: Url) -> JoinHandle<()> {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let bytes = fetcher.fetch_bytes(&url).await;
            // receiver gone means the view was dropped
            let _ = tx.send(ImageReady { ticket, bytes });
        })
    }
}
