// src/pipeline/ingest.rs

//! Ingestion pipeline.
//!
//! One ingest is: check connectivity, fetch, classify or normalize, replace
//! the stored set in a single commit, reset the image cache, report.
//! Ingests are serialized; a second call waits for the one in flight. Row
//! deletes and clears take the same lock, so they never land inside a replace.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::{self, SharedImageCache};
use crate::error::{AppError, Result};
use crate::models::{Article, ArticleId, IngestOutcome, QueryConfiguration};
use crate::services::{ArticleSource, Connectivity};
use crate::storage::ArticleStore;

use super::classify::classify;
use super::normalize::Normalizer;

/// Orchestrates fetch, normalize, persist and cache reset.
pub struct Ingestor {
    source: Arc<dyn ArticleSource>,
    store: Arc<dyn ArticleStore>,
    connectivity: Arc<dyn Connectivity>,
    normalizer: Normalizer,
    cache: SharedImageCache,
    gate: Mutex<()>,
}

impl Ingestor {
    pub fn new(
        source: Arc<dyn ArticleSource>,
        store: Arc<dyn ArticleStore>,
        connectivity: Arc<dyn Connectivity>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            source,
            store,
            connectivity,
            normalizer,
            cache: cache::shared(),
            gate: Mutex::new(()),
        }
    }

    /// Image cache this pipeline resets after every successful ingest.
    pub fn cache(&self) -> SharedImageCache {
        Arc::clone(&self.cache)
    }

    pub fn store(&self) -> Arc<dyn ArticleStore> {
        Arc::clone(&self.store)
    }

    /// Run one ingest and report its outcome.
    ///
    /// Failures before the store is touched leave it exactly as it was.
    pub async fn ingest(&self, query: QueryConfiguration) -> IngestOutcome {
        let _gate = self.gate.lock().await;
        log::info!(
            "Ingest starting: {} (page size {})",
            query.endpoint(),
            query.page_size()
        );

        if !self.connectivity.is_online().await {
            log::warn!("Offline; keeping {} stored articles", self.stored_count().await);
            return IngestOutcome::NoConnection;
        }

        let payload = match self.source.fetch(&query).await {
            Ok(payload) => payload,
            Err(e) => {
                let online = self.connectivity.is_online().await;
                let outcome = classify(&e, online);
                log::warn!("Fetch failed ({}), classified as {:?}", e, outcome);
                return outcome;
            }
        };
        log::debug!(
            "Fetched {} records (feed reports {:?} total)",
            payload.articles.len(),
            payload.total_results
        );

        let batch = match self.normalizer.normalize_all(payload.articles, Utc::now()) {
            Ok(batch) => batch,
            Err(e) => {
                log::error!("Aborting ingest: {}", e);
                return IngestOutcome::InvalidPayload;
            }
        };
        if batch.skipped > 0 {
            log::warn!("Skipped {} malformed records", batch.skipped);
        }

        if let Err(e) = self.replace(batch.articles).await {
            log::error!("Store replace failed: {}", e);
            if let Err(rollback) = self.store.rollback().await {
                log::error!("Rollback failed: {}", rollback);
            }
            return IngestOutcome::Unknown(e.to_string());
        }

        match self.reset_cache().await {
            Ok(count) => {
                log::info!("Ingest complete: {} articles stored", count);
                IngestOutcome::Success(count)
            }
            Err(e) => {
                log::error!("Reading back stored articles failed: {}", e);
                IngestOutcome::Unknown(e.to_string())
            }
        }
    }

    /// Replace the stored set with `articles` in one commit.
    async fn replace(&self, articles: Vec<Article>) -> Result<()> {
        self.store.delete_all().await?;
        for article in articles {
            let id = article.id.clone();
            self.store.upsert(&id, article).await?;
        }
        self.store.commit().await
    }

    /// Rebuild the cache layout from the committed display order.
    async fn reset_cache(&self) -> Result<usize> {
        let order: Vec<_> = self
            .store
            .list_sorted()
            .await?
            .into_iter()
            .map(|article| article.id)
            .collect();
        let count = order.len();

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.reset_with_order(order);
        Ok(count)
    }

    async fn stored_count(&self) -> usize {
        self.store.count().await.unwrap_or_default()
    }

    /// Delete one stored article and rebuild the cache layout.
    ///
    /// Waits for any ingest in flight. Returns whether the article existed.
    pub async fn delete(&self, id: &ArticleId) -> Result<bool> {
        let _gate = self.gate.lock().await;
        if !self.store.delete(id).await? {
            self.store.rollback().await?;
            return Ok(false);
        }
        self.commit_structural().await?;
        log::info!("Deleted article {}", id);
        Ok(true)
    }

    /// Remove every stored article. Waits for any ingest in flight.
    pub async fn clear(&self) -> Result<()> {
        let _gate = self.gate.lock().await;
        self.store.delete_all().await?;
        self.commit_structural().await?;
        log::info!("Store cleared");
        Ok(())
    }

    async fn commit_structural(&self) -> Result<()> {
        if let Err(e) = self.store.commit().await {
            if let Err(rollback) = self.store.rollback().await {
                log::error!("Rollback failed: {}", rollback);
            }
            return Err(e);
        }
        self.reset_cache().await?;
        Ok(())
    }

    /// Ingest every `every`, forwarding each outcome on `outcomes`.
    ///
    /// The task ends when the receiving side is dropped. Fails if `every` is zero.
    pub fn spawn_periodic(
        self: Arc<Self>,
        query: QueryConfiguration,
        every: Duration,
        outcomes: mpsc::Sender<IngestOutcome>,
    ) -> Result<JoinHandle<()>> {
        if every.is_zero() {
            return Err(AppError::validation("ingest interval must be > 0"));
        }

        Ok(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let outcome = self.ingest(query.clone()).await;
                if outcomes.send(outcome).await.is_err() {
                    log::debug!("Outcome receiver dropped; stopping periodic ingest");
                    return;
                }
            }
        }))
    }
}
