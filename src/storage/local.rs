//! Local filesystem storage implementation.
//!
//! Keeps the committed set in memory and mirrors it to a single JSON file.
//! Every commit rewrites the file atomically (temp file, then rename), so a
//! crash mid-write leaves the previous set on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Article, ArticleId};
use crate::storage::{ArticleStore, StoreData, StoreState};

/// Local filesystem storage backend.
pub struct LocalStorage {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl LocalStorage {
    /// Open the store at `path`, loading any previously committed set.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let articles = match Self::read_json(&path).await? {
            Some(data) => {
                log::info!("Loaded {} articles from {}", data.articles.len(), path.display());
                data.articles
            }
            None => {
                log::warn!("No store found at {}, starting empty", path.display());
                Vec::new()
            }
        };

        Ok(Self {
            path,
            state: Mutex::new(StoreState::from_articles(articles)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_json(path: &Path) -> Result<Option<StoreData>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn persist(&self, articles: Vec<Article>) -> Result<()> {
        let data = StoreData::new(articles);
        let bytes = serde_json::to_vec_pretty(&data)?;
        Self::write_bytes(&self.path, &bytes)
            .await
            .map_err(|e| AppError::storage(self.path.display().to_string(), e))?;
        log::debug!("Persisted {} articles to {}", data.count, self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ArticleStore for LocalStorage {
    async fn upsert(&self, id: &ArticleId, article: Article) -> Result<()> {
        if &article.id != id {
            return Err(AppError::validation(format!(
                "upsert key {} does not match article id {}",
                id, article.id
            )));
        }
        self.state.lock().await.upsert(article);
        Ok(())
    }

    async fn delete(&self, id: &ArticleId) -> Result<bool> {
        Ok(self.state.lock().await.remove(id))
    }

    async fn delete_all(&self) -> Result<()> {
        self.state.lock().await.clear();
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let Some(pending) = state.pending() else {
            return Ok(());
        };
        // staged writes survive a failed persist so the caller can roll back
        self.persist(pending).await?;
        state.commit();
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.state.lock().await.rollback();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.lock().await.count())
    }

    async fn list_sorted(&self) -> Result<Vec<Article>> {
        Ok(self.state.lock().await.sorted())
    }

    async fn get(&self, id: &ArticleId) -> Result<Option<Article>> {
        Ok(self.state.lock().await.get(id).cloned())
    }

    async fn store_image(&self, id: &ArticleId, bytes: Vec<u8>) -> Result<bool> {
        let mut state = self.state.lock().await;
        if !state.set_image(id, bytes) {
            return Ok(false);
        }
        self.persist(state.sorted()).await?;
        Ok(true)
    }
}
