//! In-memory storage backend.
//!
//! Same staging semantics as [`LocalStorage`](super::LocalStorage) without
//! touching the filesystem. Useful for tests and dry runs.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Article, ArticleId};
use crate::storage::{ArticleStore, StoreState};

#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<StoreState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `articles` already committed.
    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            state: Mutex::new(StoreState::from_articles(articles)),
        }
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
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
        self.state.lock().await.commit();
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
        Ok(self.state.lock().await.set_image(id, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::make_article;

    #[tokio::test]
    async fn delete_is_staged() {
        let article = make_article("A", "x");
        let id = article.id.clone();
        let storage = MemoryStorage::with_articles(vec![article]);

        assert!(storage.delete(&id).await.unwrap());
        assert_eq!(storage.count().await.unwrap(), 1);
        storage.commit().await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 0);
    }
}
