//! Durable store adapter for articles.
//!
//! Writes are staged and only become visible to readers on `commit`, so a
//! half-finished replace is never observed and a failed one can be rolled
//! back. Reads always see the last committed set.
//!
//! ## File Layout
//!
//! ```text
//! storage/
//! └── articles.json     # committed article set, sorted by source name
//! ```

pub mod local;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Article, ArticleId};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Contents of the store file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreData {
    /// ISO 8601 timestamp of last commit
    pub updated_at: DateTime<Utc>,
    pub count: usize,
    pub articles: Vec<Article>,
}

impl StoreData {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: articles.len(),
            articles,
        }
    }
}

/// Trait for article storage backends.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Stage an insert-or-replace keyed by `id`.
    async fn upsert(&self, id: &ArticleId, article: Article) -> Result<()>;

    /// Stage removal of one article. Returns whether it existed.
    async fn delete(&self, id: &ArticleId) -> Result<bool>;

    /// Stage removal of every article.
    async fn delete_all(&self) -> Result<()>;

    /// Make staged writes durable and visible.
    async fn commit(&self) -> Result<()>;

    /// Discard staged writes.
    async fn rollback(&self) -> Result<()>;

    /// Number of committed articles.
    async fn count(&self) -> Result<usize>;

    /// Committed articles ordered by source name.
    async fn list_sorted(&self) -> Result<Vec<Article>>;

    async fn get(&self, id: &ArticleId) -> Result<Option<Article>>;

    /// Attach thumbnail bytes to a committed article and persist them.
    ///
    /// Returns `false` if the article no longer exists.
    async fn store_image(&self, id: &ArticleId, bytes: Vec<u8>) -> Result<bool>;
}

/// Committed article set plus any staged, uncommitted changes.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    committed: BTreeMap<ArticleId, Article>,
    staged: Option<BTreeMap<ArticleId, Article>>,
}

impl StoreState {
    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self {
            committed: articles.into_iter().map(|a| (a.id.clone(), a)).collect(),
            staged: None,
        }
    }

    fn working(&mut self) -> &mut BTreeMap<ArticleId, Article> {
        let committed = &self.committed;
        self.staged.get_or_insert_with(|| committed.clone())
    }

    pub fn upsert(&mut self, article: Article) {
        self.working().insert(article.id.clone(), article);
    }

    pub fn remove(&mut self, id: &ArticleId) -> bool {
        self.working().remove(id).is_some()
    }

    pub fn clear(&mut self) {
        self.working().clear();
    }

    /// Staged set awaiting commit, if any writes were made.
    pub fn pending(&self) -> Option<Vec<Article>> {
        self.staged.as_ref().map(|s| sorted(s.values().cloned()))
    }

    /// Promote staged writes. Returns whether anything changed.
    pub fn commit(&mut self) -> bool {
        match self.staged.take() {
            Some(staged) => {
                self.committed = staged;
                true
            }
            None => false,
        }
    }

    pub fn rollback(&mut self) {
        self.staged = None;
    }

    pub fn count(&self) -> usize {
        self.committed.len()
    }

    pub fn get(&self, id: &ArticleId) -> Option<&Article> {
        self.committed.get(id)
    }

    pub fn sorted(&self) -> Vec<Article> {
        sorted(self.committed.values().cloned())
    }

    /// Attach image bytes to the committed article and any staged copy.
    pub fn set_image(&mut self, id: &ArticleId, bytes: Vec<u8>) -> bool {
        if let Some(staged) = self.staged.as_mut().and_then(|s| s.get_mut(id)) {
            staged.image = Some(bytes.clone());
        }
        match self.committed.get_mut(id) {
            Some(article) => {
                article.image = Some(bytes);
                true
            }
            None => false,
        }
    }
}

/// Display order: source name, then title, then id.
fn sorted(articles: impl Iterator<Item = Article>) -> Vec<Article> {
    let mut articles: Vec<Article> = articles.collect();
    articles.sort_by(|a, b| {
        a.source_name
            .cmp(&b.source_name)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });
    articles
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn make_article(source: &str, title: &str) -> Article {
        let url = format!("http://example.com/{}/{}", source, title);
        Article {
            id: ArticleId::from_source_and_url(source, &url),
            title: Some(title.to_string()),
            source_name: source.to_string(),
            author: None,
            description: None,
            url: url::Url::parse(&url).ok(),
            image_url: None,
            published_at: None,
            image: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn staged_writes_are_invisible_until_commit() {
        let mut state = StoreState::default();
        state.upsert(make_article("A", "one"));

        assert_eq!(state.count(), 0);
        assert!(state.commit());
        assert_eq!(state.count(), 1);
        assert!(!state.commit());
    }

    #[test]
    fn rollback_restores_committed_set() {
        let mut state = StoreState::from_articles(vec![make_article("A", "one")]);
        state.clear();
        state.upsert(make_article("B", "two"));
        state.rollback();

        let titles: Vec<_> = state.sorted().into_iter().map(|a| a.source_name).collect();
        assert_eq!(titles, vec!["A"]);
    }

    #[test]
    fn sorted_by_source_then_title() {
        let state = StoreState::from_articles(vec![
            make_article("CNN", "b"),
            make_article("BBC", "z"),
            make_article("CNN", "a"),
        ]);

        let order: Vec<(String, String)> = state
            .sorted()
            .into_iter()
            .map(|a| (a.source_name, a.title.unwrap()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("BBC".to_string(), "z".to_string()),
                ("CNN".to_string(), "a".to_string()),
                ("CNN".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn set_image_reaches_staged_copy() {
        let article = make_article("A", "one");
        let id = article.id.clone();
        let mut state = StoreState::from_articles(vec![article]);
        state.upsert(make_article("B", "two"));

        assert!(state.set_image(&id, vec![1, 2, 3]));
        state.commit();
        assert_eq!(state.get(&id).unwrap().image, Some(vec![1, 2, 3]));
    }

    #[test]
    fn set_image_on_missing_article() {
        let mut state = StoreState::default();
        let id = ArticleId::from_source_and_url("A", "http://x");
        assert!(!state.set_image(&id, vec![1]));
    }
}
