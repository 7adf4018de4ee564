// src/pipeline/normalize.rs

//! Raw record normalization.

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Article, ArticleId, MalformedPolicy, NormalizeConfig, RawArticle};
use crate::utils::url::force_scheme;

/// Articles produced from one payload.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub articles: Vec<Article>,
    /// Records dropped under [`MalformedPolicy::Skip`]
    pub skipped: usize,
}

/// Rewrites raw feed records into canonical articles.
#[derive(Debug, Clone)]
pub struct Normalizer {
    scheme: String,
    policy: MalformedPolicy,
}

impl Normalizer {
    pub fn new(scheme: impl Into<String>, policy: MalformedPolicy) -> Self {
        Self {
            scheme: scheme.into(),
            policy,
        }
    }

    pub fn from_config(config: &NormalizeConfig) -> Self {
        Self::new(config.scheme.clone(), config.malformed)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Normalize one record.
    ///
    /// Fails with [`AppError::MalformedRecord`] when the source name is missing.
    pub fn normalize(&self, raw: RawArticle, fetched_at: DateTime<Utc>) -> Result<Article> {
        let source_name = raw
            .source_name()
            .ok_or_else(|| {
                AppError::malformed(format!(
                    "record '{}' has no source name",
                    raw.title.as_deref().unwrap_or("(untitled)")
                ))
            })?
            .to_string();

        let url = self.rewrite("url", raw.url.as_deref());
        let image_url = self.rewrite("urlToImage", raw.url_to_image.as_deref());
        let title = non_empty(raw.title);
        let description = non_empty(raw.description);

        let id = match &url {
            Some(url) => ArticleId::from_source_and_url(&source_name, url.as_str()),
            None => ArticleId::from_content(&[
                source_name.as_str(),
                title.as_deref().unwrap_or_default(),
                image_url.as_ref().map(Url::as_str).unwrap_or_default(),
                description.as_deref().unwrap_or_default(),
            ]),
        };

        let published_at = raw
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(Article {
            id,
            title,
            source_name,
            author: non_empty(raw.author),
            description,
            url,
            image_url,
            published_at,
            image: None,
            fetched_at,
        })
    }

    /// Normalize a whole payload according to the malformed-record policy.
    pub fn normalize_all(
        &self,
        raw: Vec<RawArticle>,
        fetched_at: DateTime<Utc>,
    ) -> Result<NormalizedBatch> {
        let mut batch = NormalizedBatch::default();
        for record in raw {
            match self.normalize(record, fetched_at) {
                Ok(article) => batch.articles.push(article),
                Err(e) if self.policy == MalformedPolicy::Skip => {
                    log::warn!("Skipping record: {}", e);
                    batch.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(batch)
    }

    fn rewrite(&self, field: &str, raw: Option<&str>) -> Option<Url> {
        let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
        let rewritten = force_scheme(raw, &self.scheme);
        if rewritten.is_none() {
            log::warn!("Dropping {} '{}': not an absolute URL for scheme {}", field, raw, self.scheme);
        }
        rewritten
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawSource;

    fn raw(source: Option<&str>, url: Option<&str>, image: Option<&str>) -> RawArticle {
        RawArticle {
            source: source.map(|name| RawSource {
                id: None,
                name: Some(name.to_string()),
            }),
            title: Some("Title".to_string()),
            url: url.map(String::from),
            url_to_image: image.map(String::from),
            ..RawArticle::default()
        }
    }

    fn normalizer() -> Normalizer {
        Normalizer::new("http", MalformedPolicy::Skip)
    }

    #[test]
    fn rewrites_every_url_field() {
        let article = normalizer()
            .normalize(
                raw(Some("A"), Some("https://x/a?q=1"), Some("ftp://img.example/p.jpg")),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(article.url.unwrap().as_str(), "http://x/a?q=1");
        assert_eq!(
            article.image_url.unwrap().as_str(),
            "http://img.example/p.jpg"
        );
    }

    #[test]
    fn absent_urls_stay_absent() {
        let article = normalizer()
            .normalize(raw(Some("A"), None, Some("   ")), Utc::now())
            .unwrap();
        assert!(article.url.is_none());
        assert!(article.image_url.is_none());
    }

    #[test]
    fn opaque_image_urls_are_dropped() {
        let article = normalizer()
            .normalize(
                raw(Some("A"), Some("https://x/a"), Some("data:image/png;base64,AAAA")),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(article.url.unwrap().as_str(), "http://x/a");
        assert!(article.image_url.is_none());
    }

    #[test]
    fn missing_source_is_malformed() {
        let result = normalizer().normalize(raw(None, Some("https://x/a"), None), Utc::now());
        assert!(matches!(result, Err(AppError::MalformedRecord(_))));
    }

    #[test]
    fn same_item_gets_same_id_across_schemes() {
        let n = normalizer();
        let a = n.normalize(raw(Some("A"), Some("https://x/a"), None), Utc::now()).unwrap();
        let b = n.normalize(raw(Some("A"), Some("http://x/a"), None), Utc::now()).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn urlless_records_use_content_hash() {
        let n = normalizer();
        let mut first = raw(Some("A"), None, None);
        first.title = Some("One".into());
        let mut second = raw(Some("A"), None, None);
        second.title = Some("Two".into());

        let a = n.normalize(first, Utc::now()).unwrap();
        let b = n.normalize(second, Utc::now()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn parses_published_at() {
        let mut record = raw(Some("A"), Some("https://x/a"), None);
        record.published_at = Some("2018-03-05T10:15:00Z".into());
        let article = normalizer().normalize(record, Utc::now()).unwrap();
        assert_eq!(
            article.published_at.unwrap().to_rfc3339(),
            "2018-03-05T10:15:00+00:00"
        );
    }

    #[test]
    fn skip_policy_drops_bad_records() {
        let batch = normalizer()
            .normalize_all(
                vec![raw(None, None, None), raw(Some("B"), Some("https://x/b"), None)],
                Utc::now(),
            )
            .unwrap();
        assert_eq!(batch.articles.len(), 1);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn abort_policy_fails_batch() {
        let n = Normalizer::new("http", MalformedPolicy::Abort);
        let result = n.normalize_all(
            vec![raw(Some("B"), Some("https://x/b"), None), raw(None, None, None)],
            Utc::now(),
        );
        assert!(result.is_err());
    }
}
