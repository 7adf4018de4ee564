//! Raw feed records and the canonical article.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Response envelope returned by the remote feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    /// `"ok"` or `"error"`
    pub status: String,

    #[serde(default)]
    pub total_results: Option<u64>,

    #[serde(default)]
    pub articles: Vec<RawArticle>,

    /// Error code, set when `status` is `"error"`
    #[serde(default)]
    pub code: Option<String>,

    /// Error message, set when `status` is `"error"`
    #[serde(default)]
    pub message: Option<String>,
}

impl RawPayload {
    /// Whether the feed reported an API-level error.
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("error")
    }
}

/// Publisher reference inside a raw record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A record exactly as the remote feed delivered it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    #[serde(default)]
    pub source: Option<RawSource>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl RawArticle {
    /// Trimmed, non-empty source name.
    pub fn source_name(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Stable article identifier derived from record content.
///
/// The feed carries no identifier of its own, so one is hashed from the
/// source name and article URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    /// Identifier for an article with a known URL.
    pub fn from_source_and_url(source_name: &str, url: &str) -> Self {
        Self::hash(&["url", source_name, url])
    }

    /// Identifier for an article without a URL, hashed from its content.
    pub fn from_content(parts: &[&str]) -> Self {
        let mut tagged = Vec::with_capacity(parts.len() + 1);
        tagged.push("content");
        tagged.extend_from_slice(parts);
        Self::hash(&tagged)
    }

    fn hash(parts: &[&str]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            // unit separator keeps ("ab", "c") distinct from ("a", "bc")
            hasher.update([0x1f]);
        }
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A normalized article ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,

    pub title: Option<String>,

    /// Grouping and sort key; never empty
    pub source_name: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Article link with the transport scheme rewritten
    pub url: Option<Url>,

    /// Thumbnail link with the transport scheme rewritten
    pub image_url: Option<Url>,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    /// Thumbnail bytes written back after a successful image fetch
    #[serde(default, with = "hex_image", skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,

    pub fetched_at: DateTime<Utc>,
}

impl Article {
    /// Headline shown for the row, with a placeholder for untitled records.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }
}

/// Stores image bytes as a hex string inside the JSON store.
mod hex_image {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        let a = ArticleId::from_source_and_url("BBC", "http://x/a");
        let b = ArticleId::from_source_and_url("BBC", "http://x/a");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn id_separates_fields() {
        let a = ArticleId::from_source_and_url("ab", "c");
        let b = ArticleId::from_source_and_url("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn content_id_differs_from_url_id() {
        let by_url = ArticleId::from_source_and_url("BBC", "title");
        let by_content = ArticleId::from_content(&["BBC", "title"]);
        assert_ne!(by_url, by_content);
    }

    #[test]
    fn raw_source_name_is_trimmed() {
        let raw: RawArticle =
            serde_json::from_str(r#"{"source": {"id": null, "name": "  Reuters "}}"#).unwrap();
        assert_eq!(raw.source_name(), Some("Reuters"));

        let blank: RawArticle = serde_json::from_str(r#"{"source": {"name": "   "}}"#).unwrap();
        assert_eq!(blank.source_name(), None);
    }

    #[test]
    fn payload_reports_api_error() {
        let payload: RawPayload = serde_json::from_str(
            r#"{"status": "error", "code": "apiKeyInvalid", "message": "bad key"}"#,
        )
        .unwrap();
        assert!(payload.is_error());
        assert!(payload.articles.is_empty());
    }

    #[test]
    fn image_bytes_round_trip_as_hex() {
        let article = Article {
            id: ArticleId::from_source_and_url("A", "http://x/a"),
            title: None,
            source_name: "A".into(),
            author: None,
            description: None,
            url: None,
            image_url: None,
            published_at: None,
            image: Some(vec![0x89, 0x50, 0x4e, 0x47]),
            fetched_at: Utc::now(),
        };

        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["image"], "89504e47");

        let back: Article = serde_json::from_value(json).unwrap();
        assert_eq!(back.image, article.image);
    }
}
