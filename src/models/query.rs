//! Query configuration handed to the ingestion pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Remote feed endpoint selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Endpoint {
    /// Breaking headlines
    #[default]
    TopHeadlines,
    /// Full article search
    Everything,
}

impl Endpoint {
    /// Path segment appended to the feed base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::TopHeadlines => "top-headlines",
            Endpoint::Everything => "everything",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Extra query parameter appended to the fetch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: String,
}

impl QueryParam {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Immutable description of one remote fetch.
///
/// Built once by the caller and passed by value into each ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfiguration {
    endpoint: Endpoint,
    page_size: u32,
    api_key: String,
    params: Vec<QueryParam>,
}

impl QueryConfiguration {
    /// Build a query, rejecting a zero page size or a blank API key.
    pub fn new(
        endpoint: Endpoint,
        page_size: u32,
        api_key: impl Into<String>,
        params: Vec<QueryParam>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if page_size == 0 {
            return Err(AppError::validation("page size must be > 0"));
        }
        if api_key.trim().is_empty() {
            return Err(AppError::validation("API key is empty"));
        }
        Ok(Self {
            endpoint,
            page_size,
            api_key,
            params,
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn params(&self) -> &[QueryParam] {
        &self.params
    }

    /// All query pairs in request order: page size, key, then extra params.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("pageSize".to_string(), self.page_size.to_string()),
            ("apiKey".to_string(), self.api_key.clone()),
        ];
        pairs.extend(
            self.params
                .iter()
                .map(|p| (p.name.clone(), p.value.clone())),
        );
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_page_size() {
        let result = QueryConfiguration::new(Endpoint::TopHeadlines, 0, "k", vec![]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn rejects_blank_api_key() {
        let result = QueryConfiguration::new(Endpoint::TopHeadlines, 10, "  ", vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn query_pairs_keep_param_order() {
        let query = QueryConfiguration::new(
            Endpoint::Everything,
            5,
            "key",
            vec![QueryParam::new("q", "rust"), QueryParam::new("language", "en")],
        )
        .unwrap();

        let names: Vec<String> = query.query_pairs().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["pageSize", "apiKey", "q", "language"]);
        assert_eq!(query.endpoint().path(), "everything");
    }

    #[test]
    fn endpoint_deserializes_kebab_case() {
        let endpoint: Endpoint = serde_json::from_str("\"top-headlines\"").unwrap();
        assert_eq!(endpoint, Endpoint::TopHeadlines);
    }
}
