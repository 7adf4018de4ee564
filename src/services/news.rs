// src/services/news.rs

//! Remote article feed client.
//!
//! Issues one paginated request per ingest and hands back the raw payload.
//! Failures are reported as [`FetchError`] so the pipeline can classify
//! them; nothing here decides what a failure means to the caller.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, QueryConfiguration, RawPayload};
use crate::utils::http::create_async_client;

/// Low-level failure of a remote fetch.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The host could not be reached at all
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request failed before any payload arrived
    #[error("transport failed: {0}")]
    Transport(String),

    /// A payload arrived but did not match the expected schema
    #[error("payload could not be parsed: {message}")]
    Decode { payload: Vec<u8>, message: String },

    /// The server answered with a non-success status
    #[error("server answered with status {code}")]
    Status { code: u16, payload: Vec<u8> },

    /// The feed answered with its own error envelope
    #[error("feed error {code}: {message}")]
    Api { code: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Body received with the failure, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            FetchError::Decode { payload, .. } | FetchError::Status { payload, .. } => {
                Some(payload.as_slice())
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_timeout() || e.is_request() || e.is_body() || e.is_decode() {
            FetchError::Transport(e.to_string())
        } else {
            FetchError::Other(e.to_string())
        }
    }
}

/// Source of raw article payloads.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch one page of raw records described by `query`.
    async fn fetch(&self, query: &QueryConfiguration) -> std::result::Result<RawPayload, FetchError>;
}

/// HTTP client for a newsapi.org-style feed.
pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl NewsApiClient {
    /// Create a client rooted at `base_url`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "feed base URL '{base_url}' cannot carry an endpoint path"
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Create a client from the application configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = create_async_client(&config.http)?;
        Self::new(client, &config.feed.base_url)
    }

    /// Full request URL for a query.
    pub fn request_url(&self, query: &QueryConfiguration) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(query.endpoint().path());
        }
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        url
    }
}

#[async_trait]
impl ArticleSource for NewsApiClient {
    async fn fetch(&self, query: &QueryConfiguration) -> std::result::Result<RawPayload, FetchError> {
        let url = self.request_url(query);
        log::debug!(
            "Fetching {} from {} (page size {})",
            query.endpoint(),
            self.base_url,
            query.page_size()
        );

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        parse_payload(status, body.to_vec())
    }
}

/// Interpret a response status and body as a feed payload.
pub fn parse_payload(status: u16, body: Vec<u8>) -> std::result::Result<RawPayload, FetchError> {
    let success = (200..300).contains(&status);
    match serde_json::from_slice::<RawPayload>(&body) {
        Ok(payload) if payload.is_error() => Err(FetchError::Api {
            code: payload.code.unwrap_or_else(|| status.to_string()),
            message: payload.message.unwrap_or_default(),
        }),
        Ok(payload) if success => Ok(payload),
        Ok(_) => Err(FetchError::Status {
            code: status,
            payload: body,
        }),
        Err(_) if !success => Err(FetchError::Status {
            code: status,
            payload: body,
        }),
        Err(e) => Err(FetchError::Decode {
            payload: body,
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, QueryParam};

    fn client(base: &str) -> NewsApiClient {
        NewsApiClient::new(reqwest::Client::new(), base).unwrap()
    }

    #[test]
    fn request_url_appends_endpoint_and_params() {
        let query = QueryConfiguration::new(
            Endpoint::TopHeadlines,
            2,
            "k",
            vec![QueryParam::new("country", "pl")],
        )
        .unwrap();

        let url = client("https://newsapi.org/v2").request_url(&query);
        assert_eq!(
            url.as_str(),
            "https://newsapi.org/v2/top-headlines?pageSize=2&apiKey=k&country=pl"
        );

        let url = client("https://newsapi.org/v2/").request_url(&query);
        assert_eq!(url.path(), "/v2/top-headlines");
    }

    #[test]
    fn rejects_cannot_be_a_base_url() {
        assert!(NewsApiClient::new(reqwest::Client::new(), "mailto:news@example.com").is_err());
    }

    #[test]
    fn parses_ok_payload() {
        let body = br#"{"status":"ok","totalResults":1,"articles":[
            {"source":{"id":null,"name":"A"},"title":"T","url":"https://x/a","urlToImage":null}
        ]}"#;
        let payload = parse_payload(200, body.to_vec()).unwrap();
        assert_eq!(payload.total_results, Some(1));
        assert_eq!(payload.articles[0].source_name(), Some("A"));
    }

    #[test]
    fn malformed_body_is_decode_error_with_payload() {
        let err = parse_payload(200, b"<html>oops</html>".to_vec()).unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
        assert_eq!(err.payload(), Some(&b"<html>oops</html>"[..]));
    }

    #[test]
    fn error_envelope_is_api_error() {
        let body = br#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#;
        let err = parse_payload(401, body.to_vec()).unwrap_err();
        match err {
            FetchError::Api { code, message } => {
                assert_eq!(code, "apiKeyInvalid");
                assert!(message.contains("invalid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_error_status_is_status_error() {
        let err = parse_payload(503, b"Service Unavailable".to_vec()).unwrap_err();
        assert!(matches!(err, FetchError::Status { code: 503, .. }));
    }
}
