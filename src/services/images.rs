// src/services/images.rs

//! Thumbnail download.

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::models::HttpConfig;
use crate::utils::http::create_async_client;

/// Asynchronous source of image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the image at `url`, or `None` if it is unavailable or not an image.
    async fn fetch_bytes(&self, url: &Url) -> Option<Vec<u8>>;
}

/// Image fetcher backed by `reqwest`.
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }

    async fn download(&self, url: &Url) -> reqwest::Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch_bytes(&self, url: &Url) -> Option<Vec<u8>> {
        match self.download(url).await {
            Ok(bytes) if is_image(&bytes) => Some(bytes),
            Ok(bytes) => {
                log::debug!("Discarding {} bytes from {}: not an image", bytes.len(), url);
                None
            }
            Err(e) => {
                log::debug!("Image fetch failed for {}: {}", url, e);
                None
            }
        }
    }
}

/// Whether `bytes` start with a known image file signature.
pub fn is_image(bytes: &[u8]) -> bool {
    const SIGNATURES: &[&[u8]] = &[
        b"\x89PNG\r\n\x1a\n",
        b"\xff\xd8\xff",
        b"GIF87a",
        b"GIF89a",
        b"BM",
    ];

    if SIGNATURES.iter().any(|sig| bytes.starts_with(sig)) {
        return true;
    }
    // RIFF....WEBP
    bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_common_formats() {
        assert!(is_image(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"));
        assert!(is_image(b"\xff\xd8\xff\xe0\0\x10JFIF"));
        assert!(is_image(b"GIF89a\x01\0"));
        assert!(is_image(b"RIFF\x24\0\0\0WEBPVP8 "));
    }

    #[test]
    fn rejects_html_and_empty_bodies() {
        assert!(!is_image(b"<!DOCTYPE html>"));
        assert!(!is_image(b""));
        assert!(!is_image(b"RIFF\x24\0\0\0WAVE"));
    }
}
