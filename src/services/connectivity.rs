// src/services/connectivity.rs

//! Network reachability probe.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::utils::url::get_domain;

/// Answers whether the network is currently reachable.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Probe that opens a TCP connection to the feed host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Probe the host serving `url`.
    pub fn for_url(url: &Url, timeout: Duration) -> Result<Self> {
        let host = get_domain(url)
            .ok_or_else(|| AppError::config(format!("URL '{url}' has no host to probe")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| AppError::config(format!("URL '{url}' has no known port")))?;
        Ok(Self::new(host, port, timeout))
    }

    /// Probe the configured feed host.
    pub fn from_config(config: &Config) -> Result<Self> {
        let url = Url::parse(&config.feed.base_url)?;
        Self::for_url(&url, Duration::from_millis(config.http.probe_timeout_ms))
    }
}

#[async_trait]
impl Connectivity for TcpProbe {
    async fn is_online(&self) -> bool {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                log::debug!("Probe {}:{} failed: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                log::debug!("Probe {}:{} timed out", self.host, self.port);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn probe_uses_default_port() {
        let url = Url::parse("https://NewsAPI.org/v2").unwrap();
        let probe = TcpProbe::for_url(&url, Duration::from_millis(10)).unwrap();
        assert_eq!(probe.host, "newsapi.org");
        assert_eq!(probe.port, 443);
    }

    #[tokio::test]
    async fn probe_reports_listening_host_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(1));
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn probe_reports_closed_port_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = TcpProbe::new("127.0.0.1", port, Duration::from_secs(1));
        assert!(!probe.is_online().await);
    }
}
