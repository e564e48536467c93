//! Lightweight media-type probe
//!
//! A HEAD request reading the Content-Type header, used to tell playable
//! media URLs apart from pages that need extraction.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use juke_common::{Error, Result};

/// Metadata probe capability
#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// MIME type of `url`, without parameters (`audio/mpeg`, `text/html`)
    async fn content_type(&self, url: &str) -> Result<String>;
}

/// HEAD-request probe
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaProbe for HttpProbe {
    async fn content_type(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| Error::Probe(format!("{}: {}", url, e)))?;

        let header = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Probe(format!("{}: no content type", url)))?;

        // Drop parameters such as "; charset=utf-8"
        let mime = header.split(';').next().unwrap_or(header).trim();
        Ok(mime.to_string())
    }
}
