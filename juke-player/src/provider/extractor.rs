//! Extraction backend capability
//!
//! Turns an arbitrary page URL (or extractor-recognized query) into track
//! metadata and streaming URLs by driving an external extraction tool. The
//! default implementation shells out to a yt-dlp compatible binary with JSON
//! dump output.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::PlayerConfig;
use crate::track::EgressPath;

/// Extraction failure, classified for the fallback policy
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The backend reported the content itself as unavailable on this
    /// egress path; alternate paths may still succeed
    #[error("content unavailable: {0}")]
    Unavailable(String),

    /// Any other failure (tool missing, malformed output, network, timeout);
    /// never triggers the egress race
    #[error("extraction failed: {0}")]
    Failed(String),
}

impl From<ExtractError> for juke_common::Error {
    fn from(err: ExtractError) -> Self {
        juke_common::Error::Extraction(err.to_string())
    }
}

/// One entry of raw extractor output, before display normalization
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedEntry {
    /// Canonical page URL, stored as the descriptor query for later
    /// re-extraction
    pub webpage_url: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
    /// Canonical track title (music metadata), preferred over `title`
    pub track: Option<String>,
    pub artist: Option<String>,
    pub creator: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    /// Resolved streaming URL of the selected format
    pub url: Option<String>,
}

/// External metadata/stream extraction capability
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract one or more entries for `query` over the given egress path.
    /// Playlist queries yield multiple entries in source order.
    async fn extract(
        &self,
        query: &str,
        egress: &EgressPath,
    ) -> Result<Vec<ExtractedEntry>, ExtractError>;
}

/// Extractor driving a yt-dlp compatible binary
pub struct YtDlpExtractor {
    binary: std::path::PathBuf,
    timeout: std::time::Duration,
}

impl YtDlpExtractor {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            binary: config.extractor.binary.clone(),
            timeout: config.extractor_timeout(),
        }
    }

    fn classify_failure(stderr: &str) -> ExtractError {
        let lowered = stderr.to_lowercase();
        if lowered.contains("unavailable") || lowered.contains("private video") {
            ExtractError::Unavailable(first_line(stderr))
        } else {
            ExtractError::Failed(first_line(stderr))
        }
    }
}

fn first_line(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
        .to_string()
}

/// Split a dump into its entries: playlists carry an `entries` array
/// (possibly with null holes for dead items), single videos are themselves
/// the only entry
fn entries_from_dump(dump: serde_json::Value) -> Result<Vec<ExtractedEntry>, ExtractError> {
    let raw_entries = match dump {
        serde_json::Value::Object(ref obj) if obj.contains_key("entries") => {
            match &obj["entries"] {
                serde_json::Value::Array(items) => items.clone(),
                _ => return Err(ExtractError::Failed("malformed entries field".to_string())),
            }
        }
        other => vec![other],
    };

    let mut entries = Vec::with_capacity(raw_entries.len());
    for raw in raw_entries {
        if raw.is_null() {
            warn!("skipping unavailable playlist entry");
            continue;
        }
        match serde_json::from_value::<ExtractedEntry>(raw) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("skipping unparsable playlist entry: {}", e),
        }
    }
    Ok(entries)
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(
        &self,
        query: &str,
        egress: &EgressPath,
    ) -> Result<Vec<ExtractedEntry>, ExtractError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-J")
            .arg("--no-warnings")
            .arg("-f")
            .arg("bestaudio/best")
            .arg(query)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let EgressPath::Proxy(proxy_url) = egress {
            cmd.arg("--proxy").arg(proxy_url);
        }

        debug!("extracting '{}' via {}", query, egress);
        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                ExtractError::Failed(format!("extractor timed out after {:?}", self.timeout))
            })?
            .map_err(|e| ExtractError::Failed(format!("cannot run extractor: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::classify_failure(&stderr));
        }

        let dump: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractError::Failed(format!("malformed extractor output: {}", e)))?;
        entries_from_dump(dump)
    }
}
