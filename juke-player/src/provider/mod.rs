//! Source providers
//!
//! A closed set of provider kinds resolves queue entries and streaming
//! locations, selected by the tag stored on each track descriptor:
//!
//! - **File**: the query is already a playable media URL; both operations
//!   are identity and no egress path applies.
//! - **Extraction**: the query needs the external extraction backend. When
//!   the default egress path reports the content as unavailable, extraction
//!   is raced concurrently across all configured alternate paths and the
//!   first success wins; any other failure, or an explicitly requested
//!   path, surfaces immediately without fallback.
//!
//! All extraction operations pass through one process-wide semaphore so
//! load produces backpressure instead of unbounded concurrent extractor
//! invocations.

pub mod extractor;
pub mod probe;
pub mod search;

use std::sync::Arc;
use std::time::Duration;

use futures::future::select_ok;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use juke_common::{Error, Result};

use crate::track::{EgressPath, ProviderKind};
use extractor::{ExtractError, ExtractedEntry, Extractor};

/// Descriptor fields produced by provider resolution
#[derive(Debug, Clone)]
pub struct TrackFields {
    /// Canonical query for later streaming-location fetches
    pub query: String,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub duration: Option<Duration>,
}

/// Provider dispatch: owns the extraction backend, the alternate egress
/// paths and the extraction concurrency limit
pub struct ProviderSet {
    extractor: Arc<dyn Extractor>,
    alternates: Vec<EgressPath>,
    permits: Arc<Semaphore>,
}

impl ProviderSet {
    pub fn new(extractor: Arc<dyn Extractor>, proxies: &[String], max_concurrent: usize) -> Self {
        Self {
            extractor,
            alternates: proxies
                .iter()
                .map(|url| EgressPath::Proxy(url.clone()))
                .collect(),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Resolve a query into descriptor fields; playlist queries yield many,
    /// in source order
    pub async fn resolve_many(&self, kind: ProviderKind, query: &str) -> Result<Vec<TrackFields>> {
        match kind {
            ProviderKind::File => Ok(vec![TrackFields {
                query: query.to_string(),
                artist: None,
                title: None,
                duration: None,
            }]),
            ProviderKind::Extraction => {
                let _permit = self.acquire_permit().await?;
                let (egress, entries) = self.extract_with_fallback(query).await?;
                debug!("resolved '{}' to {} entries via {}", query, entries.len(), egress);
                Ok(entries
                    .into_iter()
                    .map(|entry| normalize(entry, query))
                    .collect())
            }
        }
    }

    /// Fetch the streaming location for a single track query. A preferred
    /// egress path is honored exactly: no fallback race on failure.
    pub async fn stream_location(
        &self,
        kind: ProviderKind,
        query: &str,
        preferred: Option<&EgressPath>,
    ) -> Result<(EgressPath, String)> {
        match kind {
            ProviderKind::File => Ok((EgressPath::Direct, query.to_string())),
            ProviderKind::Extraction => {
                let _permit = self.acquire_permit().await?;
                let (egress, entries) = match preferred {
                    Some(path) => {
                        let entries = self.extractor.extract(query, path).await?;
                        (path.clone(), entries)
                    }
                    None => self.extract_with_fallback(query).await?,
                };
                if entries.len() != 1 {
                    return Err(Error::Extraction(format!(
                        "'{}' resolved to {} entries, expected one",
                        query,
                        entries.len()
                    )));
                }
                let url = entries.into_iter().next().and_then(|e| e.url).ok_or_else(|| {
                    Error::Extraction(format!("no streaming URL in extractor output for '{}'", query))
                })?;
                Ok((egress, url))
            }
        }
    }

    async fn acquire_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.permits
            .acquire()
            .await
            .map_err(|_| Error::Internal("extraction pool closed".to_string()))
    }

    /// Extract on the default path; on a content-unavailable failure, race
    /// all alternate paths and take the first success. All alternates
    /// failing surfaces the last error.
    async fn extract_with_fallback(
        &self,
        query: &str,
    ) -> std::result::Result<(EgressPath, Vec<ExtractedEntry>), ExtractError> {
        match self.extractor.extract(query, &EgressPath::Direct).await {
            Ok(entries) => Ok((EgressPath::Direct, entries)),
            Err(ExtractError::Unavailable(message)) if !self.alternates.is_empty() => {
                warn!(
                    "default egress reports '{}' unavailable ({}), racing {} alternate paths",
                    query,
                    message,
                    self.alternates.len()
                );
                let races = self.alternates.iter().map(|path| {
                    let path = path.clone();
                    async move {
                        let entries = self.extractor.extract(query, &path).await?;
                        Ok::<_, ExtractError>((path, entries))
                    }
                    .boxed()
                });
                let (winner, _losers) = select_ok(races).await?;
                Ok(winner)
            }
            Err(other) => Err(other),
        }
    }
}

/// Normalize raw extractor output into descriptor fields:
/// artist := artist, else creator, else uploader with a trailing
/// " - Topic" stripped; title := canonical track title, else raw title
fn normalize(entry: ExtractedEntry, fallback_query: &str) -> TrackFields {
    let query = entry
        .webpage_url
        .or_else(|| {
            entry
                .id
                .map(|id| format!("https://www.youtube.com/watch?v={}", id))
        })
        .unwrap_or_else(|| fallback_query.to_string());

    let artist = entry
        .artist
        .or(entry.creator)
        .or_else(|| entry.uploader.map(|u| strip_topic_suffix(&u)));
    let title = entry.track.or(entry.title);
    let duration = entry
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(Duration::from_secs_f64);

    TrackFields {
        query,
        artist,
        title,
        duration,
    }
}

/// Auto-generated uploader channels carry a " - Topic" suffix
fn strip_topic_suffix(uploader: &str) -> String {
    uploader
        .strip_suffix(" - Topic")
        .unwrap_or(uploader)
        .to_string()
}
