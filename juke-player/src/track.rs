//! Track descriptors
//!
//! A [`TrackDescriptor`] is the immutable-after-resolution record of one
//! queue entry: which provider refreshes it, the query that provider needs,
//! display metadata, and a lazily populated streaming-location cache.

use std::time::{Duration, Instant};

use juke_common::TrackInfo;

/// How long a resolved streaming location stays reusable before the session
/// re-resolves it (extraction backends hand out expiring URLs)
pub const STREAM_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Which provider resolves and refreshes a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// The query is itself a playable media URL
    File,
    /// The query needs external extraction to produce a streaming URL
    Extraction,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::File => "file",
            ProviderKind::Extraction => "extraction",
        }
    }
}

/// A named network path used when contacting an extraction backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EgressPath {
    /// No proxy, the process's own egress
    Direct,
    /// Egress through the given proxy URL
    Proxy(String),
}

impl std::fmt::Display for EgressPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EgressPath::Direct => write!(f, "direct"),
            EgressPath::Proxy(url) => write!(f, "proxy {}", url),
        }
    }
}

/// A resolved streaming location, keyed by the egress path that produced it
///
/// Reused only for the same egress path; a different requested path
/// invalidates the cache and forces re-resolution.
#[derive(Debug, Clone)]
pub struct CachedStream {
    pub egress: EgressPath,
    pub url: String,
    pub resolved_at: Instant,
}

impl CachedStream {
    pub fn new(egress: EgressPath, url: String) -> Self {
        Self {
            egress,
            url,
            resolved_at: Instant::now(),
        }
    }

    /// Whether the location is still inside the reuse window
    pub fn is_fresh(&self) -> bool {
        self.resolved_at.elapsed() < STREAM_CACHE_TTL
    }
}

/// One resolved-or-resolvable queue entry
#[derive(Debug, Clone)]
pub struct TrackDescriptor {
    /// Provider that turns `query` into a streaming URL
    pub provider: ProviderKind,
    /// Opaque query string the provider needs (original URL or canonical
    /// reference)
    pub query: String,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub duration: Option<Duration>,
    /// Display tag of the submitting user
    pub requested_by: Option<String>,
    /// Start offset carried over from a timestamped query
    pub requested_position: Option<Duration>,
    /// Apply the optional pitch/tempo transform at playback time
    pub elevated: bool,
    /// Lazily populated streaming location, reused on seek
    pub cached_stream: Option<CachedStream>,
}

impl TrackDescriptor {
    pub fn new(provider: ProviderKind, query: impl Into<String>) -> Self {
        Self {
            provider,
            query: query.into(),
            artist: None,
            title: None,
            duration: None,
            requested_by: None,
            requested_position: None,
            elevated: false,
            cached_stream: None,
        }
    }

    /// Renderable view for events and queue displays
    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            source: self.provider.as_str().to_string(),
            query: self.query.clone(),
            artist: self.artist.clone(),
            title: self.title.clone(),
            duration_secs: self.duration.map(|d| d.as_secs()),
            requested_by: self.requested_by.clone(),
        }
    }

    /// Cached streaming location, if still fresh
    pub fn fresh_stream(&self) -> Option<&CachedStream> {
        self.cached_stream.as_ref().filter(|c| c.is_fresh())
    }
}

impl std::fmt::Display for TrackDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.info())
    }
}
