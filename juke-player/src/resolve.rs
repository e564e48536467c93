//! Resolution pipeline
//!
//! Classifies an arbitrary input string and dispatches it to the right
//! provider:
//!
//! 1. Input that is not a well-formed http(s) URL is a search term; the
//!    search backend supplies the best-matching canonical URL (already an
//!    extraction page, so the probe is skipped).
//! 2. A URL whose probed content type is top-level `audio` or `video` is a
//!    playable stream: File classification, query passed through unchanged.
//! 3. Anything else goes to the extraction provider, which may expand a
//!    playlist into many descriptors.
//!
//! A `t=<seconds>` parameter on the original URL carries through as the
//! requested start position when resolution yields exactly one track.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use url::Url;

use juke_common::{Error, Result};

use crate::provider::probe::MediaProbe;
use crate::provider::search::SearchBackend;
use crate::provider::ProviderSet;
use crate::track::{ProviderKind, TrackDescriptor};

/// Input classifier and provider dispatcher
pub struct Resolver {
    probe: Arc<dyn MediaProbe>,
    search: Arc<dyn SearchBackend>,
    providers: Arc<ProviderSet>,
}

impl Resolver {
    pub fn new(
        probe: Arc<dyn MediaProbe>,
        search: Arc<dyn SearchBackend>,
        providers: Arc<ProviderSet>,
    ) -> Self {
        Self {
            probe,
            search,
            providers,
        }
    }

    /// Resolve an input string into zero or more track descriptors
    pub async fn resolve(
        &self,
        input: &str,
        requested_by: Option<&str>,
        elevated: bool,
    ) -> Result<Vec<TrackDescriptor>> {
        let input = input.trim();

        let (query, kind) = if let Some(url) = parse_http_url(input) {
            let mime = self.probe.content_type(url.as_str()).await?;
            let top_level = mime.split('/').next().unwrap_or("");
            if top_level == "audio" || top_level == "video" {
                (input.to_string(), ProviderKind::File)
            } else {
                (input.to_string(), ProviderKind::Extraction)
            }
        } else {
            let hit = self
                .search
                .best_match(input)
                .await?
                .ok_or_else(|| Error::NotFound(input.to_string()))?;
            (hit, ProviderKind::Extraction)
        };
        debug!("classified '{}' as {} '{}'", input, kind.as_str(), query);

        let fields = self.providers.resolve_many(kind, &query).await?;
        let mut tracks: Vec<TrackDescriptor> = fields
            .into_iter()
            .map(|f| {
                let mut track = TrackDescriptor::new(kind, f.query);
                track.artist = f.artist;
                track.title = f.title;
                track.duration = f.duration;
                track.requested_by = requested_by.map(str::to_string);
                track.elevated = elevated;
                track
            })
            .collect();

        // A timestamped query seeks into its one track; a playlist has no
        // single target to seek into
        if tracks.len() == 1 {
            if let Some(position) = timestamp_hint(input) {
                tracks[0].requested_position = Some(position);
            }
        }

        Ok(tracks)
    }
}

/// Parse the input as a well-formed http(s) URL
fn parse_http_url(input: &str) -> Option<Url> {
    let url = Url::parse(input).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

/// Start offset encoded in the query string (`t=125` or `t=125s`)
fn timestamp_hint(input: &str) -> Option<Duration> {
    let url = parse_http_url(input)?;
    let value = url
        .query_pairs()
        .find(|(key, _)| key == "t")
        .map(|(_, value)| value.into_owned())?;
    let digits = value.strip_suffix('s').unwrap_or(&value);
    digits.parse::<u64>().ok().map(Duration::from_secs)
}
