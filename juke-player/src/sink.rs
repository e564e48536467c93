//! Output sink capability
//!
//! The audio transport is an external collaborator: something that turns a
//! streaming URL into audible output for one tenant. The engine only opens
//! streams, polls them, stops them and adjusts their volume. Front ends
//! supply the implementation (e.g. an ffmpeg transcode feeding a voice
//! gateway); tests supply mocks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use juke_common::{Result, TenantId};

/// Options applied when opening a stream
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Start offset within the track
    pub start_at: Option<Duration>,
    /// Output volume multiplier (1.0 = 100%)
    pub volume: f64,
    /// Apply the optional pitch/tempo transform
    pub elevated: bool,
}

/// One in-flight audio stream
#[async_trait]
pub trait AudioStream: Send + Sync {
    /// Whether the stream is still producing audio
    fn is_playing(&self) -> bool;

    /// Stop the stream; subsequent `is_playing` returns false
    async fn stop(&self);

    /// Adjust the live output multiplier without interrupting playback
    fn set_volume(&self, volume: f64);
}

/// The exclusive output transport of one tenant
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Open `url` for playback
    async fn open(&self, url: &str, options: OpenOptions) -> Result<Box<dyn AudioStream>>;

    /// Whether the transport is still attached (false once it vanished
    /// externally, e.g. the voice channel was closed under the session)
    fn is_connected(&self) -> bool;

    /// Release the transport
    async fn disconnect(&self);
}

/// Hands a session the sink for its tenant
#[async_trait]
pub trait SinkProvider: Send + Sync {
    async fn connect(&self, tenant: TenantId) -> Result<Arc<dyn AudioSink>>;
}
