//! Event types for the juke notification system
//!
//! The engine communicates with front ends over two channels:
//! - **EventBus** (tokio::broadcast): one-to-many fire-and-forget
//!   notifications that front ends render (now playing, errors, teardown)
//! - **Command channels** (tokio::mpsc, per session): request → single
//!   handler, owned by the player crate
//!
//! Events are serializable so front ends can forward them as-is (e.g. over
//! SSE or a gateway socket).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::position::format_duration;

/// Tenant ("guild") key: an isolated ownership boundary with its own queue,
/// session and output sink
pub type TenantId = u64;

/// Notification events emitted by the playback engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A track started streaming into the tenant's sink
    NowPlaying {
        tenant: TenantId,
        session_id: Uuid,
        track: TrackInfo,
        timestamp: DateTime<Utc>,
    },

    /// A queued track could not be resolved or played; the session moved on
    TrackError {
        tenant: TenantId,
        session_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Tracks were appended to the tenant's queue
    QueueAdded {
        tenant: TenantId,
        session_id: Uuid,
        tracks: Vec<TrackInfo>,
        timestamp: DateTime<Utc>,
    },

    /// The session tore itself down and left the registry
    SessionEnded {
        tenant: TenantId,
        session_id: Uuid,
        reason: SessionEndReason,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    /// Tenant the event belongs to
    pub fn tenant(&self) -> TenantId {
        match self {
            PlayerEvent::NowPlaying { tenant, .. }
            | PlayerEvent::TrackError { tenant, .. }
            | PlayerEvent::QueueAdded { tenant, .. }
            | PlayerEvent::SessionEnded { tenant, .. } => *tenant,
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEndReason {
    /// Queue stayed empty past the inactivity timeout
    Timeout,
    /// Explicit stop command
    Stopped,
    /// Unrecoverable error (e.g. the sink vanished)
    Error,
}

/// Renderable view of a queued track for events and queue displays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Provider tag that resolves this entry ("file" or "extraction")
    pub source: String,
    /// Canonical query the provider uses to fetch a streaming URL
    pub query: String,
    pub artist: Option<String>,
    pub title: Option<String>,
    pub duration_secs: Option<u64>,
    /// Display tag of the submitting user
    pub requested_by: Option<String>,
}

impl std::fmt::Display for TrackInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title.as_deref().unwrap_or("Unknown title"))?;
        if let Some(artist) = &self.artist {
            write!(f, " by {}", artist)?;
        }
        if let Some(secs) = self.duration_secs {
            write!(f, " ({})", format_duration(std::time::Duration::from_secs(secs)))?;
        }
        if let Some(requested_by) = &self.requested_by {
            write!(f, " requested by {}", requested_by)?;
        }
        Ok(())
    }
}

/// Broadcast wrapper for one-to-many event fan-out
///
/// Send errors are ignored: an engine with no subscribed front end is a
/// valid state.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` undelivered events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event, ignoring the no-subscribers case
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_info() -> TrackInfo {
        TrackInfo {
            source: "extraction".to_string(),
            query: "https://example.com/watch?v=abc".to_string(),
            artist: Some("Foo".to_string()),
            title: Some("Bar".to_string()),
            duration_secs: Some(185),
            requested_by: Some("alice".to_string()),
        }
    }

    #[test]
    fn test_track_info_display_full() {
        assert_eq!(
            track_info().to_string(),
            "Bar by Foo (3:05) requested by alice"
        );
    }

    #[test]
    fn test_track_info_display_bare() {
        let info = TrackInfo {
            source: "file".to_string(),
            query: "https://example.com/song.mp3".to_string(),
            artist: None,
            title: None,
            duration_secs: None,
            requested_by: None,
        };
        assert_eq!(info.to_string(), "Unknown title");
    }

    #[tokio::test]
    async fn test_event_bus_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit_lossy(PlayerEvent::TrackError {
            tenant: 1,
            session_id: Uuid::new_v4(),
            message: "boom".to_string(),
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            PlayerEvent::TrackError { tenant, message, .. } => {
                assert_eq!(tenant, 1);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_bus_emit_without_subscribers() {
        let bus = EventBus::new(16);
        // Must not panic or error out
        bus.emit_lossy(PlayerEvent::SessionEnded {
            tenant: 7,
            session_id: Uuid::new_v4(),
            reason: SessionEndReason::Timeout,
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_event_serialization_tags_type() {
        let event = PlayerEvent::QueueAdded {
            tenant: 3,
            session_id: Uuid::new_v4(),
            tracks: vec![track_info()],
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "QueueAdded");
        assert_eq!(json["tenant"], 3);
    }
}
