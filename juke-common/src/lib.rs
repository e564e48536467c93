//! # Juke Common Library
//!
//! Shared code between the playback engine and its front ends:
//! - Error taxonomy (`Error` enum)
//! - Notification event types (`PlayerEvent` enum) and the `EventBus`
//! - Seek position parsing and duration display formatting

pub mod error;
pub mod events;
pub mod position;

pub use error::{Error, Result};
pub use events::{EventBus, PlayerEvent, SessionEndReason, TenantId, TrackInfo};
