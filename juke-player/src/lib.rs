//! # Juke Player Library (juke-player)
//!
//! Multi-tenant playback session engine.
//!
//! **Purpose:** own one playback session per tenant: a FIFO queue of
//! resolved tracks, a play/monitor loop driving an external audio sink, and
//! live control (skip, seek, volume, stop) with FIFO signal ordering.
//!
//! **Architecture:** one tokio task per active session; front ends talk to
//! the [`registry::SessionRegistry`] command surface and subscribe to
//! [`juke_common::PlayerEvent`] notifications. Track sources (direct media
//! URLs, pages needing extraction, text search terms) are resolved through
//! the [`resolve::Resolver`] pipeline and the provider capabilities.

pub mod config;
pub mod playback;
pub mod provider;
pub mod registry;
pub mod resolve;
pub mod sink;
pub mod track;

pub use juke_common::{Error, Result};
pub use playback::session::SessionStatus;
pub use registry::{EnqueueReceipt, SessionRegistry};
