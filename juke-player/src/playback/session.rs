//! Playback session state machine
//!
//! One session per tenant, driven by a single tokio task that owns the
//! queue, resolves streaming locations, and monitors the open stream.
//! All control arrives over the session's command channel, so the loop
//! `select!`s over "command available" and the monitor tick instead of
//! polling shared flags; queue mutation and signal consumption never leave
//! the session task.
//!
//! Lifecycle: `Idle` (waiting for a track, bounded by the inactivity
//! timeout) → `Resolving` (asking the provider for a streaming location) →
//! `Playing` (stream open, monitoring) → `Draining` → `Closed`. Teardown
//! releases the sink and removes the registry entry on every exit path,
//! including panics in the drive loop.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::{interval, timeout_at, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use juke_common::{EventBus, PlayerEvent, Result, SessionEndReason, TenantId, TrackInfo};

use crate::config::PlayerConfig;
use crate::provider::ProviderSet;
use crate::sink::{AudioSink, AudioStream, OpenOptions, SinkProvider};
use crate::track::{CachedStream, TrackDescriptor};

use super::queue::SessionQueue;

/// Control signals and requests accepted by a running session, applied in
/// FIFO order per session
#[derive(Debug)]
pub enum SessionCommand {
    /// Append resolved tracks to the queue
    Enqueue(Vec<TrackDescriptor>),
    /// Stop the current stream; the loop advances as if it finished
    Skip,
    /// Reopen the current track at the given offset
    SeekTo(Duration),
    /// Update the persistent session volume (percent)
    SetVolume(u16),
    /// Clear the queue and tear the session down
    Stop,
    /// Ordered view of the pending queue
    PeekQueue(oneshot::Sender<Vec<TrackInfo>>),
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Queue empty, no stream, waiting for a track
    Idle,
    /// Asking the provider for a streaming location
    Resolving,
    /// Stream open, monitoring
    Playing,
    /// Stop requested or unrecoverable error, releasing the sink
    Draining,
    /// Terminal; the session left the registry
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Resolving => "resolving",
            SessionStatus::Playing => "playing",
            SessionStatus::Draining => "draining",
            SessionStatus::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

/// Handle the registry keeps for a live session
#[derive(Debug, Clone)]
pub(crate) struct SessionHandle {
    pub id: Uuid,
    pub commands: mpsc::UnboundedSender<SessionCommand>,
    pub status: Arc<RwLock<SessionStatus>>,
}

pub(crate) type SessionMap = Arc<RwLock<HashMap<TenantId, SessionHandle>>>;

/// The per-tenant state machine
pub(crate) struct PlaybackSession {
    tenant: TenantId,
    id: Uuid,
    config: Arc<PlayerConfig>,
    providers: Arc<ProviderSet>,
    sinks: Arc<dyn SinkProvider>,
    events: EventBus,
    sessions: SessionMap,
    status: Arc<RwLock<SessionStatus>>,
    queue: SessionQueue,
    volume_percent: u16,
    sink: Option<Arc<dyn AudioSink>>,
}

/// Outcome of playing one track: None advances to the next queued track
type TrackOutcome = Option<SessionEndReason>;

impl PlaybackSession {
    /// Create a session for `tenant` and spawn its driver task
    pub(crate) fn spawn(
        tenant: TenantId,
        config: Arc<PlayerConfig>,
        providers: Arc<ProviderSet>,
        sinks: Arc<dyn SinkProvider>,
        events: EventBus,
        sessions: SessionMap,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let status = Arc::new(RwLock::new(SessionStatus::Idle));
        let handle = SessionHandle {
            id: Uuid::new_v4(),
            commands: tx,
            status: Arc::clone(&status),
        };
        let volume_percent = config.default_volume_percent;
        let session = PlaybackSession {
            tenant,
            id: handle.id,
            config,
            providers,
            sinks,
            events,
            sessions,
            status,
            queue: SessionQueue::new(),
            volume_percent,
            sink: None,
        };
        tokio::spawn(session.run(rx));
        handle
    }

    /// The receiver stays outside the session state so the drive loop can
    /// `select!` on it while handlers mutate the session
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        info!("session {} started for tenant {}", self.id, self.tenant);
        let reason = match AssertUnwindSafe(self.drive(&mut commands)).catch_unwind().await {
            Ok(reason) => reason,
            Err(_) => {
                error!("session {} drive loop panicked", self.id);
                SessionEndReason::Error
            }
        };
        self.teardown(&mut commands, reason).await;
    }

    async fn drive(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    ) -> SessionEndReason {
        loop {
            let track = match self.next_track(commands).await {
                Ok(Some(track)) => track,
                Ok(None) => return SessionEndReason::Timeout,
                Err(reason) => return reason,
            };
            if let Some(reason) = self.play_track(commands, track).await {
                return reason;
            }
        }
    }

    /// Pop the next track, or wait for one up to the inactivity timeout.
    /// `Ok(None)` means the timeout elapsed with nothing queued.
    async fn next_track(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    ) -> std::result::Result<Option<TrackDescriptor>, SessionEndReason> {
        if let Some(track) = self.queue.pop_front() {
            return Ok(Some(track));
        }

        self.set_status(SessionStatus::Idle).await;
        let deadline = Instant::now() + self.config.inactivity_timeout();
        debug!(
            "session {} idle, waiting up to {:?} for a track",
            self.id,
            self.config.inactivity_timeout()
        );

        loop {
            match timeout_at(deadline, commands.recv()).await {
                Err(_) => return Ok(None),
                // Channel closed under the session: the registry is gone
                Ok(None) => return Err(SessionEndReason::Stopped),
                Ok(Some(command)) => match command {
                    SessionCommand::Enqueue(tracks) => {
                        self.apply_enqueue(tracks);
                        if let Some(track) = self.queue.pop_front() {
                            return Ok(Some(track));
                        }
                    }
                    SessionCommand::Stop => return Err(SessionEndReason::Stopped),
                    SessionCommand::SetVolume(percent) => self.volume_percent = percent,
                    SessionCommand::PeekQueue(reply) => {
                        let _ = reply.send(self.queue_info());
                    }
                    SessionCommand::Skip | SessionCommand::SeekTo(_) => {
                        debug!("session {}: ignoring control signal while idle", self.id);
                    }
                },
            }
        }
    }

    async fn play_track(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
        mut track: TrackDescriptor,
    ) -> TrackOutcome {
        self.set_status(SessionStatus::Resolving).await;

        let sink = match self.sink().await {
            Ok(sink) => sink,
            Err(e) => {
                error!("session {}: cannot attach sink: {}", self.id, e);
                self.notify_track_error(&track, &e);
                return Some(SessionEndReason::Error);
            }
        };

        let url = match self.stream_location(&mut track).await {
            Ok(url) => url,
            Err(e) => {
                warn!("session {}: cannot resolve '{}': {}", self.id, track.query, e);
                self.notify_track_error(&track, &e);
                return None;
            }
        };

        let options = OpenOptions {
            start_at: track.requested_position,
            volume: self.volume_multiplier(),
            elevated: track.elevated,
        };
        let stream = match sink.open(&url, options).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("session {}: cannot open stream for '{}': {}", self.id, track.query, e);
                self.notify_track_error(&track, &e);
                return None;
            }
        };

        info!("session {}: now playing {}", self.id, track);
        self.events.emit_lossy(PlayerEvent::NowPlaying {
            tenant: self.tenant,
            session_id: self.id,
            track: track.info(),
            timestamp: Utc::now(),
        });
        self.set_status(SessionStatus::Playing).await;
        self.monitor(commands, track, stream).await
    }

    /// Monitor the open stream, applying control signals as they arrive and
    /// checking stream/sink health on the fixed tick
    async fn monitor(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
        mut track: TrackDescriptor,
        mut stream: Box<dyn AudioStream>,
    ) -> TrackOutcome {
        let mut tick = interval(self.config.tick_interval());

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None => {
                        stream.stop().await;
                        return Some(SessionEndReason::Stopped);
                    }
                    Some(SessionCommand::Enqueue(tracks)) => self.apply_enqueue(tracks),
                    Some(SessionCommand::Skip) => {
                        info!("session {}: skipping {}", self.id, track);
                        stream.stop().await;
                        return None;
                    }
                    Some(SessionCommand::SeekTo(position)) => {
                        debug!("session {}: seeking to {:?}", self.id, position);
                        stream.stop().await;
                        match self.reopen_at(&mut track, position).await {
                            Ok(reopened) => stream = reopened,
                            Err(e) => {
                                warn!("session {}: seek failed: {}", self.id, e);
                                self.notify_track_error(&track, &e);
                                return None;
                            }
                        }
                    }
                    Some(SessionCommand::SetVolume(percent)) => {
                        self.volume_percent = percent;
                        stream.set_volume(self.volume_multiplier());
                        debug!("session {}: volume {}%", self.id, percent);
                    }
                    Some(SessionCommand::Stop) => {
                        info!("session {}: stop requested", self.id);
                        self.queue.clear();
                        stream.stop().await;
                        return Some(SessionEndReason::Stopped);
                    }
                    Some(SessionCommand::PeekQueue(reply)) => {
                        let _ = reply.send(self.queue_info());
                    }
                },
                _ = tick.tick() => {
                    let connected = self.sink.as_ref().map(|s| s.is_connected()).unwrap_or(false);
                    if !connected {
                        warn!("session {}: sink disconnected externally", self.id);
                        return Some(SessionEndReason::Error);
                    }
                    if !stream.is_playing() {
                        debug!("session {}: stream finished", self.id);
                        return None;
                    }
                }
            }
        }
    }

    /// Streaming location for a track, through its cache: a fresh cached
    /// location is reused as-is; a stale one re-resolves over the same
    /// egress path it was produced on
    async fn stream_location(&self, track: &mut TrackDescriptor) -> Result<String> {
        if let Some(cache) = track.fresh_stream() {
            debug!("session {}: reusing cached stream via {}", self.id, cache.egress);
            return Ok(cache.url.clone());
        }

        let preferred = track.cached_stream.as_ref().map(|c| c.egress.clone());
        let (egress, url) = self
            .providers
            .stream_location(track.provider, &track.query, preferred.as_ref())
            .await?;
        track.cached_stream = Some(CachedStream::new(egress, url.clone()));
        Ok(url)
    }

    async fn reopen_at(
        &mut self,
        track: &mut TrackDescriptor,
        position: Duration,
    ) -> Result<Box<dyn AudioStream>> {
        let url = self.stream_location(track).await?;
        let sink = self.sink().await?;
        sink.open(
            &url,
            OpenOptions {
                start_at: Some(position),
                volume: self.volume_multiplier(),
                elevated: track.elevated,
            },
        )
        .await
    }

    /// Tenant sink, attached on first use
    async fn sink(&mut self) -> Result<Arc<dyn AudioSink>> {
        if let Some(sink) = &self.sink {
            return Ok(Arc::clone(sink));
        }
        let sink = self.sinks.connect(self.tenant).await?;
        self.sink = Some(Arc::clone(&sink));
        Ok(sink)
    }

    fn apply_enqueue(&mut self, tracks: Vec<TrackDescriptor>) {
        if tracks.is_empty() {
            return;
        }
        info!("session {}: queued {} tracks", self.id, tracks.len());
        self.events.emit_lossy(PlayerEvent::QueueAdded {
            tenant: self.tenant,
            session_id: self.id,
            tracks: tracks.iter().map(|t| t.info()).collect(),
            timestamp: Utc::now(),
        });
        self.queue.append(tracks);
    }

    fn queue_info(&self) -> Vec<TrackInfo> {
        self.queue.snapshot().iter().map(|t| t.info()).collect()
    }

    fn notify_track_error(&self, track: &TrackDescriptor, error: &juke_common::Error) {
        self.events.emit_lossy(PlayerEvent::TrackError {
            tenant: self.tenant,
            session_id: self.id,
            message: format!("{}: {}", track, error),
            timestamp: Utc::now(),
        });
    }

    fn volume_multiplier(&self) -> f64 {
        f64::from(self.volume_percent) / 100.0
    }

    async fn set_status(&self, status: SessionStatus) {
        *self.status.write().await = status;
        debug!("session {} -> {}", self.id, status);
    }

    /// Release the sink, leave the registry, and flush leftover signals.
    /// Runs on every exit path.
    async fn teardown(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
        reason: SessionEndReason,
    ) {
        self.set_status(SessionStatus::Draining).await;

        // Remove the registry entry and close the command channel in one
        // critical section: from here on, an enqueue for this tenant
        // creates a fresh session instead of reaching this one
        {
            let mut sessions = self.sessions.write().await;
            commands.close();
            let ours = sessions
                .get(&self.tenant)
                .map(|handle| handle.id == self.id)
                .unwrap_or(false);
            if ours {
                sessions.remove(&self.tenant);
            }
        }

        // Flush signals accepted before removal
        while let Ok(command) = commands.try_recv() {
            match command {
                SessionCommand::PeekQueue(reply) => {
                    let _ = reply.send(Vec::new());
                }
                SessionCommand::Enqueue(tracks) if !tracks.is_empty() => {
                    warn!(
                        "session {}: dropping {} tracks enqueued during teardown",
                        self.id,
                        tracks.len()
                    );
                }
                _ => {}
            }
        }

        if let Some(sink) = self.sink.take() {
            sink.disconnect().await;
        }

        self.set_status(SessionStatus::Closed).await;
        self.events.emit_lossy(PlayerEvent::SessionEnded {
            tenant: self.tenant,
            session_id: self.id,
            reason,
            timestamp: Utc::now(),
        });
        info!("session {} closed ({:?})", self.id, reason);
    }
}
