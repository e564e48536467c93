//! Session registry
//!
//! Process-wide map from tenant key to its active playback session, and the
//! command surface front ends call. Sessions are created on the first
//! enqueue for a tenant (check-and-insert under one write lock, so two
//! sessions can never race into existence for the same key) and remove
//! their own entry on teardown.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot, RwLock};
use tracing::info;

use juke_common::position::parse_position;
use juke_common::{Error, EventBus, PlayerEvent, Result, TenantId, TrackInfo};

use crate::config::PlayerConfig;
use crate::playback::session::{PlaybackSession, SessionCommand, SessionMap, SessionStatus};
use crate::provider::extractor::{Extractor, YtDlpExtractor};
use crate::provider::probe::{HttpProbe, MediaProbe};
use crate::provider::search::{SearchBackend, YoutubeSearch};
use crate::provider::ProviderSet;
use crate::resolve::Resolver;
use crate::sink::SinkProvider;

/// Result of an enqueue: whether a session was created for it, and how many
/// tracks the query resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub new_session: bool,
    pub added: usize,
}

/// The engine's front door: one per process
#[derive(Clone)]
pub struct SessionRegistry {
    config: Arc<PlayerConfig>,
    resolver: Arc<Resolver>,
    providers: Arc<ProviderSet>,
    sinks: Arc<dyn SinkProvider>,
    events: EventBus,
    sessions: SessionMap,
}

impl SessionRegistry {
    /// Create a registry with the default backends (HEAD probe, YouTube
    /// search, yt-dlp extraction) configured from `config`
    pub fn new(config: PlayerConfig, sinks: Arc<dyn SinkProvider>) -> Self {
        let extractor: Arc<dyn Extractor> = Arc::new(YtDlpExtractor::new(&config));
        let probe: Arc<dyn MediaProbe> = Arc::new(HttpProbe::new());
        let search: Arc<dyn SearchBackend> = Arc::new(YoutubeSearch::new(config.search.clone()));
        Self::with_backends(config, probe, search, extractor, sinks)
    }

    /// Create a registry with explicit capability implementations
    pub fn with_backends(
        config: PlayerConfig,
        probe: Arc<dyn MediaProbe>,
        search: Arc<dyn SearchBackend>,
        extractor: Arc<dyn Extractor>,
        sinks: Arc<dyn SinkProvider>,
    ) -> Self {
        let config = Arc::new(config);
        let providers = Arc::new(ProviderSet::new(
            extractor,
            &config.proxies,
            config.max_concurrent_extractions,
        ));
        let resolver = Arc::new(Resolver::new(probe, search, Arc::clone(&providers)));
        Self {
            config,
            resolver,
            providers,
            sinks,
            events: EventBus::default(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to the engine's notification events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Resolve `raw_query` and append the results to the tenant's queue,
    /// creating a session if none is live
    pub async fn enqueue(
        &self,
        tenant: TenantId,
        raw_query: &str,
        requested_by: &str,
        elevated: bool,
    ) -> Result<EnqueueReceipt> {
        let tracks = self
            .resolver
            .resolve(raw_query, Some(requested_by), elevated)
            .await?;
        let added = tracks.len();

        let mut sessions = self.sessions.write().await;
        let (new_session, handle) = match sessions.get(&tenant) {
            Some(handle) if !handle.commands.is_closed() => (false, handle.clone()),
            _ => {
                let handle = PlaybackSession::spawn(
                    tenant,
                    Arc::clone(&self.config),
                    Arc::clone(&self.providers),
                    Arc::clone(&self.sinks),
                    self.events.clone(),
                    Arc::clone(&self.sessions),
                );
                info!("created session {} for tenant {}", handle.id, tenant);
                sessions.insert(tenant, handle.clone());
                (true, handle)
            }
        };
        handle
            .commands
            .send(SessionCommand::Enqueue(tracks))
            .map_err(|_| Error::Internal("session command channel closed".to_string()))?;

        Ok(EnqueueReceipt { new_session, added })
    }

    /// Stop the current stream and advance to the next queued track
    pub async fn skip(&self, tenant: TenantId) -> Result<()> {
        self.send_command(tenant, SessionCommand::Skip).await
    }

    /// Seek within the current track. The position spec is validated before
    /// any session state is touched.
    pub async fn seek(&self, tenant: TenantId, position_spec: &str) -> Result<()> {
        let position = parse_position(position_spec)?;
        self.send_command(tenant, SessionCommand::SeekTo(position))
            .await
    }

    /// Set the session's persistent volume, in percent
    pub async fn set_volume(&self, tenant: TenantId, percent: u16) -> Result<()> {
        self.send_command(tenant, SessionCommand::SetVolume(percent))
            .await
    }

    /// Clear the queue and tear the tenant's session down. Idempotent
    /// against a session that is already draining.
    pub async fn stop(&self, tenant: TenantId) -> Result<()> {
        let sessions = self.sessions.read().await;
        let handle = sessions.get(&tenant).ok_or(Error::NotPlaying)?;
        // Best-effort: a channel closed mid-teardown is a valid no-op target
        let _ = handle.commands.send(SessionCommand::Stop);
        Ok(())
    }

    /// Ordered view of the tenant's pending queue
    pub async fn peek_queue(&self, tenant: TenantId) -> Result<Vec<TrackInfo>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send_command(tenant, SessionCommand::PeekQueue(reply_tx))
            .await?;
        reply_rx.await.map_err(|_| Error::NotPlaying)
    }

    /// Lifecycle state of the tenant's session, if one is registered
    pub async fn session_status(&self, tenant: TenantId) -> Option<SessionStatus> {
        let handle = self.sessions.read().await.get(&tenant).cloned();
        match handle {
            Some(handle) => Some(*handle.status.read().await),
            None => None,
        }
    }

    /// Number of registered sessions
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn send_command(&self, tenant: TenantId, command: SessionCommand) -> Result<()> {
        let sessions = self.sessions.read().await;
        let handle = sessions.get(&tenant).ok_or(Error::NotPlaying)?;
        handle.commands.send(command).map_err(|_| Error::NotPlaying)?;
        Ok(())
    }
}
