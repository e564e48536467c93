//! Shared mock capabilities for integration tests
//!
//! Provides controllable stand-ins for every external collaborator: the
//! content-type probe, the search backend, the extraction backend, and the
//! per-tenant audio sink.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::timeout;

use juke_common::{PlayerEvent, Result, TenantId};
use juke_player::config::PlayerConfig;
use juke_player::provider::extractor::{ExtractError, ExtractedEntry, Extractor};
use juke_player::provider::probe::MediaProbe;
use juke_player::provider::search::SearchBackend;
use juke_player::sink::{AudioSink, AudioStream, OpenOptions, SinkProvider};
use juke_player::track::EgressPath;
use juke_player::{SessionRegistry, SessionStatus};

/// Engine configuration with short test timings
pub fn test_config() -> PlayerConfig {
    let mut config = PlayerConfig::default();
    config.inactivity_timeout_secs = 1;
    config.tick_interval_ms = 10;
    config
}

// ========================================
// Probe / search mocks
// ========================================

/// Classifies URLs by extension: `.mp3`/`.ogg` are audio, everything else
/// is a page
pub struct ExtensionProbe;

#[async_trait]
impl MediaProbe for ExtensionProbe {
    async fn content_type(&self, url: &str) -> Result<String> {
        if url.ends_with(".mp3") {
            Ok("audio/mpeg".to_string())
        } else if url.ends_with(".ogg") {
            Ok("audio/ogg".to_string())
        } else {
            Ok("text/html".to_string())
        }
    }
}

/// Search backend returning one canned hit (or nothing)
pub struct StaticSearch {
    pub hit: Option<String>,
}

#[async_trait]
impl SearchBackend for StaticSearch {
    async fn best_match(&self, _terms: &str) -> Result<Option<String>> {
        Ok(self.hit.clone())
    }
}

// ========================================
// Extractor mock
// ========================================

/// Canned extractor response for one egress path
#[derive(Clone)]
pub enum Canned {
    Entries(Vec<ExtractedEntry>),
    Unavailable(&'static str),
    Failed(&'static str),
}

/// Extractor with canned responses keyed by query (preferred) or by egress
/// path (for fallback scenarios), plus a call log
pub struct MockExtractor {
    by_query: Mutex<HashMap<String, Canned>>,
    by_path: Mutex<HashMap<EgressPath, Canned>>,
    calls: Mutex<Vec<(String, EgressPath)>>,
}

impl MockExtractor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            by_query: Mutex::new(HashMap::new()),
            by_path: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn respond_query(&self, query: &str, canned: Canned) {
        self.by_query
            .lock()
            .unwrap()
            .insert(query.to_string(), canned);
    }

    pub fn respond_path(&self, egress: EgressPath, canned: Canned) {
        self.by_path.lock().unwrap().insert(egress, canned);
    }

    pub fn calls(&self) -> Vec<(String, EgressPath)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        query: &str,
        egress: &EgressPath,
    ) -> std::result::Result<Vec<ExtractedEntry>, ExtractError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.to_string(), egress.clone()));
        let canned = self
            .by_query
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .or_else(|| self.by_path.lock().unwrap().get(egress).cloned());
        match canned {
            Some(Canned::Entries(entries)) => Ok(entries),
            Some(Canned::Unavailable(msg)) => Err(ExtractError::Unavailable(msg.to_string())),
            Some(Canned::Failed(msg)) => Err(ExtractError::Failed(msg.to_string())),
            None => Err(ExtractError::Failed("no canned response".to_string())),
        }
    }
}

/// A fully populated single-track extraction entry
pub fn extraction_entry(id: &str, stream_url: &str) -> ExtractedEntry {
    ExtractedEntry {
        id: Some(id.to_string()),
        webpage_url: Some(format!("https://example.com/watch?v={}", id)),
        title: Some(format!("title-{}", id)),
        uploader: Some("Uploader - Topic".to_string()),
        duration: Some(180.0),
        url: Some(stream_url.to_string()),
        ..Default::default()
    }
}

// ========================================
// Sink mocks
// ========================================

/// One recorded `open` call
#[derive(Debug, Clone)]
pub struct OpenRecord {
    pub url: String,
    pub start_at: Option<Duration>,
    pub volume: f64,
    pub elevated: bool,
}

/// Shared observable state of the mock sink
#[derive(Default)]
pub struct SinkState {
    opens: Mutex<Vec<OpenRecord>>,
    volume_log: Mutex<Vec<f64>>,
    connected: AtomicBool,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl SinkState {
    pub fn new() -> Arc<Self> {
        let state = Self::default();
        state.connected.store(true, Ordering::SeqCst);
        Arc::new(state)
    }

    /// Mark the most recently opened stream as finished
    pub fn finish_current(&self) {
        if let Some(playing) = self.current.lock().unwrap().as_ref() {
            playing.store(false, Ordering::SeqCst);
        }
    }

    /// Simulate the transport vanishing under the session
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn opens(&self) -> Vec<OpenRecord> {
        self.opens.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    pub fn volume_log(&self) -> Vec<f64> {
        self.volume_log.lock().unwrap().clone()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

struct MockStream {
    playing: Arc<AtomicBool>,
    state: Arc<SinkState>,
}

#[async_trait]
impl AudioStream for MockStream {
    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    async fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn set_volume(&self, volume: f64) {
        self.state.volume_log.lock().unwrap().push(volume);
    }
}

struct MockSink {
    state: Arc<SinkState>,
}

#[async_trait]
impl AudioSink for MockSink {
    async fn open(&self, url: &str, options: OpenOptions) -> Result<Box<dyn AudioStream>> {
        let playing = Arc::new(AtomicBool::new(true));
        *self.state.current.lock().unwrap() = Some(Arc::clone(&playing));
        self.state.opens.lock().unwrap().push(OpenRecord {
            url: url.to_string(),
            start_at: options.start_at,
            volume: options.volume,
            elevated: options.elevated,
        });
        Ok(Box::new(MockStream {
            playing,
            state: Arc::clone(&self.state),
        }))
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sink provider handing out sinks backed by one shared [`SinkState`]
pub struct MockSinks {
    pub state: Arc<SinkState>,
}

impl MockSinks {
    pub fn new(state: Arc<SinkState>) -> Arc<Self> {
        Arc::new(Self { state })
    }
}

#[async_trait]
impl SinkProvider for MockSinks {
    async fn connect(&self, _tenant: TenantId) -> Result<Arc<dyn AudioSink>> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockSink {
            state: Arc::clone(&self.state),
        }))
    }
}

// ========================================
// Assembly and waiting utilities
// ========================================

/// Everything a test needs: the registry plus handles on all the mocks
pub struct Harness {
    pub registry: SessionRegistry,
    pub extractor: Arc<MockExtractor>,
    pub sink: Arc<SinkState>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: PlayerConfig) -> Self {
        let extractor = MockExtractor::new();
        let sink = SinkState::new();
        let registry = SessionRegistry::with_backends(
            config,
            Arc::new(ExtensionProbe),
            Arc::new(StaticSearch { hit: None }),
            extractor.clone(),
            MockSinks::new(Arc::clone(&sink)),
        );
        Self {
            registry,
            extractor,
            sink,
        }
    }
}

/// Wait for the next event matching `predicate`, skipping others
pub async fn wait_for_event<F>(
    rx: &mut broadcast::Receiver<PlayerEvent>,
    predicate: F,
) -> PlayerEvent
where
    F: Fn(&PlayerEvent) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.expect("event stream closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Poll until `condition` holds
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition")
}

/// Poll until the tenant's session reports `status`
pub async fn wait_for_status(registry: &SessionRegistry, tenant: TenantId, status: SessionStatus) {
    timeout(Duration::from_secs(5), async {
        while registry.session_status(tenant).await != Some(status) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for session status")
}
