//! Configuration for the playback engine
//!
//! Bootstrap configuration loaded from a TOML file by the embedding front
//! end. All values have built-in defaults defined in code; an empty file is
//! a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    /// Seconds an idle session waits for a new track before tearing down
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,

    /// Monitor tick interval while a track is playing, in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Volume a fresh session starts with, in percent
    #[serde(default = "default_volume_percent")]
    pub default_volume_percent: u16,

    /// Alternate egress proxy URLs raced when the default path reports
    /// content unavailable
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Upper bound on concurrent extraction operations across all sessions
    #[serde(default = "default_max_concurrent_extractions")]
    pub max_concurrent_extractions: usize,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

/// Settings for the external extraction tool
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    /// Extractor binary invoked for metadata/stream extraction
    #[serde(default = "default_extractor_binary")]
    pub binary: PathBuf,

    /// Seconds to wait for one extraction before giving up
    #[serde(default = "default_extractor_timeout_secs")]
    pub timeout_secs: u64,
}

/// Settings for the text-search backend
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// API key for the search service; search queries fail without one
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_search_region")]
    pub region: String,

    #[serde(default = "default_search_language")]
    pub language: String,

    #[serde(default = "default_search_max_results")]
    pub max_results: u8,
}

fn default_inactivity_timeout_secs() -> u64 {
    900 // 15 minutes
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_volume_percent() -> u16 {
    50
}

fn default_max_concurrent_extractions() -> usize {
    4
}

fn default_extractor_binary() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_extractor_timeout_secs() -> u64 {
    30
}

fn default_search_region() -> String {
    "US".to_string()
}

fn default_search_language() -> String {
    "en".to_string()
}

fn default_search_max_results() -> u8 {
    10
}

impl Default for PlayerConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize")
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: default_extractor_binary(),
            timeout_secs: default_extractor_timeout_secs(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            region: default_search_region(),
            language: default_search_language(),
            max_results: default_search_max_results(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn extractor_timeout(&self) -> Duration {
        Duration::from_secs(self.extractor.timeout_secs)
    }
}
