use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::archive::{MatchWindow, ReconcilerConfig, RetryPolicy};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub agent: AgentConfig,
    pub nats: NatsConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Agent used when a start request names none
    pub agent_id: String,

    /// Output format the agent produces (e.g. `mp3_44100_128`, `pcm_16000`)
    pub output_format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    /// Directory for session records and archived audio (`~` is expanded)
    pub root_path: String,

    /// Owner of the session records
    pub user_id: String,
}

impl StoreConfig {
    pub fn root(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root_path).as_ref())
    }
}

/// Provider latency assumptions used to match and fetch recordings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// How long before the session start a conversation may be dated
    pub backward_window_secs: i64,

    /// How far past "now" a conversation may be dated
    pub forward_window_secs: i64,

    /// Download attempts while the recording is still processing
    pub download_attempts: u32,

    pub retry_delay_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            backward_window_secs: 300, // 5 minutes
            forward_window_secs: 600,  // 10 minutes
            download_attempts: 3,
            retry_delay_secs: 3,
        }
    }
}

impl ArchiveConfig {
    pub fn match_window(&self) -> MatchWindow {
        MatchWindow {
            backward: chrono::Duration::seconds(self.backward_window_secs),
            forward: chrono::Duration::seconds(self.forward_window_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.download_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Answer to the microphone permission prompt when running headless
    pub microphone_allowed: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            microphone_allowed: true,
        }
    }
}

impl Config {
    /// Load `<path>.toml` (or any format the config crate detects), then
    /// `LOQA__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("LOQA").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            user_id: self.store.user_id.clone(),
            format_hint: self.agent.output_format.clone(),
            window: self.archive.match_window(),
            retry: self.archive.retry_policy(),
        }
    }
}
