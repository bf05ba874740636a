use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider-side metadata of a completed conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,

    pub agent_id: Option<String>,

    /// When the conversation was created, if the provider reports it
    pub created_at: Option<DateTime<Utc>>,

    /// Provider's authoritative ordering key
    pub sort_date: DateTime<Utc>,
}

/// Audio recording fetched from the provider
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedAudio {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Errors from downloading a conversation's audio
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The provider has not finished processing the recording yet
    #[error("Recording not available yet for conversation {0}")]
    NotFound(String),

    #[error("Audio download failed: {0:#}")]
    Transport(#[from] anyhow::Error),
}

impl DownloadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DownloadError::NotFound(_))
    }
}

/// Lists completed conversations and serves their recordings
#[async_trait::async_trait]
pub trait ConversationSummaryProvider: Send + Sync {
    /// Recently completed conversations, in no particular order
    async fn list_summaries(&self) -> anyhow::Result<Vec<ConversationSummary>>;

    /// Final audio recording of a completed conversation
    async fn download_audio(&self, conversation_id: &str) -> Result<DownloadedAudio, DownloadError>;
}
