//! Durable session records and archived audio blobs

mod fs;

pub use fs::FsRecordStore;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Links a remote conversation to an internal session and its archived audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Internal session id
    pub id: Uuid,

    pub user_id: String,

    /// Remote conversation id (one record per conversation)
    pub conversation_id: String,

    pub agent_id: Option<String>,

    /// Reference to the uploaded recording, once archived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_uri: Option<String>,
}

/// Persistence for session records and audio blobs
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the record for a conversation
    async fn find_record(&self, conversation_id: &str) -> Result<Option<SessionRecord>>;

    /// Create the record for a conversation
    ///
    /// If a record already exists for `conversation_id` the existing one is returned.
    async fn insert_record(
        &self,
        session_id: Uuid,
        user_id: &str,
        conversation_id: &str,
        agent_id: Option<&str>,
    ) -> Result<SessionRecord>;

    /// Store audio bytes for a session, returning a URI to the stored blob
    async fn upload_audio(
        &self,
        data: &[u8],
        user_id: &str,
        session_id: Uuid,
        extension: &str,
        mime_type: &str,
    ) -> Result<String>;
}
