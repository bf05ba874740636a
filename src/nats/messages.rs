use anyhow::{anyhow, Context};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::archive::{ConversationSummary, DownloadError, DownloadedAudio};
use crate::remote::RemoteEvent;
use crate::session::{AgentState, ChatMessage, ConnectionState, MessageRole};

/// Request on `agent.session.start`
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStartRequest {
    /// Chosen by the client so it can subscribe to events before the session opens
    pub session_id: String,
    pub agent_id: String,
    #[serde(default)]
    pub dynamic_variables: HashMap<String, String>,
}

/// Reply to `agent.session.start`
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStartReply {
    #[serde(default)]
    pub accepted: bool,
    pub error: Option<String>,
}

/// Event published on `agent.session.<id>.events`
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEventMessage {
    Connection {
        state: ConnectionState,
    },
    Agent {
        mode: AgentState,
    },
    Message {
        role: MessageRole,
        text: String,
        timestamp: Option<DateTime<Utc>>,
    },
    Mute {
        muted: bool,
    },
}

impl From<SessionEventMessage> for RemoteEvent {
    fn from(msg: SessionEventMessage) -> Self {
        match msg {
            SessionEventMessage::Connection { state } => RemoteEvent::Connection(state),
            SessionEventMessage::Agent { mode } => RemoteEvent::Agent(mode),
            SessionEventMessage::Message {
                role,
                text,
                timestamp,
            } => RemoteEvent::Message(ChatMessage {
                role,
                text,
                timestamp: timestamp.unwrap_or_else(Utc::now),
            }),
            SessionEventMessage::Mute { muted } => RemoteEvent::Mute(muted),
        }
    }
}

/// User text published on `agent.session.<id>.input`
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInputMessage {
    pub text: String,
}

/// Published on `agent.session.<id>.mute`
#[derive(Debug, Serialize, Deserialize)]
pub struct MuteCommand {
    pub muted: bool,
}

/// Request on `agent.conversations.list`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConversationListRequest {
    /// Restrict to one agent's conversations
    pub agent_id: Option<String>,
}

/// Reply to `agent.conversations.list`
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationListReply {
    #[serde(default)]
    pub conversations: Vec<ConversationSummaryMessage>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationSummaryMessage {
    pub conversation_id: String,
    pub agent_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub sort_date: DateTime<Utc>,
}

impl From<ConversationSummaryMessage> for ConversationSummary {
    fn from(msg: ConversationSummaryMessage) -> Self {
        Self {
            id: msg.conversation_id,
            agent_id: msg.agent_id,
            created_at: msg.created_at,
            sort_date: msg.sort_date,
        }
    }
}

/// Request on `agent.conversations.audio`
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioRequest {
    pub conversation_id: String,
}

/// Reply to `agent.conversations.audio`
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioReply {
    /// Base64-encoded recording
    pub audio: Option<String>,
    pub mime_type: Option<String>,
    pub error: Option<ErrorBody>,
}

impl AudioReply {
    /// Decode the recording, mapping a `not_found` error to [`DownloadError::NotFound`]
    pub fn into_audio(self, conversation_id: &str) -> Result<DownloadedAudio, DownloadError> {
        if let Some(error) = self.error {
            if error.is_not_found() {
                return Err(DownloadError::NotFound(conversation_id.to_string()));
            }
            return Err(anyhow!("{}: {}", error.code, error.message).into());
        }

        let encoded = self
            .audio
            .ok_or_else(|| anyhow!("Reply for {} carried no audio", conversation_id))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .context("Audio payload is not valid base64")?;

        Ok(DownloadedAudio {
            data,
            mime_type: self.mime_type,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// `not_found` while the recording is still being processed
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorBody {
    pub const NOT_FOUND: &'static str = "not_found";

    pub fn is_not_found(&self) -> bool {
        self.code == Self::NOT_FOUND
    }
}
