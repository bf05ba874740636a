use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection state of the live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    #[serde(alias = "connected")]
    Active,
    Reconnecting,
    Disconnected,
}

impl ConnectionState {
    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Any state may return to `Idle` (stop, or a failed connect attempt).
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (_, Idle)
                | (Idle, Connecting)
                | (Connecting, Active)
                | (Connecting, Disconnected)
                | (Active, Reconnecting)
                | (Active, Disconnected)
                | (Reconnecting, Active)
                | (Reconnecting, Disconnected)
        )
    }

    /// Whether messages can be sent in this state
    pub fn accepts_input(self) -> bool {
        matches!(self, ConnectionState::Active | ConnectionState::Reconnecting)
    }
}

/// What the remote agent is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Listening,
    Speaking,
    Thinking,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Agent,
}

/// A single message exchanged during the live session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,

    pub text: String,

    /// When this message was received or sent
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Agent,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Point-in-time view of the session controller, published to observers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Internal id of the live session, if any
    pub session_id: Option<Uuid>,

    pub connection: ConnectionState,

    /// Only meaningful while `connection` is `Active`
    pub agent: AgentState,

    /// Whether the microphone is muted on the remote side
    pub is_muted: bool,

    /// Local speaker output (never forwarded to the agent service)
    pub speaker_enabled: bool,

    /// When the live session started
    pub started_at: Option<DateTime<Utc>>,

    /// Messages of the live session, in arrival order
    pub messages: Vec<ChatMessage>,

    /// Most recent non-fatal error (e.g. a failed send)
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.connection != ConnectionState::Idle
    }
}
