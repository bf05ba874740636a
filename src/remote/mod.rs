//! Boundary to the remote agent service that hosts live conversations
//!
//! A started session yields a handle for outgoing commands and an ordered
//! channel of events (connection state, agent state, messages, mute).

use anyhow::Result;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::session::{AgentState, ChatMessage, ConnectionState};

/// Options passed to the agent service when opening a session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Values substituted into the agent's prompt (e.g. user name)
    pub dynamic_variables: HashMap<String, String>,
}

/// Event emitted by a live remote session, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    Connection(ConnectionState),
    Agent(AgentState),
    Message(ChatMessage),
    Mute(bool),
}

/// A freshly opened remote session
pub struct RemoteSession {
    pub handle: Box<dyn SessionHandle>,
    pub events: mpsc::Receiver<RemoteEvent>,
}

/// Remote service that establishes live sessions
#[async_trait::async_trait]
pub trait RemoteSessionService: Send + Sync {
    /// Open a session with the given agent
    ///
    /// Fails with connection or authentication errors.
    async fn start(&self, agent_id: &str, options: SessionOptions) -> Result<RemoteSession>;
}

/// Commands for a live remote session
#[async_trait::async_trait]
pub trait SessionHandle: Send + Sync {
    /// Send user text to the agent
    async fn send_message(&self, text: &str) -> Result<()>;

    /// Mute or unmute the microphone on the remote side
    async fn set_muted(&self, muted: bool) -> Result<()>;

    /// Tear down the session; the event channel closes afterwards
    async fn end(&self) -> Result<()>;
}
