//! Live conversation session management
//!
//! This module provides the `SessionController` that manages:
//! - The connection state machine of one live session
//! - Agent state, messages and mute state from the remote session
//! - Local audio attach/detach and speaker output
//! - Handing ended sessions to the archival reconciler

mod controller;
mod error;
mod state;

pub use controller::SessionController;
pub use error::SessionError;
pub use state::{AgentState, ChatMessage, ConnectionState, MessageRole, SessionSnapshot};
