//! HTTP API for controlling the conversation session
//!
//! This module provides a REST API over the session controller:
//! - POST /conversation/{toggle,start,stop} - Session lifecycle
//! - POST /conversation/message - Send user text
//! - POST /conversation/{mute,speaker} - Mic mute / local speaker output
//! - GET /conversation/status - Current session snapshot
//! - GET /archive/status, POST /archive/retry - Recording archival
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
