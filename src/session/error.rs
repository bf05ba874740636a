use thiserror::Error;

/// Errors surfaced by the session controller
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("A conversation session is already active")]
    AlreadyActive,

    #[error("No active conversation session")]
    NoActiveSession,

    #[error("Session start was cancelled by stop")]
    Cancelled,

    #[error("Failed to connect to agent: {0:#}")]
    Connection(anyhow::Error),

    #[error("Failed to send message: {0:#}")]
    Send(anyhow::Error),
}
