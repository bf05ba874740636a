use thiserror::Error;

use super::provider::DownloadError;

/// Failures of a single archival run
///
/// None of these reach the live session; they end up in `ArchiveStatus::last_error`.
#[derive(Error, Debug)]
pub enum ArchivalError {
    #[error("Failed to list conversations: {0:#}")]
    ListSummaries(anyhow::Error),

    #[error("No conversation matched the session window")]
    NoMatch,

    #[error("Failed to resolve session record: {0:#}")]
    Record(anyhow::Error),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Failed to upload audio: {0:#}")]
    Upload(anyhow::Error),
}
