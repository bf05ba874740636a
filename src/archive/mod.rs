//! Post-session archival of conversation recordings
//!
//! After a live session ends, the provider produces the recording under a
//! conversation id we never saw. This module:
//! - matches the session to a provider conversation by time window
//! - polls for the recording while the provider is still processing it
//! - stores it in the record store, once per conversation

mod error;
mod matching;
mod media;
mod provider;
mod reconciler;
mod retry;

pub use error::ArchivalError;
pub use matching::{select_summary, MatchWindow};
pub use media::{resolve_format, AudioFormat};
pub use provider::{ConversationSummary, ConversationSummaryProvider, DownloadError, DownloadedAudio};
pub use reconciler::{ArchivalReconciler, ArchiveOutcome, ArchiveStatus, ReconcilerConfig};
pub use retry::{download_with_retry, RetryPolicy};
