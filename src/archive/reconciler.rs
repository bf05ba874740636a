use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::ArchivalError;
use super::matching::{select_summary, MatchWindow};
use super::media::resolve_format;
use super::provider::ConversationSummaryProvider;
use super::retry::{download_with_retry, RetryPolicy};
use crate::store::RecordStore;

/// Tunables for archival runs
#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfig {
    /// User the session records belong to
    pub user_id: String,

    /// Agent output format (e.g. `mp3_44100_128`), used when the download has no MIME type
    pub format_hint: Option<String>,

    pub window: MatchWindow,

    pub retry: RetryPolicy,
}

/// Result of an archival run that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The provider listed no conversations
    NoSummaries,

    /// The matched conversation was archived earlier in this process
    AlreadyArchived { conversation_id: String },

    Archived {
        conversation_id: String,
        session_id: Uuid,
        uri: String,
    },
}

/// Observable state of the reconciler
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchiveStatus {
    /// Whether a run currently holds the ledger
    pub in_flight: bool,

    /// Start time of the most recent session not yet archived
    pub pending_started_at: Option<DateTime<Utc>>,

    pub last_archived: Option<String>,

    pub last_error: Option<String>,

    pub archived_count: usize,
}

/// Conversations archived so far; held for the duration of a run
#[derive(Debug, Default)]
struct Ledger {
    archived: HashSet<String>,
}

/// Matches ended sessions to remote conversations and archives their audio
pub struct ArchivalReconciler {
    provider: Arc<dyn ConversationSummaryProvider>,
    store: Arc<dyn RecordStore>,
    config: ReconcilerConfig,
    ledger: Mutex<Ledger>,
    /// Kept outside the ledger so starting a session never waits on a run
    pending_started_at: Mutex<Option<DateTime<Utc>>>,
    status_tx: watch::Sender<ArchiveStatus>,
}

impl ArchivalReconciler {
    pub fn new(
        provider: Arc<dyn ConversationSummaryProvider>,
        store: Arc<dyn RecordStore>,
        config: ReconcilerConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(ArchiveStatus::default());

        Self {
            provider,
            store,
            config,
            ledger: Mutex::new(Ledger::default()),
            pending_started_at: Mutex::new(None),
            status_tx,
        }
    }

    /// Current archival status
    pub fn status(&self) -> ArchiveStatus {
        self.status_tx.borrow().clone()
    }

    /// Observe archival status changes
    pub fn subscribe(&self) -> watch::Receiver<ArchiveStatus> {
        self.status_tx.subscribe()
    }

    /// Remember when a live session started, for manual retries
    pub async fn note_session_start(&self, started_at: DateTime<Utc>) {
        *self.pending_started_at.lock().await = Some(started_at);
        self.status_tx
            .send_modify(|status| status.pending_started_at = Some(started_at));
    }

    /// Start time of the most recent session that has not been archived
    pub async fn pending_started_at(&self) -> Option<DateTime<Utc>> {
        *self.pending_started_at.lock().await
    }

    pub async fn is_archived(&self, conversation_id: &str) -> bool {
        self.ledger.lock().await.archived.contains(conversation_id)
    }

    /// Run archival in the background; nobody needs to await the handle
    pub fn spawn(self: &Arc<Self>, started_at: Option<DateTime<Utc>>) -> JoinHandle<Option<ArchiveOutcome>> {
        let reconciler = Arc::clone(self);
        tokio::spawn(async move { reconciler.archive_most_recent_conversation(started_at).await })
    }

    /// Re-run archival for the pending session (or the newest conversation if none)
    pub async fn retry_pending(self: &Arc<Self>) -> JoinHandle<Option<ArchiveOutcome>> {
        let started_at = self.pending_started_at().await;
        info!("Manual archive retry (started_at={:?})", started_at);
        self.spawn(started_at)
    }

    /// Archive the conversation belonging to a session started at `started_at`
    ///
    /// Failures are recorded in the status and logged, never returned.
    pub async fn archive_most_recent_conversation(
        &self,
        started_at: Option<DateTime<Utc>>,
    ) -> Option<ArchiveOutcome> {
        let mut ledger = self.ledger.lock().await;
        self.status_tx.send_modify(|status| status.in_flight = true);

        let result = self.run(&mut ledger, started_at).await;

        let archived_count = ledger.archived.len();
        drop(ledger);
        let pending_started_at = *self.pending_started_at.lock().await;

        match result {
            Ok(outcome) => {
                self.status_tx.send_modify(|status| {
                    status.in_flight = false;
                    status.archived_count = archived_count;
                    status.pending_started_at = pending_started_at;
                    // A run that did not fail supersedes any earlier failure
                    status.last_error = None;
                    if let ArchiveOutcome::Archived {
                        conversation_id, ..
                    } = &outcome
                    {
                        status.last_archived = Some(conversation_id.clone());
                    }
                });
                Some(outcome)
            }
            Err(e) => {
                match &e {
                    ArchivalError::NoMatch => warn!("Archival skipped: {}", e),
                    _ => error!("Archival failed: {}", e),
                }
                self.status_tx.send_modify(|status| {
                    status.in_flight = false;
                    status.last_error = Some(e.to_string());
                });
                None
            }
        }
    }

    async fn run(
        &self,
        ledger: &mut Ledger,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<ArchiveOutcome, ArchivalError> {
        let summaries = self
            .provider
            .list_summaries()
            .await
            .map_err(ArchivalError::ListSummaries)?;

        if summaries.is_empty() {
            info!("No conversations to archive");
            return Ok(ArchiveOutcome::NoSummaries);
        }

        let summary = select_summary(&summaries, started_at, Utc::now(), &self.config.window)
            .ok_or(ArchivalError::NoMatch)?;
        let conversation_id = summary.id.clone();

        if ledger.archived.contains(&conversation_id) {
            info!("Conversation {} already archived, skipping", conversation_id);
            return Ok(ArchiveOutcome::AlreadyArchived { conversation_id });
        }

        info!(
            "Archiving conversation {} (created {:?}, session started {:?})",
            conversation_id, summary.created_at, started_at
        );

        let record = match self
            .store
            .find_record(&conversation_id)
            .await
            .map_err(ArchivalError::Record)?
        {
            Some(record) => record,
            None => self
                .store
                .insert_record(
                    Uuid::new_v4(),
                    &self.config.user_id,
                    &conversation_id,
                    summary.agent_id.as_deref(),
                )
                .await
                .map_err(ArchivalError::Record)?,
        };

        let audio =
            download_with_retry(self.provider.as_ref(), &conversation_id, &self.config.retry).await?;

        let format = resolve_format(audio.mime_type.as_deref(), self.config.format_hint.as_deref());

        let uri = self
            .store
            .upload_audio(
                &audio.data,
                &record.user_id,
                record.id,
                format.extension,
                &format.mime_type,
            )
            .await
            .map_err(ArchivalError::Upload)?;

        ledger.archived.insert(conversation_id.clone());
        {
            let mut pending = self.pending_started_at.lock().await;
            if *pending == started_at {
                *pending = None;
            }
        }

        info!(
            "Archived conversation {} as {} ({})",
            conversation_id, uri, format.mime_type
        );

        Ok(ArchiveOutcome::Archived {
            conversation_id,
            session_id: record.id,
            uri,
        })
    }
}
