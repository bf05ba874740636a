// Shared fakes for the integration tests
//
// Each collaborator is an in-memory stand-in that records what the core
// asked of it, so tests can assert on calls without a NATS server.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use loqa_conversations::{
    ArchivalReconciler, ConversationSummary, ConversationSummaryProvider, DownloadError,
    DownloadedAudio, HeadlessAudio, MatchWindow, RecordStore, ReconcilerConfig, RemoteEvent,
    RemoteSession, RemoteSessionService, RetryPolicy, SessionController, SessionHandle,
    SessionOptions, SessionRecord, StaticPermission,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use uuid::Uuid;

// ============================================================================
// Summary provider
// ============================================================================

#[derive(Default)]
pub struct FakeProvider {
    pub summaries: Mutex<Vec<ConversationSummary>>,
    /// Scripted download results; an empty script yields an mp3 payload
    pub downloads: Mutex<VecDeque<Result<DownloadedAudio, DownloadError>>>,
    pub download_calls: AtomicUsize,
    pub fail_list: AtomicBool,
}

impl FakeProvider {
    pub fn with_summaries(summaries: Vec<ConversationSummary>) -> Self {
        let provider = Self::default();
        *provider.summaries.lock().unwrap() = summaries;
        provider
    }

    pub fn set_summaries(&self, summaries: Vec<ConversationSummary>) {
        *self.summaries.lock().unwrap() = summaries;
    }

    pub fn push_download(&self, result: Result<DownloadedAudio, DownloadError>) {
        self.downloads.lock().unwrap().push_back(result);
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConversationSummaryProvider for FakeProvider {
    async fn list_summaries(&self) -> Result<Vec<ConversationSummary>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(anyhow!("provider unavailable"));
        }
        Ok(self.summaries.lock().unwrap().clone())
    }

    async fn download_audio(&self, _conversation_id: &str) -> Result<DownloadedAudio, DownloadError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.downloads.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(audio(Some("audio/mpeg"))))
    }
}

pub fn audio(mime_type: Option<&str>) -> DownloadedAudio {
    DownloadedAudio {
        data: b"fake-audio-bytes".to_vec(),
        mime_type: mime_type.map(str::to_string),
    }
}

pub fn summary(id: &str, created_at: Option<DateTime<Utc>>, sort_date: DateTime<Utc>) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        agent_id: Some("agent-1".to_string()),
        created_at,
        sort_date,
    }
}

// ============================================================================
// Record store
// ============================================================================

#[derive(Debug, Clone)]
pub struct Upload {
    pub session_id: Uuid,
    pub user_id: String,
    pub extension: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    pub records: Mutex<HashMap<String, SessionRecord>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub fail_upload: AtomicBool,
}

impl MemoryStore {
    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn record(&self, conversation_id: &str) -> Option<SessionRecord> {
        self.records.lock().unwrap().get(conversation_id).cloned()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn find_record(&self, conversation_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.record(conversation_id))
    }

    async fn insert_record(
        &self,
        session_id: Uuid,
        user_id: &str,
        conversation_id: &str,
        agent_id: Option<&str>,
    ) -> Result<SessionRecord> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(conversation_id.to_string())
            .or_insert_with(|| SessionRecord {
                id: session_id,
                user_id: user_id.to_string(),
                conversation_id: conversation_id.to_string(),
                agent_id: agent_id.map(str::to_string),
                audio_uri: None,
            });
        Ok(record.clone())
    }

    async fn upload_audio(
        &self,
        data: &[u8],
        user_id: &str,
        session_id: Uuid,
        extension: &str,
        mime_type: &str,
    ) -> Result<String> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(anyhow!("bucket unavailable"));
        }

        self.uploads.lock().unwrap().push(Upload {
            session_id,
            user_id: user_id.to_string(),
            extension: extension.to_string(),
            mime_type: mime_type.to_string(),
            size: data.len(),
        });

        Ok(format!("mem://{}/{}.{}", user_id, session_id, extension))
    }
}

// ============================================================================
// Remote session service
// ============================================================================

/// One session opened on the fake remote service
pub struct FakeSession {
    events: Mutex<Option<mpsc::Sender<RemoteEvent>>>,
    pub sent: Mutex<Vec<String>>,
    pub mute_calls: Mutex<Vec<bool>>,
    pub ended: AtomicBool,
    pub fail_send: AtomicBool,
    /// When set, the next send waits for a notification before completing
    send_gate: Mutex<Option<Arc<Notify>>>,
    fail_end: bool,
}

impl FakeSession {
    pub async fn emit(&self, event: RemoteEvent) {
        assert!(self.try_emit(event).await, "event channel closed");
    }

    /// Send an event, returning false if nobody is listening any more
    pub async fn try_emit(&self, event: RemoteEvent) -> bool {
        let sender = self.events.lock().unwrap().clone();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Close the event stream as a remote hang-up would
    pub fn close(&self) {
        self.events.lock().unwrap().take();
    }

    pub fn hold_send(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.send_gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    /// Whether a held send has picked up its gate
    pub fn send_is_held(&self) -> bool {
        self.send_gate.lock().unwrap().is_none()
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

struct FakeHandle(Arc<FakeSession>);

#[async_trait::async_trait]
impl SessionHandle for FakeHandle {
    async fn send_message(&self, text: &str) -> Result<()> {
        let gate = self.0.send_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.0.fail_send.load(Ordering::SeqCst) {
            return Err(anyhow!("socket closed"));
        }
        self.0.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.0.mute_calls.lock().unwrap().push(muted);
        Ok(())
    }

    async fn end(&self) -> Result<()> {
        self.0.ended.store(true, Ordering::SeqCst);
        if self.0.fail_end {
            return Err(anyhow!("teardown failed"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRemote {
    pub sessions: Mutex<Vec<Arc<FakeSession>>>,
    pub start_calls: AtomicUsize,
    pub fail_start: AtomicBool,
    pub fail_end: AtomicBool,
    /// When set, the next `start` waits for a notification before returning
    pub gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeRemote {
    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn session(&self, index: usize) -> Arc<FakeSession> {
        Arc::clone(&self.sessions.lock().unwrap()[index])
    }

    pub fn last_session(&self) -> Arc<FakeSession> {
        let sessions = self.sessions.lock().unwrap();
        Arc::clone(sessions.last().expect("no session started"))
    }

    /// Whether a held start has picked up its gate
    pub fn start_is_held(&self) -> bool {
        self.gate.lock().unwrap().is_none()
    }

    pub fn hold_start(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }
}

#[async_trait::async_trait]
impl RemoteSessionService for FakeRemote {
    async fn start(&self, _agent_id: &str, _options: SessionOptions) -> Result<RemoteSession> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_start.load(Ordering::SeqCst) {
            return Err(anyhow!("authentication failed"));
        }

        let (events, rx) = mpsc::channel(32);
        let session = Arc::new(FakeSession {
            events: Mutex::new(Some(events)),
            sent: Mutex::new(Vec::new()),
            mute_calls: Mutex::new(Vec::new()),
            ended: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            send_gate: Mutex::new(None),
            fail_end: self.fail_end.load(Ordering::SeqCst),
        });
        self.sessions.lock().unwrap().push(Arc::clone(&session));

        Ok(RemoteSession {
            handle: Box::new(FakeHandle(session)),
            events: rx,
        })
    }
}

// ============================================================================
// Wiring
// ============================================================================

pub fn fast_config() -> ReconcilerConfig {
    ReconcilerConfig {
        user_id: "user-1".to_string(),
        format_hint: None,
        window: MatchWindow::default(),
        retry: RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        },
    }
}

pub fn reconciler(
    provider: &Arc<FakeProvider>,
    store: &Arc<MemoryStore>,
    config: ReconcilerConfig,
) -> Arc<ArchivalReconciler> {
    Arc::new(ArchivalReconciler::new(
        Arc::clone(provider) as Arc<dyn ConversationSummaryProvider>,
        Arc::clone(store) as Arc<dyn RecordStore>,
        config,
    ))
}

pub struct Harness {
    pub controller: Arc<SessionController>,
    pub remote: Arc<FakeRemote>,
    pub audio: Arc<HeadlessAudio>,
    pub provider: Arc<FakeProvider>,
    pub store: Arc<MemoryStore>,
    pub reconciler: Arc<ArchivalReconciler>,
}

pub fn harness(microphone_allowed: bool) -> Harness {
    let remote = Arc::new(FakeRemote::default());
    let audio = Arc::new(HeadlessAudio::new());
    let provider = Arc::new(FakeProvider::default());
    let store = Arc::new(MemoryStore::default());
    let reconciler = reconciler(&provider, &store, fast_config());

    let controller = Arc::new(SessionController::new(
        Arc::clone(&remote) as Arc<dyn RemoteSessionService>,
        Arc::new(StaticPermission::new(microphone_allowed)),
        Arc::clone(&audio) as Arc<dyn loqa_conversations::AudioIo>,
        Arc::clone(&reconciler),
    ));

    Harness {
        controller,
        remote,
        audio,
        provider,
        store,
        reconciler,
    }
}

/// Yield to spawned tasks until `cond` holds
pub async fn settle<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("timed out waiting for condition")
}

/// Wait until the watched value satisfies `pred`
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, pred: F) -> T
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let current = rx.borrow_and_update().clone();
            if pred(&current) {
                return current;
            }
            rx.changed().await.expect("sender dropped");
        }
    })
    .await
    .expect("timed out waiting for state")
}
