use super::error::SessionError;
use super::state::{AgentState, ChatMessage, ConnectionState, SessionSnapshot};
use crate::archive::ArchivalReconciler;
use crate::audio::{AudioIo, MicrophonePermission};
use crate::remote::{RemoteEvent, RemoteSessionService, SessionHandle, SessionOptions};
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Remote session currently owned by the controller
struct LiveSession {
    handle: Arc<dyn SessionHandle>,

    /// Task applying the session's events in arrival order
    event_task: JoinHandle<()>,
}

struct Inner {
    /// Bumped on every start and stop; events from older generations are dropped
    generation: u64,
    live: Option<LiveSession>,
    session_id: Option<Uuid>,
    connection: ConnectionState,
    agent: AgentState,
    is_muted: bool,
    speaker_enabled: bool,
    started_at: Option<DateTime<Utc>>,
    messages: Vec<ChatMessage>,
    last_error: Option<String>,
}

impl Inner {
    fn new() -> Self {
        Self {
            generation: 0,
            live: None,
            session_id: None,
            connection: ConnectionState::Idle,
            agent: AgentState::Listening,
            is_muted: false,
            speaker_enabled: true,
            started_at: None,
            messages: Vec::new(),
            last_error: None,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            connection: self.connection,
            agent: self.agent,
            is_muted: self.is_muted,
            speaker_enabled: self.speaker_enabled,
            started_at: self.started_at,
            messages: self.messages.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Move to `next` if the state machine allows it
    fn transition(&mut self, next: ConnectionState) -> bool {
        if self.connection == next {
            return false;
        }

        if !self.connection.can_transition_to(next) {
            warn!(
                "Dropping illegal connection transition {:?} -> {:?}",
                self.connection, next
            );
            return false;
        }

        info!("Connection state: {:?} -> {:?}", self.connection, next);
        self.connection = next;
        true
    }

    fn apply(&mut self, event: RemoteEvent) {
        match event {
            // Only stop() returns the controller to idle
            RemoteEvent::Connection(ConnectionState::Idle) => {
                warn!("Ignoring idle state reported by remote session");
            }
            RemoteEvent::Connection(next) => {
                self.transition(next);
            }
            RemoteEvent::Agent(agent) => {
                debug!("Agent state: {:?}", agent);
                self.agent = agent;
            }
            RemoteEvent::Message(message) => self.messages.push(message),
            RemoteEvent::Mute(muted) => self.is_muted = muted,
        }
    }

    /// Reset everything that belongs to a single session
    fn reset_session(&mut self) {
        self.session_id = None;
        self.connection = ConnectionState::Idle;
        self.agent = AgentState::Listening;
        self.is_muted = false;
        self.started_at = None;
        self.messages.clear();
    }
}

/// Drives one live conversation session and exposes its state
///
/// All state changes are published as `SessionSnapshot`s on a watch channel.
/// Stopping a session hands its start time to the archival reconciler, which
/// runs detached.
pub struct SessionController {
    remote: Arc<dyn RemoteSessionService>,
    permission: Arc<dyn MicrophonePermission>,
    audio: Arc<dyn AudioIo>,
    reconciler: Arc<ArchivalReconciler>,
    inner: Arc<Mutex<Inner>>,
    snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionController {
    pub fn new(
        remote: Arc<dyn RemoteSessionService>,
        permission: Arc<dyn MicrophonePermission>,
        audio: Arc<dyn AudioIo>,
        reconciler: Arc<ArchivalReconciler>,
    ) -> Self {
        let inner = Inner::new();
        let (snapshot_tx, _) = watch::channel(inner.snapshot());

        Self {
            remote,
            permission,
            audio,
            reconciler,
            inner: Arc::new(Mutex::new(inner)),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn reconciler(&self) -> &Arc<ArchivalReconciler> {
        &self.reconciler
    }

    fn publish(tx: &watch::Sender<SessionSnapshot>, inner: &Inner) -> SessionSnapshot {
        let snapshot = inner.snapshot();
        tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Stop the live session if there is one, otherwise start a new one
    pub async fn toggle(
        &self,
        agent_id: &str,
        dynamic_variables: HashMap<String, String>,
    ) -> Result<SessionSnapshot, SessionError> {
        let connected = self.inner.lock().await.snapshot().is_connected();

        if connected {
            Ok(self.stop().await)
        } else {
            self.start(agent_id, dynamic_variables).await
        }
    }

    /// Start a live session with `agent_id`
    ///
    /// Returns once the remote session is open; the connection becomes
    /// `Active` when the remote service reports it.
    pub async fn start(
        &self,
        agent_id: &str,
        dynamic_variables: HashMap<String, String>,
    ) -> Result<SessionSnapshot, SessionError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.connection != ConnectionState::Idle {
                warn!("Session already active");
                return Err(SessionError::AlreadyActive);
            }

            inner.generation += 1;
            inner.reset_session();
            inner.session_id = Some(Uuid::new_v4());
            inner.last_error = None;
            inner.transition(ConnectionState::Connecting);
            Self::publish(&self.snapshot_tx, &inner);
            inner.generation
        };

        info!("Starting conversation with agent {}", agent_id);

        if !self.permission.request().await {
            warn!("Microphone permission denied");
            let err = SessionError::PermissionDenied;
            self.abort_start(generation, &err).await;
            return Err(err);
        }

        let started_at = Utc::now();
        let options = SessionOptions { dynamic_variables };

        let remote = match self.remote.start(agent_id, options).await {
            Ok(remote) => remote,
            Err(e) => {
                error!("Failed to start remote session: {:#}", e);
                let err = SessionError::Connection(e);
                self.abort_start(generation, &err).await;
                return Err(err);
            }
        };
        let handle: Arc<dyn SessionHandle> = Arc::from(remote.handle);

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            drop(inner);
            info!("Session was stopped while connecting, tearing down");
            if let Err(e) = handle.end().await {
                error!("Failed to end remote session: {:#}", e);
            }
            return Err(SessionError::Cancelled);
        }

        // Audio is attached under the lock: a stale start never touches the devices
        if let Err(e) = self.audio.attach().await.context("Failed to attach audio") {
            error!("{:#}", e);
            let err = SessionError::Connection(e);
            inner.reset_session();
            inner.last_error = Some(err.to_string());
            Self::publish(&self.snapshot_tx, &inner);
            drop(inner);

            if let Err(end_err) = handle.end().await {
                error!("Failed to end remote session: {:#}", end_err);
            }
            return Err(err);
        }
        debug!("Audio attached via {}", self.audio.name());

        let event_task = self.spawn_event_task(generation, remote.events);
        inner.live = Some(LiveSession { handle, event_task });
        inner.started_at = Some(started_at);
        let snapshot = Self::publish(&self.snapshot_tx, &inner);
        drop(inner);

        self.reconciler.note_session_start(started_at).await;

        info!("Conversation session started");

        Ok(snapshot)
    }

    /// Return to idle after a failed start, unless a newer start/stop already took over
    async fn abort_start(&self, generation: u64, err: &SessionError) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return;
        }

        inner.reset_session();
        inner.last_error = Some(err.to_string());
        Self::publish(&self.snapshot_tx, &inner);
    }

    /// Apply remote events for one session generation, in order
    fn spawn_event_task(
        &self,
        generation: u64,
        mut events: mpsc::Receiver<RemoteEvent>,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let snapshot_tx = Arc::clone(&self.snapshot_tx);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let mut guard = inner.lock().await;
                if guard.generation != generation {
                    debug!("Dropping event from stale session: {:?}", event);
                    return;
                }

                guard.apply(event);
                Self::publish(&snapshot_tx, &guard);
            }

            // The remote side went away without reporting it
            let mut guard = inner.lock().await;
            if guard.generation == generation
                && matches!(
                    guard.connection,
                    ConnectionState::Connecting | ConnectionState::Active | ConnectionState::Reconnecting
                )
            {
                warn!("Remote event stream closed, marking session disconnected");
                guard.transition(ConnectionState::Disconnected);
                Self::publish(&snapshot_tx, &guard);
            }
        })
    }

    /// End the live session
    ///
    /// Never fails: teardown errors are logged and the controller always ends
    /// up idle. Archival of the session is scheduled in the background.
    pub async fn stop(&self) -> SessionSnapshot {
        let (live, started_at, snapshot) = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;

            let live = inner.live.take();
            if let Some(live) = &live {
                live.event_task.abort();
            }

            let started_at = inner.started_at;
            if inner.connection != ConnectionState::Idle {
                info!("Connection state: {:?} -> Idle", inner.connection);
            }
            inner.reset_session();
            let snapshot = Self::publish(&self.snapshot_tx, &inner);

            (live, started_at, snapshot)
        };

        if self.audio.is_attached() {
            if let Err(e) = self.audio.detach().await {
                error!("Failed to detach audio: {:#}", e);
            }
        }

        if let Some(live) = live {
            info!("Ending remote session");
            if let Err(e) = live.handle.end().await {
                error!("Failed to end remote session: {:#}", e);
            }
        }

        let started_at = match started_at {
            Some(started_at) => Some(started_at),
            None => self.reconciler.pending_started_at().await,
        };

        // Fire and forget: the outcome is published through the reconciler's status
        let _ = self.reconciler.spawn(started_at);

        snapshot
    }

    /// Send user text to the agent
    pub async fn send_message(&self, text: &str) -> Result<(), SessionError> {
        let (handle, generation) = {
            let mut inner = self.inner.lock().await;
            let handle = inner
                .live
                .as_ref()
                .filter(|_| inner.connection.accepts_input())
                .map(|live| Arc::clone(&live.handle));

            let Some(handle) = handle else {
                let err = SessionError::NoActiveSession;
                inner.last_error = Some(err.to_string());
                Self::publish(&self.snapshot_tx, &inner);
                return Err(err);
            };
            (handle, inner.generation)
        };

        let result = handle.send_message(text).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(()) => {
                if inner.generation == generation {
                    inner.messages.push(ChatMessage::user(text));
                    Self::publish(&self.snapshot_tx, &inner);
                }
                Ok(())
            }
            Err(e) => {
                error!("Failed to send message: {:#}", e);
                let err = SessionError::Send(e);
                if inner.generation == generation {
                    inner.last_error = Some(err.to_string());
                    Self::publish(&self.snapshot_tx, &inner);
                }
                Err(err)
            }
        }
    }

    /// Flip the remote microphone mute; a no-op without a live session
    pub async fn toggle_mute(&self) -> Result<SessionSnapshot, SessionError> {
        let (handle, muted, generation) = {
            let inner = self.inner.lock().await;
            match &inner.live {
                Some(live) => (Arc::clone(&live.handle), !inner.is_muted, inner.generation),
                None => return Ok(inner.snapshot()),
            }
        };

        let result = handle.set_muted(muted).await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(()) => {
                if inner.generation == generation {
                    inner.is_muted = muted;
                }
                Ok(Self::publish(&self.snapshot_tx, &inner))
            }
            Err(e) => {
                error!("Failed to change mute state: {:#}", e);
                let err = SessionError::Send(e);
                if inner.generation == generation {
                    inner.last_error = Some(err.to_string());
                    Self::publish(&self.snapshot_tx, &inner);
                }
                Err(err)
            }
        }
    }

    /// Flip local speaker output; never forwarded to the remote service
    pub async fn toggle_speaker_output(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock().await;
        inner.speaker_enabled = !inner.speaker_enabled;

        let gain = if inner.speaker_enabled { 1.0 } else { 0.0 };
        self.audio.set_output_gain(gain);
        info!("Speaker output {}", if inner.speaker_enabled { "on" } else { "off" });

        Self::publish(&self.snapshot_tx, &inner)
    }
}
