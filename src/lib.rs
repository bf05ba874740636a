pub mod archive;
pub mod audio;
pub mod config;
pub mod http;
pub mod nats;
pub mod remote;
pub mod session;
pub mod store;

pub use archive::{
    ArchivalError, ArchivalReconciler, ArchiveOutcome, ArchiveStatus, ConversationSummary,
    ConversationSummaryProvider, DownloadError, DownloadedAudio, MatchWindow, ReconcilerConfig,
    RetryPolicy,
};
pub use audio::{AudioIo, HeadlessAudio, MicrophonePermission, StaticPermission};
pub use config::Config;
pub use http::{create_router, AppState};
pub use nats::{NatsClient, NatsRemoteSessionService, NatsSummaryProvider};
pub use remote::{RemoteEvent, RemoteSession, RemoteSessionService, SessionHandle, SessionOptions};
pub use session::{
    AgentState, ChatMessage, ConnectionState, MessageRole, SessionController, SessionError,
    SessionSnapshot,
};
pub use store::{FsRecordStore, RecordStore, SessionRecord};
