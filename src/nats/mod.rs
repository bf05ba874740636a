pub mod client;
pub mod messages;
mod remote;
mod summaries;

pub use client::NatsClient;
pub use messages::{AudioReply, SessionEventMessage};
pub use remote::NatsRemoteSessionService;
pub use summaries::NatsSummaryProvider;
