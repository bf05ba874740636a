use anyhow::{bail, Result};
use futures::stream::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::client::NatsClient;
use super::messages::{
    MuteCommand, SessionEventMessage, SessionStartReply, SessionStartRequest, UserInputMessage,
};
use crate::remote::{RemoteEvent, RemoteSession, RemoteSessionService, SessionHandle, SessionOptions};

const START_SUBJECT: &str = "agent.session.start";

/// Live sessions hosted by the agent service over NATS
pub struct NatsRemoteSessionService {
    client: NatsClient,
}

impl NatsRemoteSessionService {
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl RemoteSessionService for NatsRemoteSessionService {
    async fn start(&self, agent_id: &str, options: SessionOptions) -> Result<RemoteSession> {
        let session_id = uuid::Uuid::new_v4().to_string();

        // Subscribe first so no early event is lost
        let mut subscriber = self
            .client
            .subscribe(format!("agent.session.{}.events", session_id))
            .await?;

        let request = SessionStartRequest {
            session_id: session_id.clone(),
            agent_id: agent_id.to_string(),
            dynamic_variables: options.dynamic_variables,
        };
        let reply: SessionStartReply = self.client.request(START_SUBJECT, &request).await?;

        if let Some(error) = reply.error {
            bail!("Agent service refused session: {}", error);
        }
        if !reply.accepted {
            bail!("Agent service did not accept session {}", session_id);
        }

        info!("Remote session {} opened for agent {}", session_id, agent_id);

        let (event_tx, event_rx) = mpsc::channel(100);
        let forward_session = session_id.clone();

        let forward_task = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<SessionEventMessage>(&msg.payload) {
                    Ok(event) => {
                        if event_tx.send(RemoteEvent::from(event)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse session event: {}", e);
                    }
                }
            }

            info!("Event stream for session {} closed", forward_session);
        });

        Ok(RemoteSession {
            handle: Box::new(NatsSessionHandle {
                client: self.client.clone(),
                session_id,
                forward_task,
            }),
            events: event_rx,
        })
    }
}

struct NatsSessionHandle {
    client: NatsClient,
    session_id: String,
    forward_task: JoinHandle<()>,
}

impl NatsSessionHandle {
    fn subject(&self, suffix: &str) -> String {
        format!("agent.session.{}.{}", self.session_id, suffix)
    }
}

#[async_trait::async_trait]
impl SessionHandle for NatsSessionHandle {
    async fn send_message(&self, text: &str) -> Result<()> {
        let message = UserInputMessage {
            text: text.to_string(),
        };
        self.client.publish(self.subject("input"), &message).await
    }

    async fn set_muted(&self, muted: bool) -> Result<()> {
        self.client
            .publish(self.subject("mute"), &MuteCommand { muted })
            .await
    }

    async fn end(&self) -> Result<()> {
        self.forward_task.abort();
        self.client
            .publish(self.subject("end"), &serde_json::json!({}))
            .await
    }
}

impl Drop for NatsSessionHandle {
    fn drop(&mut self) {
        self.forward_task.abort();
    }
}
