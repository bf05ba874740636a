use anyhow::{bail, Result};

use super::client::NatsClient;
use super::messages::{AudioReply, AudioRequest, ConversationListReply, ConversationListRequest};
use crate::archive::{ConversationSummary, ConversationSummaryProvider, DownloadError, DownloadedAudio};

const LIST_SUBJECT: &str = "agent.conversations.list";
const AUDIO_SUBJECT: &str = "agent.conversations.audio";

/// Completed conversations and their recordings, served over NATS
pub struct NatsSummaryProvider {
    client: NatsClient,
    agent_id: Option<String>,
}

impl NatsSummaryProvider {
    /// `agent_id` restricts listings to one agent's conversations
    pub fn new(client: NatsClient, agent_id: Option<String>) -> Self {
        Self { client, agent_id }
    }
}

#[async_trait::async_trait]
impl ConversationSummaryProvider for NatsSummaryProvider {
    async fn list_summaries(&self) -> Result<Vec<ConversationSummary>> {
        let request = ConversationListRequest {
            agent_id: self.agent_id.clone(),
        };
        let reply: ConversationListReply = self.client.request(LIST_SUBJECT, &request).await?;

        if let Some(error) = reply.error {
            bail!("Agent service failed to list conversations: {}", error);
        }

        Ok(reply.conversations.into_iter().map(Into::into).collect())
    }

    async fn download_audio(&self, conversation_id: &str) -> Result<DownloadedAudio, DownloadError> {
        let request = AudioRequest {
            conversation_id: conversation_id.to_string(),
        };
        let reply: AudioReply = self.client.request(AUDIO_SUBJECT, &request).await?;
        reply.into_audio(conversation_id)
    }
}
