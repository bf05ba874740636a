use std::time::Duration;
use tracing::{info, warn};

use super::provider::{ConversationSummaryProvider, DownloadError, DownloadedAudio};

/// How often and how patiently to poll for a recording that is still processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Fixed wait between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(3),
        }
    }
}

/// Download a conversation's audio, retrying while the provider reports it as not found
///
/// Any other error, or "not found" on the last attempt, is returned as is.
pub async fn download_with_retry(
    provider: &dyn ConversationSummaryProvider,
    conversation_id: &str,
    policy: &RetryPolicy,
) -> Result<DownloadedAudio, DownloadError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match provider.download_audio(conversation_id).await {
            Ok(audio) => {
                info!(
                    "Downloaded audio for {} on attempt {} ({} bytes)",
                    conversation_id,
                    attempt,
                    audio.data.len()
                );
                return Ok(audio);
            }
            Err(e) if e.is_not_found() && attempt < max_attempts => {
                warn!(
                    "Audio for {} not ready (attempt {}/{}), retrying in {:?}",
                    conversation_id, attempt, max_attempts, policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
