use anyhow::{Context, Result};
use async_nats::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

/// Thin JSON layer over a NATS connection to the agent service
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Send a JSON request and decode the JSON reply
    pub async fn request<Req, Rep>(&self, subject: &str, request: &Req) -> Result<Rep>
    where
        Req: Serialize,
        Rep: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)?;

        let reply = self
            .client
            .request(subject.to_string(), payload.into())
            .await
            .with_context(|| format!("Request to {} failed", subject))?;

        debug!("Reply from {} ({} bytes)", subject, reply.payload.len());

        serde_json::from_slice(&reply.payload)
            .with_context(|| format!("Invalid reply from {}", subject))
    }

    /// Publish a JSON message
    pub async fn publish<M: Serialize>(&self, subject: String, message: &M) -> Result<()> {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to {}", subject))?;

        debug!("Published to {}", subject);

        Ok(())
    }

    pub async fn subscribe(&self, subject: String) -> Result<async_nats::Subscriber> {
        info!("Subscribing to {}", subject);

        self.client
            .subscribe(subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", subject))
    }
}
