use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::PubSub;

use crate::interceptors::AppError;
use super::control_listener::{ChannelSubscriber, ControlMessage};

/// Dedicated Redis pub/sub connection for the control channel
pub struct RedisChannelSubscriber {
    url: String,
    pubsub: Option<PubSub>,
}

impl RedisChannelSubscriber {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pubsub: None,
        }
    }

    fn connection(&mut self) -> Result<&mut PubSub, AppError> {
        self.pubsub
            .as_mut()
            .ok_or_else(|| AppError::RedisError("Pub/sub connection is not open".to_string()))
    }
}

#[async_trait]
impl ChannelSubscriber for RedisChannelSubscriber {
    async fn connect(&mut self) -> Result<(), AppError> {
        let client = redis::Client::open(self.url.as_str())?;
        self.pubsub = Some(client.get_async_pubsub().await?);
        Ok(())
    }

    async fn subscribe(&mut self, channel: &str) -> Result<(), AppError> {
        self.connection()?.subscribe(channel).await?;
        tracing::info!("Subscribed to Redis channel: {}", channel);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<ControlMessage>, AppError> {
        let pubsub = self.connection()?;

        match pubsub.on_message().next().await {
            Some(msg) => {
                let payload: String = msg.get_payload()?;
                Ok(Some(ControlMessage {
                    channel: msg.get_channel_name().to_string(),
                    payload,
                }))
            }
            None => Ok(None),
        }
    }

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), AppError> {
        self.connection()?.unsubscribe(channel).await?;
        tracing::info!("Unsubscribed from Redis channel: {}", channel);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AppError> {
        // Dropping the connection closes the socket
        self.pubsub.take();
        Ok(())
    }
}
