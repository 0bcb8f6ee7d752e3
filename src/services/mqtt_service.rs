use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;

use crate::config::MqttConfig;
use crate::interceptors::AppError;
use super::control_listener::{ChannelSubscriber, ControlMessage};

/// MQTT transport for the control channel
pub struct MqttChannelSubscriber {
    config: MqttConfig,
    client: Option<AsyncClient>,
    event_loop: Option<EventLoop>,
}

impl MqttChannelSubscriber {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            client: None,
            event_loop: None,
        }
    }

    /// Parse broker URL to extract host and port
    fn parse_broker_url(url: &str) -> Result<(String, u16), AppError> {
        let url = url.trim_start_matches("mqtt://").trim_start_matches("mqtts://");

        if let Some((host, port_str)) = url.split_once(':') {
            let port = port_str.parse::<u16>()
                .map_err(|_| AppError::MqttError(format!("Invalid port in broker URL: {}", port_str)))?;
            Ok((host.to_string(), port))
        } else {
            Ok((url.to_string(), 1883)) // Default MQTT port
        }
    }

    fn options(&self) -> Result<MqttOptions, AppError> {
        let (host, port) = Self::parse_broker_url(&self.config.broker)?;

        let mut mqtt_options = MqttOptions::new(&self.config.client_id, host, port);
        mqtt_options.set_keep_alive(self.config.keep_alive());

        if let Some((username, password)) = &self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        Ok(mqtt_options)
    }

    fn client(&self) -> Result<&AsyncClient, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::MqttError("MQTT client is not connected".to_string()))
    }
}

#[async_trait]
impl ChannelSubscriber for MqttChannelSubscriber {
    async fn connect(&mut self) -> Result<(), AppError> {
        let (client, mut event_loop) = AsyncClient::new(self.options()?, 10);
        let timeout = self.config.connect_timeout();

        let handshake = tokio::time::timeout(timeout, async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => continue,
                    Err(e) => return Err(AppError::MqttError(format!("MQTT connection error: {}", e))),
                }
            }
        })
        .await
        .map_err(|_| AppError::MqttError(format!("MQTT broker did not answer within {:?}", timeout)))?;
        handshake?;

        tracing::info!("MQTT connected successfully");
        self.client = Some(client);
        self.event_loop = Some(event_loop);
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), AppError> {
        self.client()?
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| AppError::MqttError(format!("Failed to subscribe to topic '{}': {}", topic, e)))?;

        tracing::info!("Subscribed to MQTT topic: {}", topic);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<ControlMessage>, AppError> {
        let event_loop = self
            .event_loop
            .as_mut()
            .ok_or_else(|| AppError::MqttError("MQTT client is not connected".to_string()))?;

        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(Some(ControlMessage {
                        channel: publish.topic.clone(),
                        payload: String::from_utf8_lossy(&publish.payload).into_owned(),
                    }));
                }
                Ok(Event::Incoming(Packet::Disconnect)) => return Ok(None),
                Ok(_) => continue,
                Err(e) => return Err(AppError::MqttError(format!("MQTT listener error: {}", e))),
            }
        }
    }

    async fn unsubscribe(&mut self, topic: &str) -> Result<(), AppError> {
        self.client()?
            .unsubscribe(topic)
            .await
            .map_err(|e| AppError::MqttError(format!("Failed to unsubscribe from topic '{}': {}", topic, e)))?;

        tracing::info!("Unsubscribed from MQTT topic: {}", topic);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), AppError> {
        let (Some(client), Some(mut event_loop)) = (self.client.take(), self.event_loop.take()) else {
            return Ok(());
        };

        client
            .disconnect()
            .await
            .map_err(|e| AppError::MqttError(format!("Failed to disconnect: {}", e)))?;

        // Requests are only sent while the event loop is polled
        let flushed = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
        })
        .await;

        if flushed.is_err() {
            tracing::warn!("MQTT disconnect was not flushed in time");
        }

        tracing::info!("Disconnected from MQTT broker");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_url_with_port() {
        let (host, port) = MqttChannelSubscriber::parse_broker_url("mqtt://broker.local:8883").unwrap();
        assert_eq!(host, "broker.local");
        assert_eq!(port, 8883);
    }

    #[test]
    fn broker_url_defaults_port() {
        let (host, port) = MqttChannelSubscriber::parse_broker_url("mqtts://broker.local").unwrap();
        assert_eq!(host, "broker.local");
        assert_eq!(port, 1883);
    }

    #[test]
    fn broker_url_rejects_bad_port() {
        assert!(matches!(
            MqttChannelSubscriber::parse_broker_url("mqtt://broker.local:abc"),
            Err(AppError::MqttError(_))
        ));
    }
}
