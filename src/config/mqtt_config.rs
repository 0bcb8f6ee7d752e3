use std::time::Duration;

/// Broker settings for the MQTT control transport
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// `mqtt://host[:port]`
    pub broker: String,
    pub client_id: String,
    /// Sent only when both a username and a password are configured
    pub credentials: Option<(String, String)>,
    pub keep_alive_secs: u64,
    /// How long to wait for the broker's ConnAck
    pub connect_timeout_secs: u64,
}

impl MqttConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let defaults = Self::default();

        Ok(Self {
            broker: cfg.get_string("MQTT_BROKER").unwrap_or(defaults.broker),
            client_id: cfg.get_string("MQTT_CLIENT_ID").unwrap_or(defaults.client_id),
            credentials: credentials(
                cfg.get_string("MQTT_USERNAME").ok(),
                cfg.get_string("MQTT_PASSWORD").ok(),
            ),
            keep_alive_secs: cfg.get_int("MQTT_KEEP_ALIVE").map(|v| v as u64).unwrap_or(defaults.keep_alive_secs),
            connect_timeout_secs: cfg
                .get_int("MQTT_CONNECT_TIMEOUT")
                .map(|v| v as u64)
                .unwrap_or(defaults.connect_timeout_secs),
        })
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: "mqtt://localhost:1883".to_string(),
            client_id: "seat-reservation-control".to_string(),
            credentials: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 5,
        }
    }
}

fn credentials(username: Option<String>, password: Option<String>) -> Option<(String, String)> {
    match (username, password) {
        (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
        _ => None,
    }
}
