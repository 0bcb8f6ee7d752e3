use std::str::FromStr;

/// Transport used by the control channel listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlTransport {
    Redis,
    Mqtt,
}

impl FromStr for ControlTransport {
    type Err = config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(ControlTransport::Redis),
            "mqtt" => Ok(ControlTransport::Mqtt),
            other => Err(config::ConfigError::Message(format!(
                "Unknown control transport '{}', expected 'redis' or 'mqtt'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub channel: String,
    pub sentinel: String,
    pub transport: ControlTransport,
}

impl ControlConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let defaults = Self::default();

        let transport = match cfg.get_string("CONTROL_TRANSPORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.transport,
        };

        Ok(Self {
            channel: cfg.get_string("CONTROL_CHANNEL").unwrap_or(defaults.channel),
            sentinel: cfg.get_string("CONTROL_SENTINEL").unwrap_or(defaults.sentinel),
            transport,
        })
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            channel: "holberton school channel".to_string(),
            sentinel: "KILL_SERVER".to_string(),
            transport: ControlTransport::Redis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_parses_case_insensitively() {
        assert_eq!("MQTT".parse::<ControlTransport>().unwrap(), ControlTransport::Mqtt);
        assert_eq!(" redis ".parse::<ControlTransport>().unwrap(), ControlTransport::Redis);
        assert!("kafka".parse::<ControlTransport>().is_err());
    }
}
