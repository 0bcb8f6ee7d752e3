use std::collections::HashSet;
use std::time::Duration;

/// Settings for the job queue engine
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Key prefix for job records and pending lists
    pub prefix: String,
    /// Fallback poll interval for pending lists (milliseconds)
    pub poll_interval_ms: u64,
    /// Expiry of stored job records (seconds)
    pub job_ttl_secs: u64,
}

impl QueueConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let defaults = Self::default();

        Ok(Self {
            prefix: cfg.get_string("QUEUE_PREFIX").unwrap_or(defaults.prefix),
            poll_interval_ms: cfg.get_int("QUEUE_POLL_INTERVAL_MS").map(|v| v as u64).unwrap_or(defaults.poll_interval_ms),
            job_ttl_secs: cfg.get_int("QUEUE_JOB_TTL_SECS").map(|v| v as u64).unwrap_or(defaults.job_ttl_secs),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            prefix: "q".to_string(),
            poll_interval_ms: 500,
            job_ttl_secs: 86400,
        }
    }
}

/// Settings for the reservation and notification workers
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Seats written to the counter at startup
    pub initial_seats: i64,
    /// Simulated dispatch latency of a notification (milliseconds)
    pub notification_delay_ms: u64,
    /// Recipients that never receive notifications
    pub blacklist: HashSet<String>,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        let defaults = Self::default();

        Ok(Self {
            initial_seats: cfg.get_int("INITIAL_SEATS").unwrap_or(defaults.initial_seats),
            notification_delay_ms: cfg
                .get_int("NOTIFICATION_DELAY_MS")
                .map(|v| v as u64)
                .unwrap_or(defaults.notification_delay_ms),
            blacklist: cfg
                .get_string("NOTIFICATION_BLACKLIST")
                .map(|raw| parse_blacklist(&raw))
                .unwrap_or(defaults.blacklist),
        })
    }

    pub fn notification_delay(&self) -> Duration {
        Duration::from_millis(self.notification_delay_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            initial_seats: 50,
            notification_delay_ms: 1000,
            blacklist: parse_blacklist("4153518780,4153518781"),
        }
    }
}

fn parse_blacklist(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|phone| !phone.is_empty())
        .map(str::to_string)
        .collect()
}
