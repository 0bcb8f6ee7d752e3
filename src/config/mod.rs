pub mod app_config;
pub mod app_state;
pub mod control_config;
pub mod mqtt_config;
pub mod queue_config;
pub mod redis_config;

pub use app_config::AppConfig;
pub use app_state::AppState;
pub use control_config::{ControlConfig, ControlTransport};
pub use mqtt_config::MqttConfig;
pub use queue_config::{QueueConfig, WorkerConfig};
pub use redis_config::RedisConfig;
