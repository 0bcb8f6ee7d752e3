pub mod state_store;
pub mod redis_service;
pub mod redis_pubsub;
pub mod mqtt_service;
pub mod control_listener;
pub mod reservation_service;
pub mod notification_service;

pub use state_store::{MemoryStore, StateStore};
pub use redis_service::RedisService;
pub use redis_pubsub::RedisChannelSubscriber;
pub use mqtt_service::MqttChannelSubscriber;
pub use control_listener::{ChannelSubscriber, ControlListener, ControlMessage, ListenerState};
pub use reservation_service::{ReservationGate, ReservationService, ReservationStatus, RESERVE_SEAT_JOB, SEATS_KEY};
pub use notification_service::{NotificationService, PUSH_NOTIFICATION_JOB};
