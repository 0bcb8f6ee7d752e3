use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ControlConfig;
use crate::interceptors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    pub channel: String,
    pub payload: String,
}

/// Pub/sub transport used by the control listener
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelSubscriber: Send {
    async fn connect(&mut self) -> Result<(), AppError>;

    async fn subscribe(&mut self, channel: &str) -> Result<(), AppError>;

    /// Next message on a subscribed channel; `None` once the transport ends
    async fn next_message(&mut self) -> Result<Option<ControlMessage>, AppError>;

    async fn unsubscribe(&mut self, channel: &str) -> Result<(), AppError>;

    async fn close(&mut self) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connected,
    Listening,
    ShuttingDown,
    Closed,
}

/// Listens on the control channel until the shutdown sentinel arrives
pub struct ControlListener {
    subscriber: Box<dyn ChannelSubscriber>,
    channel: String,
    sentinel: String,
    state: watch::Sender<ListenerState>,
    shutdown_requested: bool,
}

impl ControlListener {
    pub fn new(subscriber: Box<dyn ChannelSubscriber>, config: &ControlConfig) -> Self {
        let (state, _) = watch::channel(ListenerState::Disconnected);

        Self {
            subscriber,
            channel: config.channel.clone(),
            sentinel: config.sentinel.clone(),
            state,
            shutdown_requested: false,
        }
    }

    pub fn state(&self) -> ListenerState {
        *self.state.borrow()
    }

    /// True once the sentinel was received, as opposed to the transport
    /// going away
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Receiver that follows every state change
    pub fn watch_state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    /// Connect, subscribe and process messages until shutdown. Returns the
    /// number of ordinary messages observed. A failed connection is reported
    /// and leaves the listener disconnected; there is no retry.
    pub async fn run(&mut self) -> Result<usize, AppError> {
        if self.state() != ListenerState::Disconnected {
            return Err(AppError::BadRequest("Control listener already started".to_string()));
        }

        if let Err(e) = self.subscriber.connect().await {
            error!("Control channel client not connected to the server: {}", e);
            return Err(e);
        }
        info!("Control channel client connected to the server");

        if let Err(e) = self.subscriber.subscribe(&self.channel).await {
            error!("Failed to subscribe to '{}': {}", self.channel, e);
            if let Err(close_err) = self.subscriber.close().await {
                warn!("Failed to close control connection: {}", close_err);
            }
            return Err(e);
        }
        self.set_state(ListenerState::Connected);
        self.set_state(ListenerState::Listening);

        let mut observed = 0;
        loop {
            let message = match self.subscriber.next_message().await {
                Ok(Some(message)) => message,
                Ok(None) => {
                    warn!("Control channel '{}' closed by the server", self.channel);
                    if let Err(close_err) = self.subscriber.close().await {
                        warn!("Failed to close control connection: {}", close_err);
                    }
                    self.set_state(ListenerState::Closed);
                    return Ok(observed);
                }
                Err(e) => {
                    error!("Control channel '{}' failed: {}", self.channel, e);
                    if let Err(close_err) = self.subscriber.close().await {
                        warn!("Failed to close control connection: {}", close_err);
                    }
                    self.set_state(ListenerState::Closed);
                    return Err(e);
                }
            };

            info!("[{}] {}", message.channel, message.payload);

            if message.payload == self.sentinel {
                self.shutdown().await?;
                return Ok(observed);
            }
            observed += 1;
        }
    }

    async fn shutdown(&mut self) -> Result<(), AppError> {
        self.shutdown_requested = true;
        self.set_state(ListenerState::ShuttingDown);

        let unsubscribed = self.subscriber.unsubscribe(&self.channel).await;
        if let Err(e) = &unsubscribed {
            warn!("Failed to unsubscribe from '{}': {}", self.channel, e);
        }
        let closed = self.subscriber.close().await;

        self.set_state(ListenerState::Closed);
        info!("🛑 Shutdown requested on '{}', control listener closed", self.channel);

        unsubscribed.and(closed)
    }

    fn set_state(&self, next: ListenerState) {
        debug!("Control listener: {:?} -> {:?}", self.state(), next);
        self.state.send_replace(next);
    }
}
