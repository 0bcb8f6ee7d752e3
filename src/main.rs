use std::sync::Arc;

use anyhow::Context;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use seat_reservation_queue::config::{
    AppConfig, AppState, ControlConfig, ControlTransport, MqttConfig, QueueConfig, RedisConfig, WorkerConfig,
};
use seat_reservation_queue::middleware::setup_logging;
use seat_reservation_queue::queue::{QueueEngine, RedisJobRepository};
use seat_reservation_queue::routes::create_router;
use seat_reservation_queue::services::{
    ChannelSubscriber, ControlListener, MqttChannelSubscriber, NotificationService, RedisChannelSubscriber,
    RedisService, ReservationService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = setup_logging();

    tracing::info!("Starting application...");

    // Load configurations
    let app_config = AppConfig::from_env()?;
    let redis_config = RedisConfig::from_env()?;
    let queue_config = QueueConfig::from_env()?;
    let worker_config = WorkerConfig::from_env()?;
    let control_config = ControlConfig::from_env()?;

    tracing::info!("Loaded configuration for environment: {}", app_config.environment);

    let redis = RedisService::new(&redis_config)
        .await
        .context("Redis client not connected to the server")?;

    // Queue engine shares the Redis pool with the seat counter
    let repository = Arc::new(RedisJobRepository::new(redis.pool(), &queue_config));
    let queue = QueueEngine::new(repository, &queue_config);

    let reservations = ReservationService::new(Arc::new(redis.clone()), queue.clone());
    reservations.seed(worker_config.initial_seats).await?;
    reservations.start_processing().await?;

    let notifications = NotificationService::new(queue.clone(), &worker_config);
    notifications.start_processing().await?;
    tracing::info!("Queue workers registered");

    let remote_shutdown = spawn_control_listener(&control_config, &redis_config)?;

    let state = AppState::new(reservations, notifications, queue, app_config.clone());

    let app = create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = app_config.server_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        "{} v{} is running on {}",
        app_config.app_name,
        app_config.app_version,
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(remote_shutdown))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Start the control listener; the receiver fires once the shutdown
/// sentinel has been handled.
fn spawn_control_listener(
    control_config: &ControlConfig,
    redis_config: &RedisConfig,
) -> anyhow::Result<oneshot::Receiver<()>> {
    let subscriber: Box<dyn ChannelSubscriber> = match control_config.transport {
        ControlTransport::Redis => Box::new(RedisChannelSubscriber::new(redis_config.build_redis_url())),
        ControlTransport::Mqtt => Box::new(MqttChannelSubscriber::new(MqttConfig::from_env()?)),
    };

    let mut listener = ControlListener::new(subscriber, control_config);
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        if let Err(e) = listener.run().await {
            tracing::error!("Control listener stopped: {}", e);
        }
        if listener.shutdown_requested() {
            let _ = tx.send(());
        }
    });

    Ok(rx)
}

async fn shutdown_signal(remote: oneshot::Receiver<()>) {
    let remote = async {
        // Listener gone without a shutdown request: keep serving
        if remote.await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = remote => tracing::info!("Shutdown requested on the control channel"),
        _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl-C received"),
    }
}
