use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use deadpool_redis::redis::AsyncCommands;

use crate::config::RedisConfig;
use crate::interceptors::AppError;
use super::state_store::StateStore;

/// Decrements KEYS[1] only while it is above zero; -1 signals "nothing left"
const DECREMENT_IF_POSITIVE: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
  return -1
end
if not string.match(raw, '^-?%d+$') then
  return redis.error_reply('value is not an integer')
end
local current = tonumber(raw)
if current <= 0 then
  return -1
end
redis.call('SET', KEYS[1], current - 1)
return current - 1
"#;

#[derive(Clone)]
pub struct RedisService {
    pool: Pool,
}

impl RedisService {
    /// Create a new RedisService instance
    pub async fn new(config: &RedisConfig) -> Result<Self, AppError> {
        let pool = config.create_pool()
            .map_err(|e| AppError::RedisError(format!("Failed to create Redis pool: {}", e)))?;

        // Test connection
        let mut conn = pool.get().await
            .map_err(|e| AppError::RedisError(format!("Failed to get Redis connection: {}", e)))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| AppError::RedisError(format!("Redis ping failed: {}", e)))?;

        tracing::info!("Redis client connected to the server");

        Ok(Self { pool })
    }

    /// Pool shared with the job repository
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<Connection, AppError> {
        self.pool.get().await
            .map_err(|e| AppError::RedisError(format!("Failed to get connection: {}", e)))
    }
}

#[async_trait]
impl StateStore for RedisService {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.get_connection().await?;
        conn.get(key)
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut conn = self.get_connection().await?;
        conn.set(key, value)
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))
    }

    async fn decrement_if_positive(&self, key: &str) -> Result<Option<i64>, AppError> {
        let mut conn = self.get_connection().await?;
        let remaining: i64 = redis::Script::new(DECREMENT_IF_POSITIVE)
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| match e.kind() {
                redis::ErrorKind::ResponseError => {
                    AppError::InternalError(format!("Value at '{}' is not an integer", key))
                }
                _ => AppError::RedisError(e.to_string()),
            })?;

        Ok((remaining >= 0).then_some(remaining))
    }
}
