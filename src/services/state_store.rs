use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::interceptors::AppError;

/// Key-value store holding the shared seat counter
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Atomically decrement an integer counter that is above zero.
    /// Returns the new value, or `None` when the counter is zero, negative
    /// or missing (counter left untouched).
    async fn decrement_if_positive(&self, key: &str) -> Result<Option<i64>, AppError>;
}

/// In-memory store used by tests and by runs without Redis
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.values.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn decrement_if_positive(&self, key: &str) -> Result<Option<i64>, AppError> {
        let mut values = self.values.write().await;

        let current = match values.get(key) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| AppError::InternalError(format!("Value at '{}' is not an integer", key)))?,
            None => 0,
        };

        if current <= 0 {
            return Ok(None);
        }

        values.insert(key.to_string(), (current - 1).to_string());
        Ok(Some(current - 1))
    }
}
