use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio::time::timeout;

mod mock;

pub use mock::{MockRedisCall, MockRedisClient};

// meter readings are written every few seconds, a slow read is as good as a failed one
pub const DEFAULT_REDIS_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Error, Debug, Clone)]
pub enum CustomRedisError {
    #[error("Not found in redis")]
    NotFound,
    #[error("Timeout error")]
    Timeout,
    #[error(transparent)]
    Redis(#[from] Arc<redis::RedisError>),
}

impl From<redis::RedisError> for CustomRedisError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CustomRedisError::Timeout
        } else {
            CustomRedisError::Redis(Arc::new(err))
        }
    }
}

impl From<tokio::time::error::Elapsed> for CustomRedisError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        CustomRedisError::Timeout
    }
}

impl CustomRedisError {
    /// A missing key is an answer, everything else means the store could not give one.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CustomRedisError::NotFound)
    }
}

/// A read-only view over a string key-value store.
///
/// `get` returns `CustomRedisError::NotFound` both for absent keys and for keys
/// holding an empty string.
#[async_trait]
pub trait Client {
    async fn get(&self, k: String) -> Result<String, CustomRedisError>;
}

/// Redis client sharing one multiplexed, auto-reconnecting connection across calls.
/// The connection is opened by the first read, so the service can start before redis.
pub struct RedisClient {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    timeout: Duration,
}

impl RedisClient {
    pub fn new(addr: String) -> Result<RedisClient, CustomRedisError> {
        Self::with_timeout(addr, DEFAULT_REDIS_TIMEOUT)
    }

    pub fn with_timeout(addr: String, timeout: Duration) -> Result<RedisClient, CustomRedisError> {
        let client = redis::Client::open(addr)?;

        Ok(RedisClient {
            client,
            connection: OnceCell::new(),
            timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CustomRedisError> {
        let manager = self
            .connection
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;

        Ok(manager.clone())
    }
}

#[async_trait]
impl Client for RedisClient {
    async fn get(&self, k: String) -> Result<String, CustomRedisError> {
        let mut conn = timeout(self.timeout, self.connection()).await??;

        let value = timeout(self.timeout, conn.get::<_, Option<String>>(k)).await??;

        match value {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(CustomRedisError::NotFound),
        }
    }
}
