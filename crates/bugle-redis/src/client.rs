//! Redis connection handling.
//!
//! One `ConnectionManager` serves both the cache commands and the publish
//! side of the broker bridge; it reconnects internally, and it is `Clone`,
//! so callers clone it to get a mutable handle per operation. The subscribe
//! side needs a dedicated Pub/Sub connection whose lifecycle lives in
//! `subscriber.rs`.

use std::time::Duration;

use redis::aio::ConnectionManager;
use thiserror::Error;

/// Errors from the cache and broker layer.
#[derive(Error, Debug)]
pub enum RedisError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for Redis operations.
pub type RedisResult<T> = Result<T, RedisError>;

/// Shared multiplexed connection handle.
pub type RedisPool = ConnectionManager;

/// Open a connection pool from a URL.
///
/// TLS rides on the URL scheme: `rediss://` connects over TLS, `redis://`
/// in the clear.
pub async fn init_pool(redis_url: &str) -> RedisResult<RedisPool> {
    let client = redis::Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;
    Ok(manager)
}
