use async_trait::async_trait;
use error_stack::{Result, ResultExt};
use redis::{aio::MultiplexedConnection, AsyncCommands};

use super::{Store, StoreError};

/// A [Store] backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Connects to the Redis server at `url`.
    ///
    /// The url is not included in errors since it may contain the password.
    pub async fn connect(url: &str) -> Result<RedisStore, StoreError> {
        let client = redis::Client::open(url)
            .change_context(StoreError::Connection)
            .attach_printable("invalid redis url")?;

        let connection = client
            .get_multiplexed_tokio_connection()
            .await
            .change_context(StoreError::Connection)
            .attach_printable("failed to connect to redis")?;

        Ok(RedisStore { connection })
    }

    fn connection(&self) -> MultiplexedConnection {
        self.connection.clone()
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.connection()
            .get::<_, Option<String>>(key)
            .await
            .change_context(StoreError::Command)
            .attach_printable_lazy(|| format!("GET {key}"))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.connection()
            .set::<_, _, ()>(key, value)
            .await
            .change_context(StoreError::Command)
            .attach_printable_lazy(|| format!("SET {key}"))
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.connection()
            .incr::<_, _, i64>(key, 1)
            .await
            .change_context(StoreError::Command)
            .attach_printable_lazy(|| format!("INCR {key}"))
    }

    async fn list_push_head(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        self.connection()
            .lpush::<_, _, i64>(key, value)
            .await
            .change_context(StoreError::Command)
            .attach_printable_lazy(|| format!("LPUSH {key}"))
    }

    async fn list_push_tail(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        self.connection()
            .rpush::<_, _, i64>(key, value)
            .await
            .change_context(StoreError::Command)
            .attach_printable_lazy(|| format!("RPUSH {key}"))
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        self.connection()
            .ltrim::<_, ()>(key, start as isize, stop as isize)
            .await
            .change_context(StoreError::Command)
            .attach_printable_lazy(|| format!("LTRIM {key} {start} {stop}"))
    }
}
