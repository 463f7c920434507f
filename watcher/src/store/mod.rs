mod memory;
mod redis;

use std::fmt;

use async_trait::async_trait;
use error_stack::Result;

pub use self::memory::InMemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug)]
pub enum StoreError {
    /// Failed to reach the store.
    Connection,
    /// The store rejected the command.
    Command,
    /// Operation against a key holding the wrong kind of value.
    WrongType,
    /// The stored value is not what the command expects, e.g. incrementing a non-integer.
    InvalidValue,
}

/// Key-value store with Redis-like scalar, counter and list operations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the scalar value at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Atomically increments the counter at `key`, returning the new value.
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Pushes `value` to the head of the list, returning the list length.
    async fn list_push_head(&self, key: &str, value: &str) -> Result<i64, StoreError>;

    /// Pushes `value` to the tail of the list, returning the list length.
    async fn list_push_tail(&self, key: &str, value: &str) -> Result<i64, StoreError>;

    /// Trims the list to the elements in the inclusive `start..=stop` range.
    ///
    /// Negative indices count from the tail, like Redis' `LTRIM`.
    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError>;
}

impl error_stack::Context for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connection => f.write_str("store error: connection"),
            StoreError::Command => f.write_str("store error: command failed"),
            StoreError::WrongType => f.write_str("store error: wrong value type"),
            StoreError::InvalidValue => f.write_str("store error: invalid value"),
        }
    }
}
