use std::sync::Arc;

use error_stack::{Result, ResultExt};

use crate::{error::WatcherError, keys::Keys, store::Store};

/// Owns the persisted number of the last fully processed block.
///
/// The cursor is the only resume point: processing restarts at the block after it.
pub struct CursorManager<S> {
    store: Arc<S>,
    key: String,
}

impl<S> CursorManager<S>
where
    S: Store,
{
    pub fn new(store: Arc<S>, keys: &Keys) -> Self {
        Self {
            store,
            key: keys.last_block_id(),
        }
    }

    /// Returns the last processed block number, `0` if nothing was processed yet.
    pub async fn get(&self) -> Result<i64, WatcherError> {
        let value = self
            .store
            .get(&self.key)
            .await
            .change_context(WatcherError::Store)
            .attach_printable("failed to read cursor")?;

        let Some(value) = value else {
            return Ok(0);
        };

        value
            .trim()
            .parse::<i64>()
            .change_context(WatcherError::Parse)
            .attach_printable("stored cursor is not an integer")
            .attach_printable_lazy(|| format!("value: {value:?}"))
    }

    /// Persists `number` as the last processed block.
    ///
    /// Must only be called once every aggregation step for the block has been attempted.
    pub async fn set(&self, number: i64) -> Result<(), WatcherError> {
        self.store
            .set(&self.key, &number.to_string())
            .await
            .change_context(WatcherError::Store)
            .attach_printable("failed to write cursor")
            .attach_printable_lazy(|| format!("block number: {number}"))
    }
}
