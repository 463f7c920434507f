use std::{fmt::Debug, sync::Arc, time::Duration};

use error_stack::{Result, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    aggregator::{Aggregator, AggregatorOptions},
    chain::{ChainReader, ChainReaderErrorExt},
    cursor::CursorManager,
    decomposer::BlockDecomposer,
    error::WatcherError,
    keys::Keys,
    store::Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionOptions {
    /// How long to wait between chain height polls once caught up.
    pub poll_interval: Duration,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2_000),
        }
    }
}

/// Follows the chain head and processes blocks strictly in order.
///
/// A block is fetched and decomposed completely before anything is written. Aggregation
/// failures are logged and the cursor still advances, a fetch or parse failure stops the
/// current catch-up pass and the block is retried after the next poll.
pub struct IngestionLoop<C, S> {
    chain: Arc<C>,
    cursor: CursorManager<S>,
    decomposer: BlockDecomposer<C>,
    aggregator: Aggregator<C, S>,
    options: IngestionOptions,
}

impl<C, S> IngestionLoop<C, S>
where
    C: ChainReader,
    S: Store,
{
    pub fn new(
        chain: Arc<C>,
        store: Arc<S>,
        keys: Keys,
        aggregator_options: AggregatorOptions,
        options: IngestionOptions,
    ) -> Self {
        let cursor = CursorManager::new(store.clone(), &keys);
        let decomposer = BlockDecomposer::new(chain.clone());
        let aggregator = Aggregator::new(chain.clone(), store, keys, aggregator_options);

        Self {
            chain,
            cursor,
            decomposer,
            aggregator,
            options,
        }
    }

    /// Runs until `ct` is cancelled.
    ///
    /// Only fails if the persisted cursor cannot be read at startup.
    pub async fn start(&self, ct: CancellationToken) -> Result<(), WatcherError> {
        let mut height = self.poll_height().await.unwrap_or_default();
        let last_block = self.cursor.get().await?;

        println!("Current block number: {height}");
        println!("Last block imported: {last_block}");
        info!(height, last_block, "starting ingestion");

        let mut next = last_block + 1;

        loop {
            next = self.catch_up(next, height, &ct).await;

            if ct.is_cancelled() {
                break;
            }

            debug!("all caught up, waiting for new blocks");

            tokio::select! {
                _ = ct.cancelled() => break,
                _ = tokio::time::sleep(self.options.poll_interval) => {}
            }

            height = self.poll_height().await.unwrap_or(height);
            debug!(height, next, "polled chain height");
        }

        info!(next, "ingestion stopped: cancelled");
        Ok(())
    }

    /// Processes blocks `next..=height` in order, returning the next block to process.
    ///
    /// Stops at the first block that cannot be fetched or parsed, or when `ct` is cancelled.
    pub async fn catch_up(&self, mut next: i64, height: i64, ct: &CancellationToken) -> i64 {
        while next <= height {
            if ct.is_cancelled() {
                break;
            }

            match self.process_block(next).await {
                Ok(()) => next += 1,
                Err(err) => {
                    error!(block = next, error = ?err, "failed to process block");
                    break;
                }
            }
        }

        next
    }

    /// Fetches, decomposes and aggregates one block, then advances the cursor to it.
    pub async fn process_block(&self, number: i64) -> Result<(), WatcherError> {
        info!(block = number, "process block");

        let raw = self
            .chain
            .block_by_number(number, true)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    warn!(block = number, "block not available yet");
                }
                err
            })
            .change_context(WatcherError::Fetch)
            .attach_printable("failed to get block")
            .attach_printable_lazy(|| format!("block number: {number}"))?;

        let header = self.decomposer.decompose_block(&raw)?;
        let transactions = self.decomposer.decompose_transactions(&header).await?;
        let uncles = self.decomposer.decompose_uncles(&raw);
        let miner = self.decomposer.decompose_miner(&raw)?;

        log_step(
            number,
            "recent blocks",
            self.aggregator.record_block(&header).await,
        );
        log_step(
            number,
            "transactions",
            self.aggregator
                .record_transactions(&header, &transactions)
                .await,
        );
        log_step(
            number,
            "uncles",
            self.aggregator.record_uncles(&header, &uncles).await,
        );
        log_step(
            number,
            "miner",
            self.aggregator.record_miner(&header, &miner).await,
        );

        // The next successful write repairs a failed one, do not replay the block.
        if let Err(err) = self.cursor.set(header.number).await {
            error!(block = number, error = ?err, "failed to advance cursor");
        }

        Ok(())
    }

    async fn poll_height(&self) -> Option<i64> {
        match self.chain.current_height().await {
            Ok(height) => Some(height),
            Err(err) => {
                error!(error = ?err, "failed to get current block number");
                None
            }
        }
    }
}

/// Logs the outcome of an aggregation step. Failures do not stop the block.
fn log_step<T: Debug>(block: i64, step: &'static str, result: Result<T, WatcherError>) {
    match result {
        Ok(outcome) => debug!(block, step, outcome = ?outcome, "aggregation step done"),
        Err(err) => error!(block, step, error = ?err, "aggregation step failed"),
    }
}
