use std::sync::Arc;

use error_stack::{report, Result, ResultExt};
use tracing::{debug, warn};

use crate::{
    chain::ChainReader,
    decomposer::BlockHeader,
    error::WatcherError,
    keys::{DateBucket, Keys},
    quantity::format_principal,
    records::{MinerRecord, RecentBlock, Transaction},
    store::Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorOptions {
    /// Capacity of the `recent_blocks` list.
    pub recent_blocks: usize,
    /// Capacity of the `recent_transactions` list.
    pub recent_transactions: usize,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            recent_blocks: 10,
            recent_transactions: 25,
        }
    }
}

/// Writes decomposed block data to the store's derived structures.
///
/// Every write appends, so replaying a block duplicates list entries and over-counts.
pub struct Aggregator<C, S> {
    chain: Arc<C>,
    store: Arc<S>,
    keys: Keys,
    options: AggregatorOptions,
}

impl<C, S> Aggregator<C, S>
where
    C: ChainReader,
    S: Store,
{
    pub fn new(chain: Arc<C>, store: Arc<S>, keys: Keys, options: AggregatorOptions) -> Self {
        Self {
            chain,
            store,
            keys,
            options,
        }
    }

    /// Pushes the block to the `recent_blocks` list, returning the list length after the push.
    pub async fn record_block(&self, header: &BlockHeader) -> Result<i64, WatcherError> {
        let recent = RecentBlock {
            block: header.number,
            timestamp: header.timestamp,
            miner: header.miner.clone(),
        };

        let value = to_json(&recent)?;
        self.push_capped(&self.keys.recent_blocks(), &value, self.options.recent_blocks)
            .await
    }

    /// Records every transaction of the block, returning how many were recorded.
    ///
    /// Stops at the first transaction that cannot be pushed to `recent_transactions`. Any other
    /// failed write is logged and the remaining writes still run; the call then fails once all
    /// transactions are recorded. Failed balance snapshots are logged only.
    pub async fn record_transactions(
        &self,
        header: &BlockHeader,
        transactions: &[Transaction],
    ) -> Result<usize, WatcherError> {
        let bucket = date_bucket(header)?;
        let mut failed_writes = 0;

        for tx in transactions {
            let value = to_json(tx)?;

            self.push_capped(
                &self.keys.recent_transactions(),
                &value,
                self.options.recent_transactions,
            )
            .await?;

            if tx.is_contract_creation() {
                debug!(transaction = %tx.hash, contract = %tx.to, "record contract creation");
            }

            failed_writes += self
                .record_transaction_history(header, &bucket, tx, &value)
                .await;
        }

        if failed_writes > 0 {
            return Err(report!(WatcherError::Store))
                .attach_printable("failed to record transaction history")
                .attach_printable_lazy(|| format!("failed writes: {failed_writes}"));
        }

        Ok(transactions.len())
    }

    /// Writes the per-address lists, balances and counters of one transaction.
    ///
    /// Returns the number of failed list and counter writes.
    async fn record_transaction_history(
        &self,
        header: &BlockHeader,
        bucket: &DateBucket,
        tx: &Transaction,
        value: &str,
    ) -> usize {
        let mut failed = 0;

        failed += skipped(self.push_head(&self.keys.txn_from(&tx.from), value).await);
        if let Some(to) = tx.recipient() {
            failed += skipped(self.push_head(&self.keys.txn_to(to), value).await);
            self.record_balance_or_warn(to, header.number).await;
        }
        self.record_balance_or_warn(&tx.from, header.number).await;

        if let Some(to) = tx.recipient() {
            failed += skipped(self.increment(&self.keys.txn_history_to(to, bucket)).await);
        }
        failed += skipped(
            self.increment(&self.keys.txn_history_from(&tx.from, bucket))
                .await,
        );
        failed += skipped(self.increment(&self.keys.txn_history_totals(bucket)).await);
        failed += skipped(
            self.increment(&self.keys.txn_history_totals_hourly(bucket))
                .await,
        );

        failed
    }

    /// Records the block's miner statistics, hash and miner balance.
    ///
    /// Every write is attempted. The call fails after the fact if any of them failed.
    pub async fn record_miner(
        &self,
        header: &BlockHeader,
        record: &MinerRecord,
    ) -> Result<(), WatcherError> {
        let bucket = date_bucket(header)?;
        let value = to_json(record)?;

        let mut failed_writes = 0;
        failed_writes += skipped(
            self.increment(&self.keys.miner_history(&header.miner, &bucket))
                .await,
        );
        failed_writes += skipped(
            self.increment(&self.keys.miner_history_hourly(&header.miner, &bucket))
                .await,
        );
        failed_writes += skipped(
            self.store
                .set(&self.keys.block_hash(&header.hash), &header.hash)
                .await
                .change_context(WatcherError::Store)
                .attach_printable("failed to record block hash")
                .attach_printable_lazy(|| format!("hash: {}", header.hash)),
        );
        failed_writes += skipped(
            self.push_head(&self.keys.block_miner(&header.miner), &value)
                .await,
        );

        self.record_balance_or_warn(&header.miner, header.number).await;

        if failed_writes > 0 {
            return Err(report!(WatcherError::Store))
                .attach_printable("failed to record miner statistics")
                .attach_printable_lazy(|| format!("failed writes: {failed_writes}"));
        }

        Ok(())
    }

    /// Pushes every uncle to the block's uncle list, returning the number of uncles.
    ///
    /// Individual push failures are logged and do not change the returned count.
    pub async fn record_uncles(
        &self,
        header: &BlockHeader,
        uncles: &[String],
    ) -> Result<usize, WatcherError> {
        let key = self.keys.uncle_block(header.number);

        for uncle in uncles {
            if let Err(err) = self.push_head(&key, uncle).await {
                warn!(block = header.number, uncle = %uncle, error = ?err, "failed to record uncle");
            }
        }

        Ok(uncles.len())
    }

    /// Appends the balance of `address` at `block_height` to its balance history.
    ///
    /// Returns the recorded balance, in the principal unit.
    pub async fn record_balance(
        &self,
        address: &str,
        block_height: i64,
    ) -> Result<String, WatcherError> {
        let balance = self
            .chain
            .balance(address, block_height)
            .await
            .change_context(WatcherError::Fetch)
            .attach_printable("failed to get balance")
            .attach_printable_lazy(|| format!("address: {address}"))?;

        let balance = format_principal(balance);

        self.store
            .list_push_tail(&self.keys.balance(address), &balance)
            .await
            .change_context(WatcherError::Store)
            .attach_printable("failed to record balance")
            .attach_printable_lazy(|| format!("address: {address}"))?;

        Ok(balance)
    }

    async fn record_balance_or_warn(&self, address: &str, block_height: i64) {
        match self.record_balance(address, block_height).await {
            Ok(balance) => {
                debug!(address = %address, block = block_height, balance = %balance, "recorded balance")
            }
            Err(err) => {
                warn!(address = %address, block = block_height, error = ?err, "failed to record balance")
            }
        }
    }

    /// Pushes to the head of a list that must not grow past `capacity`.
    ///
    /// Returns the list length right after the push, before trimming.
    async fn push_capped(
        &self,
        key: &str,
        value: &str,
        capacity: usize,
    ) -> Result<i64, WatcherError> {
        let capacity = capacity.max(1) as i64;
        let len = self.push_head(key, value).await?;

        if len > capacity {
            self.store
                .list_trim(key, 0, capacity - 1)
                .await
                .change_context(WatcherError::Store)
                .attach_printable("failed to trim list")
                .attach_printable_lazy(|| format!("key: {key}"))?;
        }

        Ok(len)
    }

    async fn push_head(&self, key: &str, value: &str) -> Result<i64, WatcherError> {
        self.store
            .list_push_head(key, value)
            .await
            .change_context(WatcherError::Store)
            .attach_printable("failed to push to list")
            .attach_printable_lazy(|| format!("key: {key}"))
    }

    async fn increment(&self, key: &str) -> Result<i64, WatcherError> {
        self.store
            .increment(key)
            .await
            .change_context(WatcherError::Store)
            .attach_printable("failed to increment counter")
            .attach_printable_lazy(|| format!("key: {key}"))
    }
}

/// Logs a failed derived-data write. Returns `1` if it failed.
fn skipped<T>(result: Result<T, WatcherError>) -> usize {
    match result {
        Ok(_) => 0,
        Err(err) => {
            warn!(error = ?err, "failed to write derived data");
            1
        }
    }
}

fn date_bucket(header: &BlockHeader) -> Result<DateBucket, WatcherError> {
    DateBucket::from_timestamp(header.timestamp)
        .ok_or(WatcherError::Parse)
        .attach_printable("block timestamp out of range")
        .attach_printable_lazy(|| format!("timestamp: {}", header.timestamp))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, WatcherError> {
    serde_json::to_string(value)
        .change_context(WatcherError::Fatal)
        .attach_printable("failed to serialize record")
}
