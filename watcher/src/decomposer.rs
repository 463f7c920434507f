use std::sync::Arc;

use error_stack::{Result, ResultExt};
use tracing::debug;

use crate::{
    chain::{ChainReader, RawBlock},
    error::WatcherError,
    quantity::{parse_i64, parse_u256},
    records::{MinerRecord, Transaction},
};

/// The parsed header fields of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: i64,
    pub timestamp: i64,
    pub hash: String,
    pub miner: String,
}

/// Splits a fetched block into the records written by the aggregator.
pub struct BlockDecomposer<C> {
    chain: Arc<C>,
}

impl<C> BlockDecomposer<C>
where
    C: ChainReader,
{
    pub fn new(chain: Arc<C>) -> Self {
        Self { chain }
    }

    pub fn decompose_block(&self, raw: &RawBlock) -> Result<BlockHeader, WatcherError> {
        let number = parse_i64(&raw.number)
            .change_context(WatcherError::Parse)
            .attach_printable("invalid block number")?;
        let timestamp = parse_i64(&raw.timestamp)
            .change_context(WatcherError::Parse)
            .attach_printable("invalid block timestamp")
            .attach_printable_lazy(|| format!("block number: {number}"))?;

        Ok(BlockHeader {
            number,
            timestamp,
            hash: raw.hash.clone(),
            miner: raw.miner.clone(),
        })
    }

    /// Fetches the block's transactions one by one, resolving contract creations.
    ///
    /// Fails on the first fetch error, the block must not be partially aggregated.
    pub async fn decompose_transactions(
        &self,
        header: &BlockHeader,
    ) -> Result<Vec<Transaction>, WatcherError> {
        let count = self
            .chain
            .transaction_count_by_number(header.number)
            .await
            .change_context(WatcherError::Fetch)
            .attach_printable("failed to get transaction count")
            .attach_printable_lazy(|| format!("block number: {}", header.number))?;

        debug!(block = header.number, count, "decompose transactions");

        let mut transactions = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let raw = self
                .chain
                .transaction_by_block_number_and_index(header.number, index)
                .await
                .change_context(WatcherError::Fetch)
                .attach_printable("failed to get transaction by index")
                .attach_printable_lazy(|| {
                    format!("block number: {}, index: {index}", header.number)
                })?;

            let value = parse_u256(&raw.value)
                .change_context(WatcherError::Parse)
                .attach_printable("invalid transaction value")
                .attach_printable_lazy(|| format!("transaction: {}", raw.hash))?;

            let (to, contract) = match raw.recipient() {
                Some(to) => (to.to_string(), 0),
                None => self.resolve_created_contract(&raw.hash).await?,
            };

            transactions.push(Transaction {
                hash: raw.hash,
                timestamp: header.timestamp,
                value: value.to_string(),
                from: raw.from,
                to,
                number: header.number,
                contract,
            });
        }

        Ok(transactions)
    }

    async fn resolve_created_contract(&self, hash: &str) -> Result<(String, u8), WatcherError> {
        let receipt = self
            .chain
            .transaction_receipt(hash)
            .await
            .change_context(WatcherError::Fetch)
            .attach_printable("failed to get transaction receipt")
            .attach_printable_lazy(|| format!("transaction: {hash}"))?;

        match receipt.as_ref().and_then(|r| r.created_contract()) {
            Some(address) => {
                debug!(transaction = %hash, contract = %address, "contract creation");
                Ok((address.to_string(), 1))
            }
            None => Ok((String::new(), 0)),
        }
    }

    pub fn decompose_uncles(&self, raw: &RawBlock) -> Vec<String> {
        raw.uncles.clone()
    }

    pub fn decompose_miner(&self, raw: &RawBlock) -> Result<MinerRecord, WatcherError> {
        let parse = |value: &str, field: &'static str| {
            parse_i64(value)
                .change_context(WatcherError::Parse)
                .attach_printable_lazy(|| format!("invalid block {field}"))
                .attach_printable_lazy(|| format!("block number: {}", raw.number))
        };

        Ok(MinerRecord {
            block: parse(&raw.number, "number")?,
            timestamp: parse(&raw.timestamp, "timestamp")?,
            gas: parse(&raw.gas_used, "gas used")?,
            difficulty: parse(&raw.difficulty, "difficulty")?,
        })
    }
}
