#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use alloy_primitives::U256;
use async_trait::async_trait;
use blockwatcher::{
    chain::{BlockTransaction, ChainReader, ChainReaderError, RawBlock, RawReceipt, RawTransaction},
    quantity::to_quantity,
    store::{InMemoryStore, Store, StoreError},
    AggregatorOptions, IngestionLoop, IngestionOptions, Keys,
};
use error_stack::{report, Result};

pub const PREFIX: &str = "test:";

/// 2021-01-05T03:00:00Z
pub const GENESIS_TIMESTAMP: i64 = 1_609_815_600;

pub fn keys() -> Keys {
    Keys::new(PREFIX)
}

pub fn key(name: &str) -> String {
    format!("{PREFIX}{name}")
}

pub fn block_hash(number: i64) -> String {
    format!("0x{number:064x}")
}

/// A block mined by `0xminer`, 12 seconds after the previous one.
pub fn raw_block(number: i64) -> RawBlock {
    RawBlock {
        number: to_quantity(number),
        hash: block_hash(number),
        timestamp: to_quantity(GENESIS_TIMESTAMP + number * 12),
        miner: "0xminer".to_string(),
        gas_used: "0x5208".to_string(),
        difficulty: "0x4ea3f27bc".to_string(),
        uncles: Vec::new(),
        transactions: Vec::new(),
    }
}

pub fn raw_transaction(hash: &str, from: &str, to: Option<&str>, value: &str) -> RawTransaction {
    RawTransaction {
        hash: hash.to_string(),
        from: from.to_string(),
        to: to.map(str::to_string),
        value: value.to_string(),
        block_number: None,
    }
}

#[derive(Default)]
struct ChainState {
    height: i64,
    blocks: HashMap<i64, (RawBlock, Vec<RawTransaction>)>,
    transaction_counts: HashMap<i64, i64>,
    receipts: HashMap<String, RawReceipt>,
    balances: HashMap<String, U256>,
    failing_balances: HashSet<String>,
    block_failures: HashMap<i64, usize>,
    fetched: Vec<i64>,
}

/// An in-memory chain whose content and failures are scripted by the test.
#[derive(Default)]
pub struct ScriptedChain {
    state: Mutex<ChainState>,
}

impl ScriptedChain {
    /// Creates a chain with empty blocks `1..=height`.
    pub fn with_empty_blocks(height: i64) -> Self {
        let chain = Self::default();
        for number in 1..=height {
            chain.add_block(raw_block(number), Vec::new());
        }
        chain
    }

    /// Adds a block with the given transactions and moves the head to it if it's higher.
    pub fn add_block(&self, mut block: RawBlock, transactions: Vec<RawTransaction>) {
        let number = blockwatcher::quantity::parse_i64(&block.number).unwrap();
        block.transactions = transactions
            .iter()
            .cloned()
            .map(BlockTransaction::Full)
            .collect();

        let mut state = self.state.lock().unwrap();
        state.height = state.height.max(number);
        state.blocks.insert(number, (block, transactions));
    }

    pub fn set_height(&self, height: i64) {
        self.state.lock().unwrap().height = height;
    }

    /// Reports `count` transactions for the block, regardless of how many it has.
    pub fn set_transaction_count(&self, number: i64, count: i64) {
        self.state
            .lock()
            .unwrap()
            .transaction_counts
            .insert(number, count);
    }

    pub fn set_receipt(&self, hash: &str, contract_address: Option<&str>) {
        let receipt = RawReceipt {
            transaction_hash: hash.to_string(),
            contract_address: contract_address.map(str::to_string),
        };
        self.state
            .lock()
            .unwrap()
            .receipts
            .insert(hash.to_string(), receipt);
    }

    pub fn set_balance(&self, address: &str, balance: U256) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(address.to_string(), balance);
    }

    pub fn fail_balance(&self, address: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_balances
            .insert(address.to_string());
    }

    /// The next `times` fetches of block `number` fail.
    pub fn fail_block(&self, number: i64, times: usize) {
        self.state
            .lock()
            .unwrap()
            .block_failures
            .insert(number, times);
    }

    /// Block numbers requested so far, failed attempts included.
    pub fn fetched_blocks(&self) -> Vec<i64> {
        self.state.lock().unwrap().fetched.clone()
    }
}

#[async_trait]
impl ChainReader for ScriptedChain {
    async fn current_height(&self) -> Result<i64, ChainReaderError> {
        Ok(self.state.lock().unwrap().height)
    }

    async fn block_by_number(
        &self,
        number: i64,
        _include_bodies: bool,
    ) -> Result<RawBlock, ChainReaderError> {
        let mut state = self.state.lock().unwrap();
        state.fetched.push(number);

        if let Some(failures) = state.block_failures.get_mut(&number) {
            if *failures > 0 {
                *failures -= 1;
                return Err(report!(ChainReaderError::Request))
                    .map_err(|err| err.attach_printable("scripted failure"));
            }
        }

        state
            .blocks
            .get(&number)
            .map(|(block, _)| block.clone())
            .ok_or_else(|| report!(ChainReaderError::NotFound))
    }

    async fn transaction_count_by_number(&self, number: i64) -> Result<i64, ChainReaderError> {
        let state = self.state.lock().unwrap();
        if let Some(count) = state.transaction_counts.get(&number) {
            return Ok(*count);
        }

        state
            .blocks
            .get(&number)
            .map(|(_, transactions)| transactions.len() as i64)
            .ok_or_else(|| report!(ChainReaderError::NotFound))
    }

    async fn transaction_by_block_number_and_index(
        &self,
        number: i64,
        index: i64,
    ) -> Result<RawTransaction, ChainReaderError> {
        let state = self.state.lock().unwrap();
        state
            .blocks
            .get(&number)
            .and_then(|(_, transactions)| transactions.get(index as usize))
            .cloned()
            .ok_or_else(|| report!(ChainReaderError::NotFound))
    }

    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<RawReceipt>, ChainReaderError> {
        Ok(self.state.lock().unwrap().receipts.get(hash).cloned())
    }

    async fn balance(&self, address: &str, _block_height: i64) -> Result<U256, ChainReaderError> {
        let state = self.state.lock().unwrap();
        if address.is_empty() || state.failing_balances.contains(address) {
            return Err(report!(ChainReaderError::Request));
        }
        Ok(state.balances.get(address).copied().unwrap_or_default())
    }
}

/// Wraps an [InMemoryStore], failing writes to keys that start with one of the given prefixes.
#[derive(Default)]
pub struct FailingStore {
    inner: InMemoryStore,
    failing: Mutex<Vec<String>>,
}

impl FailingStore {
    pub fn fail_writes_to(&self, prefix: &str) {
        self.failing.lock().unwrap().push(prefix.to_string());
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        let failing = self.failing.lock().unwrap();
        if failing.iter().any(|prefix| key.starts_with(prefix.as_str())) {
            return Err(report!(StoreError::Command));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check(key)?;
        self.inner.set(key, value).await
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.check(key)?;
        self.inner.increment(key).await
    }

    async fn list_push_head(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        self.check(key)?;
        self.inner.list_push_head(key, value).await
    }

    async fn list_push_tail(&self, key: &str, value: &str) -> Result<i64, StoreError> {
        self.check(key)?;
        self.inner.list_push_tail(key, value).await
    }

    async fn list_trim(&self, key: &str, start: i64, stop: i64) -> Result<(), StoreError> {
        self.check(key)?;
        self.inner.list_trim(key, start, stop).await
    }
}

pub fn new_ingestion<S: Store>(
    chain: Arc<ScriptedChain>,
    store: Arc<S>,
    options: AggregatorOptions,
) -> IngestionLoop<ScriptedChain, S> {
    let ingestion_options = IngestionOptions {
        poll_interval: std::time::Duration::from_millis(10),
    };
    IngestionLoop::new(chain, store, keys(), options, ingestion_options)
}
