mod models;
mod rpc;

use std::fmt;

use alloy_primitives::U256;
use async_trait::async_trait;
use error_stack::{Report, Result};

pub use self::models::{BlockTransaction, RawBlock, RawReceipt, RawTransaction};
pub use self::rpc::{JsonRpcChainReader, JsonRpcChainReaderOptions};

#[derive(Debug)]
pub enum ChainReaderError {
    Request,
    Timeout,
    NotFound,
    Response,
}

/// Read-only access to the chain node.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Returns the number of the most recent block.
    async fn current_height(&self) -> Result<i64, ChainReaderError>;

    /// Returns the block with the given number.
    ///
    /// With `include_bodies` the block's transactions are inlined, otherwise only their hashes
    /// are returned.
    async fn block_by_number(
        &self,
        number: i64,
        include_bodies: bool,
    ) -> Result<RawBlock, ChainReaderError>;

    /// Returns the number of transactions in the block with the given number.
    async fn transaction_count_by_number(&self, number: i64) -> Result<i64, ChainReaderError>;

    async fn transaction_by_block_number_and_index(
        &self,
        number: i64,
        index: i64,
    ) -> Result<RawTransaction, ChainReaderError>;

    /// Returns the receipt of the given transaction, if the node knows about it.
    async fn transaction_receipt(&self, hash: &str)
        -> Result<Option<RawReceipt>, ChainReaderError>;

    /// Returns the balance of `address`, in the smallest unit, as of block `block_height`.
    async fn balance(&self, address: &str, block_height: i64) -> Result<U256, ChainReaderError>;
}

pub trait ChainReaderErrorExt {
    fn is_not_found(&self) -> bool;
}

impl error_stack::Context for ChainReaderError {}

impl fmt::Display for ChainReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainReaderError::Request => write!(f, "failed to send request"),
            ChainReaderError::Timeout => write!(f, "request timed out"),
            ChainReaderError::NotFound => write!(f, "not found"),
            ChainReaderError::Response => write!(f, "malformed response"),
        }
    }
}

impl ChainReaderErrorExt for Report<ChainReaderError> {
    fn is_not_found(&self) -> bool {
        matches!(self.current_context(), ChainReaderError::NotFound)
    }
}
