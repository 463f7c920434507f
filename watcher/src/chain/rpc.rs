use std::time::Duration;

use alloy_primitives::U256;
use alloy_rpc_client::ReqwestClient;
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use error_stack::{Result, ResultExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::quantity::{parse_i64, parse_u256, to_quantity};

use super::{ChainReader, ChainReaderError, RawBlock, RawReceipt, RawTransaction};

#[derive(Debug, Clone)]
pub struct JsonRpcChainReaderOptions {
    /// Request timeout, retries included.
    pub timeout: Duration,
    /// Exponential backoff options.
    pub exponential_backoff: ExponentialBuilder,
}

/// A [ChainReader] backed by the node's Ethereum JSON-RPC interface.
#[derive(Clone)]
pub struct JsonRpcChainReader {
    client: ReqwestClient,
    options: JsonRpcChainReaderOptions,
}

impl JsonRpcChainReader {
    pub fn new(url: Url, options: JsonRpcChainReaderOptions) -> Self {
        let client = ReqwestClient::new_http(url);
        Self { client, options }
    }

    async fn call<T>(&self, method: &'static str, params: Value) -> Result<T, ChainReaderError>
    where
        T: DeserializeOwned,
    {
        let request = (|| async {
            self.client
                .request::<_, Value>(method, params.clone())
                .await
        })
        .retry(self.options.exponential_backoff)
        .notify(|err, delay| {
            debug!(method, error = %err, delay = ?delay, "retrying request");
        });

        let Ok(response) = tokio::time::timeout(self.options.timeout, request).await else {
            return Err(ChainReaderError::Timeout)
                .attach_printable("request timed out")
                .attach_printable_lazy(|| format!("method: {method}"));
        };

        let value = response
            .change_context(ChainReaderError::Request)
            .attach_printable_lazy(|| format!("method: {method}"))?;

        serde_json::from_value(value)
            .change_context(ChainReaderError::Response)
            .attach_printable("failed to deserialize response")
            .attach_printable_lazy(|| format!("method: {method}"))
    }
}

impl Default for JsonRpcChainReaderOptions {
    fn default() -> Self {
        let timeout = Duration::from_secs(20);
        Self {
            timeout,
            exponential_backoff: ExponentialBuilder::default()
                .with_max_delay(timeout / 2)
                .with_max_times(3),
        }
    }
}

#[async_trait]
impl ChainReader for JsonRpcChainReader {
    async fn current_height(&self) -> Result<i64, ChainReaderError> {
        let height: String = self.call("eth_blockNumber", json!([])).await?;
        parse_i64(&height)
            .change_context(ChainReaderError::Response)
            .attach_printable("invalid block number")
    }

    async fn block_by_number(
        &self,
        number: i64,
        include_bodies: bool,
    ) -> Result<RawBlock, ChainReaderError> {
        let block: Option<RawBlock> = self
            .call(
                "eth_getBlockByNumber",
                json!([to_quantity(number), include_bodies]),
            )
            .await?;

        block
            .ok_or(ChainReaderError::NotFound)
            .attach_printable_lazy(|| format!("block number: {number}"))
    }

    async fn transaction_count_by_number(&self, number: i64) -> Result<i64, ChainReaderError> {
        let count: Option<String> = self
            .call(
                "eth_getBlockTransactionCountByNumber",
                json!([to_quantity(number)]),
            )
            .await?;

        let count = count
            .ok_or(ChainReaderError::NotFound)
            .attach_printable_lazy(|| format!("block number: {number}"))?;

        parse_i64(&count)
            .change_context(ChainReaderError::Response)
            .attach_printable("invalid transaction count")
    }

    async fn transaction_by_block_number_and_index(
        &self,
        number: i64,
        index: i64,
    ) -> Result<RawTransaction, ChainReaderError> {
        let transaction: Option<RawTransaction> = self
            .call(
                "eth_getTransactionByBlockNumberAndIndex",
                json!([to_quantity(number), to_quantity(index)]),
            )
            .await?;

        transaction
            .ok_or(ChainReaderError::NotFound)
            .attach_printable_lazy(|| format!("block number: {number}, index: {index}"))
    }

    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<RawReceipt>, ChainReaderError> {
        self.call("eth_getTransactionReceipt", json!([hash])).await
    }

    async fn balance(&self, address: &str, block_height: i64) -> Result<U256, ChainReaderError> {
        let balance: String = self
            .call(
                "eth_getBalance",
                json!([address, to_quantity(block_height)]),
            )
            .await?;

        parse_u256(&balance)
            .change_context(ChainReaderError::Response)
            .attach_printable("invalid balance")
            .attach_printable_lazy(|| format!("address: {address}"))
    }
}
