//! Tails a chain's canonical blocks and materializes recent-activity feeds, per-address
//! histories, balance snapshots and miner statistics into a key-value store.
pub mod aggregator;
pub mod chain;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod decomposer;
pub mod error;
pub mod ingestion;
pub mod keys;
pub mod quantity;
pub mod records;
pub mod store;

use std::sync::Arc;

use error_stack::{Result, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use self::aggregator::{Aggregator, AggregatorOptions};
pub use self::config::Configuration;
pub use self::cursor::CursorManager;
pub use self::decomposer::{BlockDecomposer, BlockHeader};
pub use self::error::{ReportExt, WatcherError, WatcherErrorResultExt};
pub use self::ingestion::{IngestionLoop, IngestionOptions};
pub use self::keys::Keys;

use self::{chain::JsonRpcChainReader, store::RedisStore};

/// Connects to the node and the store, then ingests blocks until `ct` is cancelled.
pub async fn run_watcher(
    configuration: Configuration,
    ct: CancellationToken,
) -> Result<(), WatcherError> {
    info!("Starting up");

    let store = RedisStore::connect(&configuration.redis_url()?)
        .await
        .change_context(WatcherError::Store)
        .attach_printable("failed to connect to the store")?;

    let node_url = configuration.node_url()?;
    info!(node = %node_url, "connecting to chain node");
    let chain = JsonRpcChainReader::new(node_url, configuration.chain_reader_options());

    let keys = configuration.keys();
    info!(prefix = %keys.prefix(), "using store key prefix");

    let ingestion = IngestionLoop::new(
        Arc::new(chain),
        Arc::new(store),
        keys,
        configuration.aggregator_options(),
        configuration.ingestion_options(),
    );

    ingestion.start(ct).await
}
