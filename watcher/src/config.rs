use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use backon::ExponentialBuilder;
use error_stack::{report, Result, ResultExt};
use serde::Deserialize;
use url::Url;

use crate::{
    aggregator::AggregatorOptions, chain::JsonRpcChainReaderOptions, error::WatcherError,
    ingestion::IngestionOptions, keys::Keys,
};

/// Blockwatcher configuration, loaded from a TOML file.
///
/// ```toml
/// [redis]
/// host = "127.0.0.1"
/// port = 6379
/// password = ""
/// prefix = "mainnet:"
///
/// [node]
/// host = "127.0.0.1"
/// port = 8545
///
/// [limits]
/// recentBlocks = 10
/// recentTransactions = 25
///
/// [log]
/// path = "./blockwatcher.log"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub redis: RedisConfiguration,
    pub node: NodeConfiguration,
    pub limits: LimitsConfiguration,
    pub log: LogConfiguration,
    pub ingestion: IngestionConfiguration,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RedisConfiguration {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Prepended to every key.
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfiguration {
    /// Host name, or a full `http(s)://` url.
    pub host: String,
    pub port: u16,
    /// Request timeout, retries included.
    pub timeout_sec: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LimitsConfiguration {
    pub recent_blocks: usize,
    pub recent_transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfiguration {
    /// Log file path. Empty to only log to stdout.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestionConfiguration {
    pub poll_interval_ms: u64,
}

impl Configuration {
    pub fn from_file(path: &Path) -> Result<Self, WatcherError> {
        let content = std::fs::read_to_string(path)
            .change_context(WatcherError::Configuration)
            .attach_printable("unable to open config")
            .attach_printable_lazy(|| format!("path: {}", path.display()))?;

        Self::from_toml(&content)
            .attach_printable_lazy(|| format!("path: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self, WatcherError> {
        let configuration: Configuration = toml::from_str(content)
            .change_context(WatcherError::Configuration)
            .attach_printable("malformed config")?;

        configuration.validate()?;
        Ok(configuration)
    }

    fn validate(&self) -> Result<(), WatcherError> {
        if self.limits.recent_blocks == 0 {
            return Err(report!(WatcherError::Configuration))
                .attach_printable("limits.recentBlocks must be at least 1");
        }

        if self.limits.recent_transactions == 0 {
            return Err(report!(WatcherError::Configuration))
                .attach_printable("limits.recentTransactions must be at least 1");
        }

        Ok(())
    }

    pub fn redis_url(&self) -> Result<String, WatcherError> {
        let redis = &self.redis;
        let mut url = Url::parse(&format!("redis://{}:{}/0", redis.host, redis.port))
            .change_context(WatcherError::Configuration)
            .attach_printable("invalid redis host")
            .attach_printable_lazy(|| format!("host: {}", redis.host))?;

        if !redis.password.is_empty() {
            url.set_password(Some(&redis.password))
                .map_err(|_| report!(WatcherError::Configuration))
                .attach_printable("invalid redis password")?;
        }

        Ok(url.into())
    }

    pub fn node_url(&self) -> Result<Url, WatcherError> {
        let node = &self.node;
        let url = if node.host.contains("://") {
            node.host.clone()
        } else {
            format!("http://{}:{}", node.host, node.port)
        };

        url.parse::<Url>()
            .change_context(WatcherError::Configuration)
            .attach_printable("failed to parse node url")
            .attach_printable_lazy(|| format!("url: {url}"))
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        if self.log.path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.log.path))
        }
    }

    pub fn keys(&self) -> Keys {
        Keys::new(self.redis.prefix.clone())
    }

    pub fn aggregator_options(&self) -> AggregatorOptions {
        AggregatorOptions {
            recent_blocks: self.limits.recent_blocks,
            recent_transactions: self.limits.recent_transactions,
        }
    }

    pub fn ingestion_options(&self) -> IngestionOptions {
        IngestionOptions {
            poll_interval: Duration::from_millis(self.ingestion.poll_interval_ms),
        }
    }

    pub fn chain_reader_options(&self) -> JsonRpcChainReaderOptions {
        let timeout = Duration::from_secs(self.node.timeout_sec);
        JsonRpcChainReaderOptions {
            timeout,
            exponential_backoff: ExponentialBuilder::default()
                .with_max_delay(timeout / 2)
                .with_max_times(3),
        }
    }
}

impl Default for RedisConfiguration {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: String::new(),
            prefix: String::new(),
        }
    }
}

impl Default for NodeConfiguration {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8545,
            timeout_sec: 20,
        }
    }
}

impl Default for LimitsConfiguration {
    fn default() -> Self {
        let defaults = AggregatorOptions::default();
        Self {
            recent_blocks: defaults.recent_blocks,
            recent_transactions: defaults.recent_transactions,
        }
    }
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            path: "./blockwatcher.log".to_string(),
        }
    }
}

impl Default for IngestionConfiguration {
    fn default() -> Self {
        Self {
            poll_interval_ms: IngestionOptions::default().poll_interval.as_millis() as u64,
        }
    }
}
