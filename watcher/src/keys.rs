//! Store key layout.
//!
//! Every key is prefixed with the configured namespace so that several deployments can share
//! one store.
use std::fmt::Display;

use chrono::{DateTime, Datelike, Timelike, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keys {
    prefix: String,
}

/// Daily and hourly bucket of a block timestamp, in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateBucket {
    /// `<year>-<month>-<day>`, without zero padding.
    pub date: String,
    /// `0..=23`.
    pub hour: u32,
}

impl Keys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, name: impl Display) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn last_block_id(&self) -> String {
        self.key("last_block_id")
    }

    pub fn recent_blocks(&self) -> String {
        self.key("recent_blocks")
    }

    pub fn recent_transactions(&self) -> String {
        self.key("recent_transactions")
    }

    pub fn txn_from(&self, address: &str) -> String {
        self.key(format_args!("txn_from_{address}"))
    }

    pub fn txn_to(&self, address: &str) -> String {
        self.key(format_args!("txn_to_{address}"))
    }

    pub fn balance(&self, address: &str) -> String {
        self.key(format_args!("balance_{address}"))
    }

    pub fn block_hash(&self, hash: &str) -> String {
        self.key(format_args!("block_hash_{hash}"))
    }

    pub fn block_miner(&self, miner: &str) -> String {
        self.key(format_args!("block_miner_{miner}"))
    }

    pub fn uncle_block(&self, number: i64) -> String {
        self.key(format_args!("uncle_block_{number}"))
    }

    pub fn txn_history_to(&self, address: &str, bucket: &DateBucket) -> String {
        self.key(format_args!("txn_history_to_{address}_{}", bucket.date))
    }

    pub fn txn_history_from(&self, address: &str, bucket: &DateBucket) -> String {
        self.key(format_args!("txn_history_from_{address}_{}", bucket.date))
    }

    pub fn txn_history_totals(&self, bucket: &DateBucket) -> String {
        self.key(format_args!("txn_history_totals_{}", bucket.date))
    }

    pub fn txn_history_totals_hourly(&self, bucket: &DateBucket) -> String {
        self.key(format_args!(
            "txn_history_totals_{}_{}",
            bucket.date, bucket.hour
        ))
    }

    pub fn miner_history(&self, miner: &str, bucket: &DateBucket) -> String {
        self.key(format_args!("miner_history_{miner}_{}", bucket.date))
    }

    pub fn miner_history_hourly(&self, miner: &str, bucket: &DateBucket) -> String {
        self.key(format_args!(
            "miner_history_{miner}_{}_{}",
            bucket.date, bucket.hour
        ))
    }
}

impl DateBucket {
    /// Returns the bucket of the given unix timestamp, or `None` if it's out of range.
    pub fn from_timestamp(timestamp: i64) -> Option<Self> {
        let time: DateTime<Utc> = DateTime::from_timestamp(timestamp, 0)?;
        Some(Self {
            date: format!("{}-{}-{}", time.year(), time.month(), time.day()),
            hour: time.hour(),
        })
    }
}
