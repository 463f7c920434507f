//! Block, transaction and receipt objects as returned by the node.
//!
//! Numeric fields are kept in their wire encoding and parsed with [crate::quantity] by the
//! decomposer, so that a malformed value aborts the block instead of the request.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub number: String,
    pub hash: String,
    pub timestamp: String,
    pub miner: String,
    pub gas_used: String,
    /// Zero (or missing) after the merge.
    #[serde(default = "zero_quantity")]
    pub difficulty: String,
    #[serde(default)]
    pub uncles: Vec<String>,
    #[serde(default)]
    pub transactions: Vec<BlockTransaction>,
}

/// A block transaction, either inlined or referenced by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransaction {
    Hash(String),
    Full(RawTransaction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: String,
    pub from: String,
    /// `None` for contract creations.
    #[serde(default)]
    pub to: Option<String>,
    pub value: String,
    #[serde(default)]
    pub block_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub contract_address: Option<String>,
}

fn zero_quantity() -> String {
    "0x0".to_string()
}

impl RawTransaction {
    /// Returns the recipient, treating an empty string the same as a missing one.
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().filter(|to| !to.is_empty())
    }
}

impl RawReceipt {
    pub fn created_contract(&self) -> Option<&str> {
        self.contract_address
            .as_deref()
            .filter(|address| !address.is_empty())
    }
}
