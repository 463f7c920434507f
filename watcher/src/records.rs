//! Records persisted in the store, serialized as JSON.
use serde::{Deserialize, Serialize};

/// Entry of the `recent_blocks` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentBlock {
    pub block: i64,
    pub timestamp: i64,
    pub miner: String,
}

/// A decomposed transaction.
///
/// Entry of the `recent_transactions` list and of the per-address histories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: String,
    pub timestamp: i64,
    /// Transferred value in the smallest unit, as a decimal string.
    pub value: String,
    pub from: String,
    /// Recipient, or the created contract address. Empty if neither is known.
    pub to: String,
    pub number: i64,
    /// `1` if `to` is a contract created by this transaction.
    pub contract: u8,
}

/// Entry of the per-miner `block_miner` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerRecord {
    pub block: i64,
    pub timestamp: i64,
    pub gas: i64,
    pub difficulty: i64,
}

impl Transaction {
    pub fn is_contract_creation(&self) -> bool {
        self.contract == 1
    }

    pub fn recipient(&self) -> Option<&str> {
        if self.to.is_empty() {
            None
        } else {
            Some(&self.to)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Transaction;

    #[test]
    fn test_transaction_json_layout() {
        let tx = Transaction {
            hash: "0x01".to_string(),
            timestamp: 1_438_269_988,
            value: "1500000000000000000".to_string(),
            from: "0xa".to_string(),
            to: "0xabc".to_string(),
            number: 436,
            contract: 1,
        };

        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "hash": "0x01",
                "timestamp": 1438269988,
                "value": "1500000000000000000",
                "from": "0xa",
                "to": "0xabc",
                "number": 436,
                "contract": 1
            })
        );
        assert!(tx.is_contract_creation());
    }
}
