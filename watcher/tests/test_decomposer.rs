mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use blockwatcher::{BlockDecomposer, WatcherError};

use crate::common::{raw_block, raw_transaction, ScriptedChain, GENESIS_TIMESTAMP};

#[test]
fn test_decompose_block_header() {
    let decomposer = BlockDecomposer::new(Arc::new(ScriptedChain::default()));

    let header = decomposer.decompose_block(&raw_block(0x1b4)).unwrap();
    assert_eq!(header.number, 436);
    assert_eq!(header.timestamp, GENESIS_TIMESTAMP + 436 * 12);
    assert_eq!(header.miner, "0xminer");
    assert_eq!(header.hash, common::block_hash(436));
}

#[test]
fn test_decompose_block_with_malformed_timestamp() {
    let decomposer = BlockDecomposer::new(Arc::new(ScriptedChain::default()));

    let mut block = raw_block(1);
    block.timestamp = "yesterday".to_string();

    let err = decomposer.decompose_block(&block).unwrap_err();
    assert_matches!(err.current_context(), WatcherError::Parse);
}

#[test]
fn test_decompose_miner() {
    let decomposer = BlockDecomposer::new(Arc::new(ScriptedChain::default()));

    let miner = decomposer.decompose_miner(&raw_block(7)).unwrap();
    assert_eq!(miner.block, 7);
    assert_eq!(miner.timestamp, GENESIS_TIMESTAMP + 7 * 12);
    assert_eq!(miner.gas, 21_000);
    assert_eq!(miner.difficulty, 21_109_876_668);
}

#[test]
fn test_decompose_uncles() {
    let decomposer = BlockDecomposer::new(Arc::new(ScriptedChain::default()));

    let mut block = raw_block(7);
    assert!(decomposer.decompose_uncles(&block).is_empty());

    block.uncles = vec!["0xu1".to_string(), "0xu2".to_string()];
    assert_eq!(decomposer.decompose_uncles(&block), vec!["0xu1", "0xu2"]);
}

#[tokio::test]
async fn test_decompose_transactions_in_index_order() {
    let chain = Arc::new(ScriptedChain::default());
    chain.add_block(
        raw_block(5),
        vec![
            raw_transaction("0xt0", "0xa", Some("0xb"), "0x0"),
            raw_transaction("0xt1", "0xb", Some("0xc"), "0xde0b6b3a7640000"),
        ],
    );
    let decomposer = BlockDecomposer::new(chain);

    let header = decomposer.decompose_block(&raw_block(5)).unwrap();
    let transactions = decomposer.decompose_transactions(&header).await.unwrap();

    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].hash, "0xt0");
    assert_eq!(transactions[0].value, "0");
    assert_eq!(transactions[1].hash, "0xt1");
    assert_eq!(transactions[1].from, "0xb");
    assert_eq!(transactions[1].to, "0xc");
    assert_eq!(transactions[1].value, "1000000000000000000");
    assert_eq!(transactions[1].number, 5);
    assert_eq!(transactions[1].timestamp, header.timestamp);
    assert!(!transactions[1].is_contract_creation());
}

#[tokio::test]
async fn test_decompose_transactions_keeps_values_above_i64() {
    let chain = Arc::new(ScriptedChain::default());
    chain.add_block(
        raw_block(5),
        vec![raw_transaction(
            "0xt0",
            "0xa",
            Some("0xb"),
            "0xffffffffffffffffffff",
        )],
    );
    let decomposer = BlockDecomposer::new(chain);

    let header = decomposer.decompose_block(&raw_block(5)).unwrap();
    let transactions = decomposer.decompose_transactions(&header).await.unwrap();

    assert_eq!(transactions[0].value, "1208925819614629174706175");
}

#[tokio::test]
async fn test_contract_creation_takes_receipt_address() {
    let chain = Arc::new(ScriptedChain::default());
    chain.add_block(
        raw_block(5),
        vec![
            raw_transaction("0xcreate", "0xa", None, "0x0"),
            raw_transaction("0xfailed", "0xa", Some(""), "0x0"),
            raw_transaction("0xmissing", "0xa", None, "0x0"),
        ],
    );
    chain.set_receipt("0xcreate", Some("0xABC"));
    chain.set_receipt("0xfailed", None);
    let decomposer = BlockDecomposer::new(chain);

    let header = decomposer.decompose_block(&raw_block(5)).unwrap();
    let transactions = decomposer.decompose_transactions(&header).await.unwrap();

    assert_eq!(transactions[0].to, "0xABC");
    assert_eq!(transactions[0].contract, 1);
    assert!(transactions[0].is_contract_creation());

    assert_eq!(transactions[1].to, "");
    assert_eq!(transactions[1].contract, 0);

    assert_eq!(transactions[2].to, "");
    assert_eq!(transactions[2].contract, 0);
    assert!(transactions[2].recipient().is_none());
}

#[tokio::test]
async fn test_transaction_fetch_failure_fails_the_block() {
    let chain = Arc::new(ScriptedChain::default());
    chain.add_block(
        raw_block(5),
        vec![raw_transaction("0xt0", "0xa", Some("0xb"), "0x1")],
    );
    chain.set_transaction_count(5, 2);
    let decomposer = BlockDecomposer::new(chain);

    let header = decomposer.decompose_block(&raw_block(5)).unwrap();
    let err = decomposer.decompose_transactions(&header).await.unwrap_err();

    assert_matches!(err.current_context(), WatcherError::Fetch);
}

#[tokio::test]
async fn test_malformed_transaction_value_fails_the_block() {
    let chain = Arc::new(ScriptedChain::default());
    chain.add_block(
        raw_block(5),
        vec![raw_transaction("0xt0", "0xa", Some("0xb"), "0xnope")],
    );
    let decomposer = BlockDecomposer::new(chain);

    let header = decomposer.decompose_block(&raw_block(5)).unwrap();
    let err = decomposer.decompose_transactions(&header).await.unwrap_err();

    assert_matches!(err.current_context(), WatcherError::Parse);
}
