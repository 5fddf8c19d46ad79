use alloy_primitives::{Address, B256};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON-RPC error {code} from {method}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Unexpected {method} response: {detail}")]
    BadResponse { method: String, detail: String },

    #[error("Connected to chain {actual}, config expects {expected}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("Transaction {0} reverted")]
    Reverted(B256),

    #[error("Timed out after {waited:?} waiting for receipt of {tx}")]
    ReceiptTimeout { tx: B256, waited: Duration },

    #[error(
        "Transaction {tx} was mined but not confirmed within {waited:?}{}",
        created_note(.contract)
    )]
    Unconfirmed {
        tx: B256,
        waited: Duration,
        contract: Option<Address>,
    },

    #[error("Receipt for {0} has no contract address")]
    MissingContractAddress(B256),

    #[error("Artifact error for {contract}: {reason}")]
    Artifact { contract: String, reason: String },

    #[error("ABI encoding error: {0}")]
    Encoding(String),

    #[error("Simulated chain: {0}")]
    Simulated(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn created_note(contract: &Option<Address>) -> String {
    match contract {
        Some(addr) => format!("; it created contract {addr}, check it before retrying"),
        None => String::new(),
    }
}
