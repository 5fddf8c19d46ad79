use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use alloy_primitives::{hex, Address, B256};
use chainplan_core::{
    CallReceipt, ChainClient, ClientError, ContractType, Deployment, MethodSig, Token,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::abi;
use crate::artifacts::ArtifactStore;
use crate::{EvmError, Result};

// ─── RpcOptions ───────────────────────────────────────────────────────────

/// Knobs for transaction submission and confirmation.
#[derive(Debug, Clone)]
pub struct RpcOptions {
    /// When set, `connect` refuses a node reporting a different chain id.
    pub chain_id: Option<u64>,
    /// Blocks (including the one with the receipt) before a transaction counts as final.
    pub confirmations: u64,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
    /// Upper bound on a single JSON-RPC round trip, connect included.
    pub request_timeout: Duration,
    /// Fixed gas limit; the node estimates when `None`.
    pub gas: Option<u64>,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            chain_id: None,
            confirmations: 1,
            poll_interval: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
            gas: None,
        }
    }
}

// ─── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    transaction_hash: B256,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    contract_address: Option<Address>,
    #[serde(default)]
    block_number: Option<String>,
}

fn parse_quantity(method: &str, raw: &str) -> Result<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).map_err(|e| EvmError::BadResponse {
        method: method.to_string(),
        detail: format!("bad quantity '{raw}': {e}"),
    })
}

// ─── EvmClient ────────────────────────────────────────────────────────────

/// JSON-RPC client that submits transactions through `eth_sendTransaction`.
///
/// The node signs for `from`, so this is meant for development nodes and
/// nodes with an unlocked or externally managed deployer account.
pub struct EvmClient {
    http: reqwest::Client,
    url: String,
    from: Address,
    artifacts: ArtifactStore,
    opts: RpcOptions,
    next_id: AtomicU64,
}

impl EvmClient {
    /// Build a client and check the node's chain id against `opts.chain_id`.
    pub async fn connect(
        url: impl Into<String>,
        from: Address,
        artifacts: ArtifactStore,
        opts: RpcOptions,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(opts.request_timeout)
            .timeout(opts.request_timeout)
            .build()?;
        let client = Self {
            http,
            url: url.into(),
            from,
            artifacts,
            opts,
            next_id: AtomicU64::new(1),
        };
        let actual = client.chain_id().await?;
        if let Some(expected) = client.opts.chain_id {
            if expected != actual {
                return Err(EvmError::ChainIdMismatch { expected, actual });
            }
        }
        info!(url = %client.url, chain_id = actual, from = %client.from, "connected");
        Ok(client)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity("eth_chainId", &raw)
    }

    pub async fn block_number(&self) -> Result<u64> {
        let raw: String = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity("eth_blockNumber", &raw)
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        debug!(method, id, "rpc request");

        let resp: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = resp.error {
            return Err(EvmError::Rpc {
                method: method.to_string(),
                code: err.code,
                message: err.message,
            });
        }
        Ok(serde_json::from_value(resp.result.unwrap_or(Value::Null))?)
    }

    /// Submit a transaction and wait until it is final. `to: None` creates a contract.
    async fn transact(&self, to: Option<Address>, data: Vec<u8>) -> Result<Receipt> {
        let mut tx = json!({
            "from": self.from,
            "data": hex::encode_prefixed(&data),
        });
        if let Some(to) = to {
            tx["to"] = json!(to);
        }
        if let Some(gas) = self.opts.gas {
            tx["gas"] = json!(format!("{gas:#x}"));
        }

        let tx_hash: B256 = self.request("eth_sendTransaction", json!([tx])).await?;
        info!(tx = %tx_hash, "submitted, waiting for receipt");
        self.wait_for_receipt(tx_hash).await
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<Receipt> {
        let started = Instant::now();
        let mut mined: Option<Receipt> = None;
        loop {
            let receipt: Option<Receipt> = self
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if let Some(receipt) = receipt {
                if receipt.status.as_deref() == Some("0x0") {
                    return Err(EvmError::Reverted(tx_hash));
                }
                if self.is_final(&receipt).await? {
                    return Ok(receipt);
                }
                mined = Some(receipt);
            }

            if started.elapsed() >= self.opts.receipt_timeout {
                let waited = started.elapsed();
                // a mined but unconfirmed deploy already has its address
                return Err(match mined {
                    Some(receipt) => EvmError::Unconfirmed {
                        tx: tx_hash,
                        waited,
                        contract: receipt.contract_address,
                    },
                    None => EvmError::ReceiptTimeout {
                        tx: tx_hash,
                        waited,
                    },
                });
            }
            tokio::time::sleep(self.opts.poll_interval).await;
        }
    }

    async fn is_final(&self, receipt: &Receipt) -> Result<bool> {
        if self.opts.confirmations <= 1 {
            return Ok(true);
        }
        let Some(mined_at) = receipt.block_number.as_deref() else {
            return Ok(false);
        };
        let mined_at = parse_quantity("eth_getTransactionReceipt", mined_at)?;
        let head = self.block_number().await?;
        Ok(head.saturating_sub(mined_at) + 1 >= self.opts.confirmations)
    }

    pub async fn deploy_contract(
        &self,
        contract: &ContractType,
        args: &[Token],
    ) -> Result<Deployment> {
        let bytecode = self.artifacts.bytecode(contract)?;
        let receipt = self
            .transact(None, abi::encode_constructor(&bytecode, args))
            .await?;
        let address = receipt
            .contract_address
            .ok_or(EvmError::MissingContractAddress(receipt.transaction_hash))?;
        Ok(Deployment {
            address,
            tx_hash: Some(receipt.transaction_hash),
        })
    }

    pub async fn call_method(
        &self,
        target: Address,
        method: &MethodSig,
        args: &[Token],
    ) -> Result<CallReceipt> {
        let data = abi::encode_call(method, args)?;
        let receipt = self.transact(Some(target), data).await?;
        Ok(CallReceipt {
            tx_hash: Some(receipt.transaction_hash),
        })
    }
}

impl ChainClient for EvmClient {
    async fn deploy(
        &self,
        contract: &ContractType,
        args: &[Token],
    ) -> std::result::Result<Deployment, ClientError> {
        Ok(self.deploy_contract(contract, args).await?)
    }

    async fn call(
        &self,
        target: Address,
        method: &MethodSig,
        args: &[Token],
    ) -> std::result::Result<CallReceipt, ClientError> {
        Ok(self.call_method(target, method, args).await?)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
