//! JSON-RPC ledger client.
//!
//! Submissions go through `eth_sendTransaction`, so the node must manage the
//! principal's key (a local dev node or an unlocked account). Each blocking
//! trait method drives the async client on a private tokio runtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::types::{Address, TxHash, decode_hex, encode_hex};

use super::{LedgerClient, LedgerError, Receipt};

#[derive(Debug, Clone)]
pub struct RpcOptions {
    /// How long to wait for a receipt before giving up.
    pub confirm_timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// Explicit gas limit; the node estimates when unset.
    pub gas_limit: Option<u64>,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            confirm_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
            gas_limit: None,
        }
    }
}

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

#[derive(Debug)]
pub struct RpcLedger {
    url: Url,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    options: RpcOptions,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn connect(url: Url, options: RpcOptions) -> Result<Self, LedgerError> {
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| LedgerError::Transport(format!("Failed to create tokio runtime: {e}")))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("babel-deploy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LedgerError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            url,
            client,
            runtime,
            options,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: {e}")))?;
        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{method}: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(LedgerError::Rejected(format!(
                "{method} failed ({}): {}",
                err.code, err.message
            )));
        }
        Ok(parsed.result.unwrap_or(Value::Null))
    }

    async fn send_and_confirm(&self, tx: Value) -> Result<Receipt, LedgerError> {
        let hash_value = self.request("eth_sendTransaction", json!([tx])).await?;
        let tx_hash = parse_tx_hash(&hash_value)?;
        tracing::debug!(tx = %tx_hash, "submitted, waiting for receipt");

        let started = Instant::now();
        loop {
            let raw = self
                .request("eth_getTransactionReceipt", json!([tx_hash.to_string()]))
                .await?;
            if !raw.is_null() {
                return parse_receipt(&raw);
            }
            if started.elapsed() >= self.options.confirm_timeout {
                return Err(LedgerError::Timeout {
                    tx_hash,
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn transaction(&self, from: &Address, to: Option<&Address>, data: &[u8]) -> Value {
        let mut tx = json!({
            "from": from.to_string(),
            "data": encode_hex(data),
        });
        if let Some(to) = to {
            tx["to"] = json!(to.to_string());
        }
        if let Some(gas) = self.options.gas_limit {
            tx["gas"] = json!(format!("{gas:#x}"));
        }
        tx
    }
}

impl LedgerClient for RpcLedger {
    fn chain_id(&self) -> Result<u64, LedgerError> {
        let value = self
            .runtime
            .block_on(self.request("eth_chainId", json!([])))?;
        parse_quantity(&value)
    }

    fn sequence_number(&self, principal: &Address) -> Result<u64, LedgerError> {
        let value = self.runtime.block_on(self.request(
            "eth_getTransactionCount",
            json!([principal.to_string(), "pending"]),
        ))?;
        parse_quantity(&value)
    }

    fn submit_create(
        &self,
        principal: &Address,
        init_code: &[u8],
    ) -> Result<Receipt, LedgerError> {
        let tx = self.transaction(principal, None, init_code);
        let receipt = self.runtime.block_on(self.send_and_confirm(tx))?;
        if receipt.contract_address.is_none() {
            return Err(LedgerError::MissingContractAddress {
                tx_hash: receipt.tx_hash,
            });
        }
        Ok(receipt)
    }

    fn submit_call(
        &self,
        principal: &Address,
        target: &Address,
        calldata: &[u8],
    ) -> Result<Receipt, LedgerError> {
        let tx = self.transaction(principal, Some(target), calldata);
        self.runtime.block_on(self.send_and_confirm(tx))
    }

    fn read_call(&self, target: &Address, calldata: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let call = json!({
            "to": target.to_string(),
            "data": encode_hex(calldata),
        });
        let value = self
            .runtime
            .block_on(self.request("eth_call", json!([call, "latest"])))?;
        let text = value
            .as_str()
            .ok_or_else(|| LedgerError::InvalidResponse(format!("eth_call returned {value}")))?;
        decode_hex(text).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }
}

fn parse_quantity(value: &Value) -> Result<u64, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| LedgerError::InvalidResponse(format!("expected quantity, got {value}")))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::InvalidResponse(format!("quantity without 0x: {text}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::InvalidResponse(format!("bad quantity {text}: {e}")))
}

fn parse_tx_hash(value: &Value) -> Result<TxHash, LedgerError> {
    value
        .as_str()
        .ok_or_else(|| LedgerError::InvalidResponse(format!("expected tx hash, got {value}")))?
        .parse()
        .map_err(|e| LedgerError::InvalidResponse(format!("bad tx hash: {e}")))
}

fn parse_receipt(value: &Value) -> Result<Receipt, LedgerError> {
    let tx_hash = parse_tx_hash(&value["transactionHash"])?;
    let block_number = parse_quantity(&value["blockNumber"])?;

    // pre-byzantium receipts carry no status field
    if let Some(status) = value.get("status").filter(|s| !s.is_null())
        && parse_quantity(status)? != 1
    {
        return Err(LedgerError::Reverted { tx_hash });
    }

    let contract_address = match value.get("contractAddress") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(
            raw.as_str()
                .ok_or_else(|| LedgerError::InvalidResponse(format!("bad contractAddress {raw}")))?
                .parse::<Address>()
                .map_err(|e| LedgerError::InvalidResponse(format!("bad contractAddress: {e}")))?,
        ),
    };

    Ok(Receipt {
        tx_hash,
        block_number,
        contract_address,
    })
}
