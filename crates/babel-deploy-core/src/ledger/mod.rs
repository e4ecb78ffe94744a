//! Ledger client layer.
//!
//! The orchestrator talks to the ledger only through [`LedgerClient`]:
//! - [`MemoryLedger`]: simulated chain for tests and dry runs
//! - [`RpcLedger`]: JSON-RPC node with node-managed accounts

pub mod memory;
pub mod rpc;

use serde::{Deserialize, Serialize};

use crate::types::{Address, TxHash};

pub use memory::{JournalEntry, MemoryLedger, Spawner};
pub use rpc::{RpcLedger, RpcOptions};

/// Confirmation of a mined submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// Set for contract creations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
    #[error("transaction {tx_hash} not confirmed after {waited_secs}s")]
    Timeout { tx_hash: TxHash, waited_secs: u64 },
    #[error("creation receipt {tx_hash} carries no contract address")]
    MissingContractAddress { tx_hash: TxHash },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response from ledger: {0}")]
    InvalidResponse(String),
}

/// Blocking access to the ledger.
///
/// Every submission returns only after the ledger confirmed or rejected it.
pub trait LedgerClient {
    fn chain_id(&self) -> Result<u64, LedgerError>;

    /// Current sequence number (nonce) of `principal`.
    fn sequence_number(&self, principal: &Address) -> Result<u64, LedgerError>;

    /// Submit a contract creation and wait for its receipt.
    fn submit_create(&self, principal: &Address, init_code: &[u8])
    -> Result<Receipt, LedgerError>;

    /// Submit a state-changing call and wait for its receipt.
    fn submit_call(
        &self,
        principal: &Address,
        target: &Address,
        calldata: &[u8],
    ) -> Result<Receipt, LedgerError>;

    /// Execute a read-only call against the latest state.
    fn read_call(&self, target: &Address, calldata: &[u8]) -> Result<Vec<u8>, LedgerError>;
}
