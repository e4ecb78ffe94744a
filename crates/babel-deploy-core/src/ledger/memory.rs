//! In-memory simulated ledger.
//!
//! Assigns contract addresses with the same rule as [`crate::identity::predict`],
//! advances the sender nonce on every accepted submission and keeps a journal
//! of what was submitted. Failures can be injected by submission index.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::abi::{self, Token};
use crate::identity::{keccak256, predict};
use crate::types::{Address, Selector, TxHash};

use super::{LedgerClient, LedgerError, Receipt};

/// Factory behaviour: a call to `spawn` creates a child contract owned by the
/// target, and `registry(uint256)` reads children back by index.
#[derive(Debug, Clone)]
pub struct Spawner {
    spawn: Selector,
    registry: Selector,
}

impl Spawner {
    pub fn new(spawn_signature: &str, registry_signature: &str) -> Self {
        Self {
            spawn: abi::selector(spawn_signature),
            registry: abi::selector(registry_signature),
        }
    }
}

/// A submission accepted by the simulated ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Create {
        from: Address,
        nonce: u64,
        address: Address,
        init_code: Vec<u8>,
    },
    Call {
        from: Address,
        nonce: u64,
        to: Address,
        calldata: Vec<u8>,
    },
}

#[derive(Debug, Default)]
struct State {
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Vec<u8>>,
    children: HashMap<Address, Vec<Address>>,
    journal: Vec<JournalEntry>,
    creates_seen: usize,
    calls_seen: usize,
    block: u64,
}

#[derive(Debug)]
pub struct MemoryLedger {
    chain_id: u64,
    spawner: Option<Spawner>,
    fail_create: Option<usize>,
    fail_call: Option<usize>,
    state: Mutex<State>,
}

impl MemoryLedger {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            spawner: None,
            fail_create: None,
            fail_call: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Start `principal` at the given nonce.
    pub fn with_nonce(self, principal: Address, nonce: u64) -> Self {
        self.lock().nonces.insert(principal, nonce);
        self
    }

    pub fn with_spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Reject the `index`-th creation (0-based, counting every attempt).
    pub fn fail_nth_create(mut self, index: usize) -> Self {
        self.fail_create = Some(index);
        self
    }

    /// Reject the `index`-th call (0-based, counting every attempt).
    pub fn fail_nth_call(mut self, index: usize) -> Self {
        self.fail_call = Some(index);
        self
    }

    pub fn nonce_of(&self, account: &Address) -> u64 {
        self.lock().nonces.get(account).copied().unwrap_or(0)
    }

    pub fn code_at(&self, address: &Address) -> Option<Vec<u8>> {
        self.lock().code.get(address).cloned()
    }

    pub fn journal(&self) -> Vec<JournalEntry> {
        self.lock().journal.clone()
    }

    /// Addresses of every contract created directly by a principal.
    pub fn created(&self) -> Vec<Address> {
        self.lock()
            .journal
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Create { address, .. } => Some(*address),
                JournalEntry::Call { .. } => None,
            })
            .collect()
    }

    /// Calldata of every accepted call, in submission order.
    pub fn calls(&self) -> Vec<(Address, Vec<u8>)> {
        self.lock()
            .journal
            .iter()
            .filter_map(|entry| match entry {
                JournalEntry::Call { to, calldata, .. } => Some((*to, calldata.clone())),
                JournalEntry::Create { .. } => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a poisoned journal is still a valid journal
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tx_hash(from: &Address, nonce: u64, payload: &[u8]) -> TxHash {
        let mut preimage = from.as_bytes().to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(&keccak256(payload));
        TxHash(keccak256(&preimage))
    }

    fn spawn_child(state: &mut State, factory: Address) -> Address {
        // contract nonces start at 1
        let nonce = state.nonces.entry(factory).or_insert(1);
        let child = predict(&factory, *nonce);
        *nonce += 1;
        state.code.insert(child, b"spawned".to_vec());
        state.nonces.insert(child, 1);
        state.children.entry(factory).or_default().push(child);
        child
    }
}

impl LedgerClient for MemoryLedger {
    fn chain_id(&self) -> Result<u64, LedgerError> {
        Ok(self.chain_id)
    }

    fn sequence_number(&self, principal: &Address) -> Result<u64, LedgerError> {
        Ok(self.nonce_of(principal))
    }

    fn submit_create(
        &self,
        principal: &Address,
        init_code: &[u8],
    ) -> Result<Receipt, LedgerError> {
        let mut state = self.lock();
        let attempt = state.creates_seen;
        state.creates_seen += 1;
        if self.fail_create == Some(attempt) {
            return Err(LedgerError::Rejected(format!(
                "simulated rejection of creation #{attempt}"
            )));
        }
        if init_code.is_empty() {
            return Err(LedgerError::Rejected("empty init code".to_string()));
        }

        let nonce = state.nonces.get(principal).copied().unwrap_or(0);
        let address = predict(principal, nonce);
        state.nonces.insert(*principal, nonce + 1);
        state.nonces.insert(address, 1);
        state.code.insert(address, init_code.to_vec());
        state.block += 1;
        state.journal.push(JournalEntry::Create {
            from: *principal,
            nonce,
            address,
            init_code: init_code.to_vec(),
        });

        Ok(Receipt {
            tx_hash: Self::tx_hash(principal, nonce, init_code),
            block_number: state.block,
            contract_address: Some(address),
        })
    }

    fn submit_call(
        &self,
        principal: &Address,
        target: &Address,
        calldata: &[u8],
    ) -> Result<Receipt, LedgerError> {
        let mut state = self.lock();
        let attempt = state.calls_seen;
        state.calls_seen += 1;
        if self.fail_call == Some(attempt) {
            return Err(LedgerError::Rejected(format!(
                "simulated rejection of call #{attempt}"
            )));
        }
        if !state.code.contains_key(target) {
            return Err(LedgerError::Rejected(format!("no contract at {target}")));
        }

        let nonce = state.nonces.get(principal).copied().unwrap_or(0);
        state.nonces.insert(*principal, nonce + 1);

        if let Some(spawner) = &self.spawner
            && calldata.get(..4) == Some(&spawner.spawn.0[..])
        {
            let child = Self::spawn_child(&mut state, *target);
            tracing::debug!(factory = %target, child = %child, "simulated spawn");
        }

        state.block += 1;
        state.journal.push(JournalEntry::Call {
            from: *principal,
            nonce,
            to: *target,
            calldata: calldata.to_vec(),
        });

        Ok(Receipt {
            tx_hash: Self::tx_hash(principal, nonce, calldata),
            block_number: state.block,
            contract_address: None,
        })
    }

    fn read_call(&self, target: &Address, calldata: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let is_registry_read = self
            .spawner
            .as_ref()
            .is_some_and(|s| calldata.get(..4) == Some(&s.registry.0[..]));
        if !is_registry_read {
            return Err(LedgerError::Rejected("unsupported read".to_string()));
        }

        let state = self.lock();
        let index = abi::word(&calldata[4..], 0)
            .ok()
            .and_then(abi::decode_uint)
            .ok_or_else(|| LedgerError::InvalidResponse("bad registry index".to_string()))?;
        let child = state
            .children
            .get(target)
            .and_then(|children| children.get(index as usize))
            .ok_or_else(|| {
                LedgerError::Rejected(format!("{target} has no child at index {index}"))
            })?;
        Ok(abi::encode(&[Token::Address(*child)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Address {
        Address([0x42; 20])
    }

    #[test]
    fn test_creation_uses_predicted_address() {
        let ledger = MemoryLedger::new(31337).with_nonce(principal(), 5);
        let receipt = ledger.submit_create(&principal(), b"code").unwrap();
        assert_eq!(receipt.contract_address, Some(predict(&principal(), 5)));
        assert_eq!(ledger.nonce_of(&principal()), 6);
    }

    #[test]
    fn test_calls_advance_the_nonce() {
        let ledger = MemoryLedger::new(31337);
        let target = ledger
            .submit_create(&principal(), b"code")
            .unwrap()
            .contract_address
            .unwrap();
        ledger.submit_call(&principal(), &target, &[1, 2, 3, 4]).unwrap();
        assert_eq!(ledger.nonce_of(&principal()), 2);
    }

    #[test]
    fn test_rejected_creation_keeps_nonce() {
        let ledger = MemoryLedger::new(31337).fail_nth_create(0);
        assert!(matches!(
            ledger.submit_create(&principal(), b"code"),
            Err(LedgerError::Rejected(_))
        ));
        assert_eq!(ledger.nonce_of(&principal()), 0);
        assert!(ledger.journal().is_empty());
    }

    #[test]
    fn test_call_to_empty_account_is_rejected() {
        let ledger = MemoryLedger::new(31337);
        let err = ledger
            .submit_call(&principal(), &Address([9; 20]), &[0; 4])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
    }

    #[test]
    fn test_spawner_registers_children() {
        let ledger = MemoryLedger::new(31337).with_spawner(Spawner::new("spawn()", "kids(uint256)"));
        let factory = ledger
            .submit_create(&principal(), b"factory")
            .unwrap()
            .contract_address
            .unwrap();
        ledger
            .submit_call(&principal(), &factory, &abi::encode_call("spawn()", &[]))
            .unwrap();

        let out = ledger
            .read_call(&factory, &abi::encode_call("kids(uint256)", &[Token::Uint(0)]))
            .unwrap();
        assert_eq!(abi::decode_address(&out).unwrap(), predict(&factory, 1));

        let missing = ledger.read_call(&factory, &abi::encode_call("kids(uint256)", &[Token::Uint(1)]));
        assert!(missing.is_err());
    }
}
