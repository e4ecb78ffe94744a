//! Sequence snapshots and the windows they open.
//!
//! A [`SequenceSnapshot`] is read from the ledger once and consumed to open a
//! [`SequenceWindow`], so a single snapshot can never be used to predict two
//! batches.

use crate::ledger::{LedgerClient, LedgerError};
use crate::types::Address;

use super::predict;

/// The principal's sequence counter, read once.
#[derive(Debug, PartialEq, Eq)]
pub struct SequenceSnapshot {
    principal: Address,
    nonce: u64,
}

impl SequenceSnapshot {
    /// Read the live counter from the ledger.
    pub fn take(ledger: &dyn LedgerClient, principal: Address) -> Result<Self, LedgerError> {
        let nonce = ledger.sequence_number(&principal)?;
        tracing::debug!(principal = %principal, nonce, "took sequence snapshot");
        Ok(Self { principal, nonce })
    }

    /// Build a snapshot from a known counter value.
    pub fn at(principal: Address, nonce: u64) -> Self {
        Self { principal, nonce }
    }

    pub fn principal(&self) -> Address {
        self.principal
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Reserve `len` consecutive sequence numbers starting at the snapshot.
    pub fn open(self, len: usize) -> SequenceWindow {
        SequenceWindow {
            principal: self.principal,
            start: self.nonce,
            len,
        }
    }
}

/// A contiguous block of reserved sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceWindow {
    principal: Address,
    start: u64,
    len: usize,
}

impl SequenceWindow {
    pub fn principal(&self) -> Address {
        self.principal
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counter value once every submission in the window has been made.
    pub fn end(&self) -> u64 {
        self.start + self.len as u64
    }

    /// Sequence number for `offset`, if it lies inside the window.
    pub fn sequence(&self, offset: usize) -> Option<u64> {
        (offset < self.len).then(|| self.start + offset as u64)
    }

    /// Predicted identity for `offset`, if it lies inside the window.
    pub fn predict(&self, offset: usize) -> Option<Address> {
        self.sequence(offset)
            .map(|nonce| predict(&self.principal, nonce))
    }

    /// All predictions of the window in submission order.
    pub fn predictions(&self) -> impl Iterator<Item = (u64, Address)> + '_ {
        (0..self.len).filter_map(|offset| {
            let nonce = self.sequence(offset)?;
            Some((nonce, predict(&self.principal, nonce)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Address {
        Address([0x11; 20])
    }

    #[test]
    fn test_window_offsets_follow_snapshot() {
        let window = SequenceSnapshot::at(principal(), 7).open(3);
        assert_eq!(window.sequence(0), Some(7));
        assert_eq!(window.sequence(2), Some(9));
        assert_eq!(window.sequence(3), None);
        assert_eq!(window.end(), 10);
        assert_eq!(window.predict(1), Some(predict(&principal(), 8)));
    }

    #[test]
    fn test_predictions_are_contiguous() {
        let window = SequenceSnapshot::at(principal(), 0).open(4);
        let nonces: Vec<u64> = window.predictions().map(|(n, _)| n).collect();
        assert_eq!(nonces, vec![0, 1, 2, 3]);
    }
}
