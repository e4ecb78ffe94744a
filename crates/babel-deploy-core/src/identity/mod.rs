//! Deterministic identity prediction.
//!
//! Contract addresses created by an account are a pure function of the
//! creator and its nonce at submission time:
//! `keccak256(rlp([sender, nonce]))[12..]`.

pub mod sequence;

use sha3::{Digest, Keccak256};

use crate::types::Address;

pub use sequence::{SequenceSnapshot, SequenceWindow};

/// Keccak-256 digest (the pre-standard variant used by the ledger).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Predict the address of the contract `principal` creates at `nonce`.
///
/// # Example
/// ```
/// use babel_deploy_core::identity::predict;
/// use babel_deploy_core::types::Address;
///
/// let sender: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse()?;
/// assert_eq!(
///     predict(&sender, 0),
///     "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d".parse::<Address>()?
/// );
/// # Ok::<(), babel_deploy_core::types::HexError>(())
/// ```
pub fn predict(principal: &Address, nonce: u64) -> Address {
    let hash = keccak256(&rlp_sender_nonce(principal, nonce));
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}

fn rlp_sender_nonce(principal: &Address, nonce: u64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(30);
    // 20-byte string: 0x80 + len
    payload.push(0x80 + 20);
    payload.extend_from_slice(principal.as_bytes());
    payload.extend(rlp_uint(nonce));

    // payload never exceeds 55 bytes, so the short list form applies
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(0xc0 + payload.len() as u8);
    out.extend(payload);
    out
}

fn rlp_uint(value: u64) -> Vec<u8> {
    match value {
        0 => vec![0x80],
        1..=0x7f => vec![value as u8],
        _ => {
            let bytes = value.to_be_bytes();
            let skip = bytes.iter().take_while(|b| **b == 0).count();
            let mut out = Vec::with_capacity(9);
            out.push(0x80 + (8 - skip) as u8);
            out.extend_from_slice(&bytes[skip..]);
            out
        }
    }
}
