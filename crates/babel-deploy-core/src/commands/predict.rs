//! Address prediction for a principal, without touching any ledger.

use crate::identity::SequenceSnapshot;
use crate::types::Address;

/// Addresses the next `count` creations from `principal` would get,
/// starting at `nonce`.
pub fn predict_range(principal: Address, nonce: u64, count: usize) -> Vec<(u64, Address)> {
    SequenceSnapshot::at(principal, nonce)
        .open(count)
        .predictions()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_matches_known_addresses() {
        let sender: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap();
        let range = predict_range(sender, 1, 2);
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].0, 1);
        assert_eq!(
            range[0].1,
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8".parse().unwrap()
        );
        assert_eq!(
            range[1].1,
            "0xf778b86fa74e846c4f0a1fbd1335fe81c00a0c91".parse().unwrap()
        );
    }

    #[test]
    fn test_empty_range() {
        assert!(predict_range(Address::ZERO, 0, 0).is_empty());
    }
}
