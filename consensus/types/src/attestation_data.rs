use crate::{Checkpoint, Hash256, Slot};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// The data upon which an attestation is based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Encode, Decode, TreeHash)]
pub struct AttestationData {
    pub slot: Slot,
    pub index: u64,

    // LMD GHOST vote
    pub beacon_block_root: Hash256,

    // FFG Vote
    pub source: Checkpoint,
    pub target: Checkpoint,
}

impl AttestationData {
    /// Check if `self` and `other` vote for the same target epoch with different data.
    pub fn is_double_vote(&self, other: &Self) -> bool {
        self.target.epoch == other.target.epoch && self != other
    }

    /// Check if `self` surrounds `other`.
    pub fn is_surround_vote(&self, other: &Self) -> bool {
        self.source.epoch < other.source.epoch && other.target.epoch < self.target.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Epoch, FixedBytesExtended};
    use ssz::{Decode, Encode};
    use tree_hash::TreeHash;

    fn data(source: u64, target: u64, root: u64) -> AttestationData {
        AttestationData {
            slot: Slot::new(target * 32),
            index: 0,
            beacon_block_root: Hash256::zero(),
            source: Checkpoint {
                epoch: Epoch::new(source),
                root: Hash256::zero(),
            },
            target: Checkpoint {
                epoch: Epoch::new(target),
                root: Hash256::from_low_u64_be(root),
            },
        }
    }

    #[test]
    fn double_vote() {
        assert!(data(0, 3, 0).is_double_vote(&data(1, 3, 0)));
        assert!(data(0, 3, 0).is_double_vote(&data(0, 3, 1)));
        assert!(!data(0, 3, 0).is_double_vote(&data(0, 3, 0)));
        assert!(!data(0, 3, 0).is_double_vote(&data(0, 4, 0)));
    }

    #[test]
    fn surround_vote() {
        assert!(data(1, 5, 0).is_surround_vote(&data(2, 4, 0)));
        assert!(!data(2, 4, 0).is_surround_vote(&data(1, 5, 0)));
        assert!(!data(1, 5, 0).is_surround_vote(&data(1, 4, 0)));
        assert!(!data(1, 5, 0).is_surround_vote(&data(2, 5, 0)));
    }

    #[test]
    fn ssz_and_tree_hash() {
        let original = data(3, 9, 12);
        let decoded = AttestationData::from_ssz_bytes(&original.as_ssz_bytes()).unwrap();
        assert_eq!(original, decoded);
        assert_eq!(original.tree_hash_root(), decoded.tree_hash_root());
        assert_ne!(original.tree_hash_root(), data(3, 9, 13).tree_hash_root());
    }
}
