use crate::{Hash256, Slot};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// A header of a `BeaconBlock`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Encode, Decode, TreeHash)]
pub struct BeaconBlockHeader {
    pub slot: Slot,
    pub proposer_index: u64,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body_root: Hash256,
}
