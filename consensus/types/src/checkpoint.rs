use crate::{Epoch, Hash256};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Casper FFG checkpoint, used in attestations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Encode, Decode, TreeHash)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}
