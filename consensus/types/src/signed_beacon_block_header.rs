use crate::{BeaconBlockHeader, SignatureBytes};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// A signed header of a `BeaconBlock`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode, TreeHash)]
pub struct SignedBeaconBlockHeader {
    pub message: BeaconBlockHeader,
    pub signature: SignatureBytes,
}
