use crate::SignedBeaconBlockHeader;
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Two conflicting proposals from the same proposer (validator).
#[derive(Debug, PartialEq, Eq, Hash, Clone, Encode, Decode, TreeHash)]
pub struct ProposerSlashing {
    pub signed_header_1: SignedBeaconBlockHeader,
    pub signed_header_2: SignedBeaconBlockHeader,
}

impl ProposerSlashing {
    /// The index of the proposer who signed both headers.
    pub fn proposer_index(&self) -> u64 {
        self.signed_header_1.message.proposer_index
    }
}
