use ssz_derive::{Decode, Encode};
use tree_hash::TreeHash as _;
use tree_hash_derive::TreeHash;
use types::{AttestationData, EthSpec, Hash256, IndexedAttestation, SignatureBytes, VariableList};

/// Per-validator, per-target pointer to the attestation that validator signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct AttesterRecord {
    /// The hash of the attestation data, for checking double-voting.
    pub data_root: Hash256,
}

/// An `IndexedAttestation` with its `AttestationData` replaced by the data's root.
///
/// The fields line up with `IndexedAttestation` so that both have the same tree hash root.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, TreeHash)]
pub struct CompressedIndexedAttestation<E: EthSpec> {
    pub indices: VariableList<u64, E::MaxValidatorsPerCommittee>,
    pub data_root: Hash256,
    pub signature: SignatureBytes,
}

impl<E: EthSpec> CompressedIndexedAttestation<E> {
    pub fn compress(indexed: &IndexedAttestation<E>) -> Self {
        Self {
            indices: indexed.attesting_indices.clone(),
            data_root: indexed.data.tree_hash_root(),
            signature: indexed.signature.clone(),
        }
    }

    /// Rebuild the full attestation. `data` must be the data whose root is `self.data_root`.
    pub fn decompress(self, data: AttestationData) -> IndexedAttestation<E> {
        IndexedAttestation {
            attesting_indices: self.indices,
            data,
            signature: self.signature,
        }
    }

    pub fn contains(&self, validator_index: u64) -> bool {
        self.indices.binary_search(&validator_index).is_ok()
    }
}

/// Every distinct attestation recorded for one target epoch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, Decode)]
pub struct CompressedIdxAttList<E: EthSpec> {
    pub list: Vec<CompressedIndexedAttestation<E>>,
}

impl<E: EthSpec> CompressedIdxAttList<E> {
    /// Add `attestation` unless an identical one is present. Returns whether it was added.
    pub fn insert(&mut self, attestation: CompressedIndexedAttestation<E>) -> bool {
        if self.list.contains(&attestation) {
            false
        } else {
            self.list.push(attestation);
            true
        }
    }

    /// The first recorded attestation by `validator_index` with data root `data_root`.
    pub fn find(
        &self,
        validator_index: u64,
        data_root: Hash256,
    ) -> Option<&CompressedIndexedAttestation<E>> {
        self.list
            .iter()
            .find(|att| att.data_root == data_root && att.contains(validator_index))
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
