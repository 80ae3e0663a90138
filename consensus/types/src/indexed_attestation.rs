use crate::{AttestationData, EthSpec, SignatureBytes, VariableList};
use core::slice::Iter;
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Details an attestation that can be slashable.
///
/// To be included in an `AttesterSlashing`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode, TreeHash)]
pub struct IndexedAttestation<E: EthSpec> {
    /// Lists validator registry indices, not committee indices.
    pub attesting_indices: VariableList<u64, E::MaxValidatorsPerCommittee>,
    pub data: AttestationData,
    pub signature: SignatureBytes,
}

impl<E: EthSpec> IndexedAttestation<E> {
    /// Check if ``attestation_data_1`` and ``attestation_data_2`` have the same target.
    pub fn is_double_vote(&self, other: &Self) -> bool {
        self.data.is_double_vote(&other.data)
    }

    /// Check if ``attestation_data_1`` surrounds ``attestation_data_2``.
    pub fn is_surround_vote(&self, other: &Self) -> bool {
        self.data.is_surround_vote(&other.data)
    }

    pub fn attesting_indices_len(&self) -> usize {
        self.attesting_indices.len()
    }

    pub fn attesting_indices_to_vec(&self) -> Vec<u64> {
        self.attesting_indices.to_vec()
    }

    pub fn attesting_indices_is_empty(&self) -> bool {
        self.attesting_indices.is_empty()
    }

    pub fn attesting_indices_iter(&self) -> Iter<'_, u64> {
        self.attesting_indices.iter()
    }

    /// Whether the indices are strictly increasing, as required for a valid indexed attestation.
    pub fn attesting_indices_are_sorted(&self) -> bool {
        self.attesting_indices
            .windows(2)
            .all(|pair| pair[0] < pair[1])
    }
}
