use crate::{EthSpec, IndexedAttestation};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Two conflicting attestations.
///
/// `attestation_1` either double-votes with or surrounds `attestation_2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode, TreeHash)]
pub struct AttesterSlashing<E: EthSpec> {
    pub attestation_1: IndexedAttestation<E>,
    pub attestation_2: IndexedAttestation<E>,
}

impl<E: EthSpec> AttesterSlashing<E> {
    /// Whether the pair is slashable per `is_slashable_attestation_data`.
    pub fn is_slashable_pair(&self) -> bool {
        self.attestation_1.is_double_vote(&self.attestation_2)
            || self.attestation_1.is_surround_vote(&self.attestation_2)
    }

    /// Indices present in both attestations.
    pub fn slashable_indices(&self) -> Vec<u64> {
        let other = &self.attestation_2.attesting_indices;
        self.attestation_1
            .attesting_indices_iter()
            .filter(|index| other.binary_search(index).is_ok())
            .copied()
            .collect()
    }
}
