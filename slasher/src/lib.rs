#![deny(missing_debug_implementations)]

mod attestation_history;
mod attester_record;
pub mod config;
mod database;
mod double_proposal;
mod error;
mod locks;
pub mod metrics;
mod proposal_history;
mod slasher;
mod slasher_server;
mod span;
mod status;
mod surround;
pub mod test_utils;

pub use crate::slasher::Slasher;
pub use attestation_history::{AttestationHistory, TargetSource};
pub use attester_record::{AttesterRecord, CompressedIdxAttList, CompressedIndexedAttestation};
pub use config::{Config, DatabaseBackend, MaxHistoryLength};
pub use database::{
    interface::{DbTable, Environment, KeyValueStoreOp},
    SlasherDB, Transaction, CURRENT_SCHEMA_VERSION,
};
pub use double_proposal::{DoubleProposalDetector, ProposalCheck};
pub use error::{Error, ErrorKind, InvalidInput};
pub use locks::{KeyGuard, KeyedLocks};
pub use proposal_history::ProposalHistory;
pub use slasher_server::{
    AttesterSlashingResponse, ProposerSlashingRequest, ProposerSlashingResponse, SlasherServer,
    SlashingStatusRequest,
};
pub use span::{EpochSpanEntry, EpochSpanMap, MinMaxEpochSpan};
pub use status::{SlashingId, SlashingStatus, SlashingStatusTracker};
pub use surround::{SurroundCheck, SurroundDetector};

use types::{
    AttesterSlashing, EthSpec, IndexedAttestation, ProposerSlashing, SignedBeaconBlockHeader,
};

/// Outcome of checking one validator's attestation, with the conflicting attestation loaded.
#[derive(Debug, PartialEq)]
pub enum AttesterSlashingStatus<E: EthSpec> {
    NotSlashable,
    /// A previous vote for the same target epoch, with different data.
    DoubleVote(Box<IndexedAttestation<E>>),
    /// The new attestation surrounds this existing one.
    SurroundsExisting(Box<IndexedAttestation<E>>),
    /// The new attestation is surrounded by this existing one.
    SurroundedByExisting(Box<IndexedAttestation<E>>),
}

#[derive(Debug, PartialEq)]
pub enum ProposerSlashingStatus {
    NotSlashable,
    DoubleProposal(Box<SignedBeaconBlockHeader>),
}

impl<E: EthSpec> AttesterSlashingStatus<E> {
    /// Pair the existing attestation with `new_attestation` so that `attestation_1` surrounds or
    /// double-votes `attestation_2`.
    pub fn into_slashing(
        self,
        new_attestation: &IndexedAttestation<E>,
    ) -> Option<AttesterSlashing<E>> {
        use AttesterSlashingStatus::*;

        match self {
            NotSlashable => None,
            DoubleVote(existing) | SurroundedByExisting(existing) => Some(AttesterSlashing {
                attestation_1: *existing,
                attestation_2: new_attestation.clone(),
            }),
            SurroundsExisting(existing) => Some(AttesterSlashing {
                attestation_1: new_attestation.clone(),
                attestation_2: *existing,
            }),
        }
    }
}

impl ProposerSlashingStatus {
    pub fn into_slashing(self, new_header: &SignedBeaconBlockHeader) -> Option<ProposerSlashing> {
        match self {
            ProposerSlashingStatus::NotSlashable => None,
            ProposerSlashingStatus::DoubleProposal(existing) => Some(ProposerSlashing {
                signed_header_1: *existing,
                signed_header_2: new_header.clone(),
            }),
        }
    }
}
