//! Ethereum 2.0 consensus types consumed by the slasher.
#![deny(missing_debug_implementations)]

mod slot_epoch_macros;

pub mod attestation_data;
pub mod attester_slashing;
pub mod beacon_block_header;
pub mod checkpoint;
pub mod eth_spec;
pub mod fixed_bytes;
pub mod indexed_attestation;
pub mod proposer_slashing;
pub mod signature;
pub mod signed_beacon_block_header;
pub mod slot_epoch;

pub use crate::attestation_data::AttestationData;
pub use crate::attester_slashing::AttesterSlashing;
pub use crate::beacon_block_header::BeaconBlockHeader;
pub use crate::checkpoint::Checkpoint;
pub use crate::eth_spec::{EthSpec, MainnetEthSpec, MinimalEthSpec};
pub use crate::fixed_bytes::{FixedBytesExtended, Hash256};
pub use crate::indexed_attestation::IndexedAttestation;
pub use crate::proposer_slashing::ProposerSlashing;
pub use crate::signature::{empty_signature, SignatureBytes, SIGNATURE_BYTES_LEN};
pub use crate::signed_beacon_block_header::SignedBeaconBlockHeader;
pub use crate::slot_epoch::{Epoch, Slot};

pub use ssz_types::{typenum, typenum::Unsigned, BitList, BitVector, FixedVector, VariableList};
