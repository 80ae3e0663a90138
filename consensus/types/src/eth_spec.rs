use ssz_types::typenum::{Unsigned, U2048, U32, U8};
use std::fmt::Debug;
use std::hash::Hash;

/// Compile-time constants of a network preset.
///
/// Only the parameters consumed by slashing detection are carried here.
pub trait EthSpec: 'static + Default + Sync + Send + Clone + Debug + PartialEq + Eq + Hash {
    /*
     * Misc
     */
    type MaxValidatorsPerCommittee: Unsigned + Clone + Sync + Send + Debug + PartialEq + Eq + Hash;
    /*
     * Time parameters
     */
    type SlotsPerEpoch: Unsigned + Clone + Sync + Send + Debug + PartialEq;

    /// Returns the `SLOTS_PER_EPOCH` constant for this specification.
    fn slots_per_epoch() -> u64 {
        Self::SlotsPerEpoch::to_u64()
    }

    /// Returns the `MAX_VALIDATORS_PER_COMMITTEE` constant for this specification.
    fn max_validators_per_committee() -> usize {
        Self::MaxValidatorsPerCommittee::to_usize()
    }
}

/// Ethereum Foundation specifications.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct MainnetEthSpec;

impl EthSpec for MainnetEthSpec {
    type MaxValidatorsPerCommittee = U2048;
    type SlotsPerEpoch = U32;
}

/// Ethereum Foundation minimal spec, as defined in the eth2.0-specs repo.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct MinimalEthSpec;

impl EthSpec for MinimalEthSpec {
    type MaxValidatorsPerCommittee = U2048;
    type SlotsPerEpoch = U8;
}
