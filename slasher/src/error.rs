use crate::{Config, SlashingId, SlashingStatus};
use std::io;
use types::{Epoch, Hash256};

/// Coarse classification of an `Error`, for callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request, rejected before any mutation. Never retried.
    InvalidInput,
    /// The request refers to epochs outside the retained window, so slashability can't be
    /// determined.
    StaleInput,
    /// Persistence failure. Nothing was committed, so the whole request may be retried.
    Storage,
    /// Illegal status change or unknown slashing.
    InvalidTransition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    EmptyAttestingIndices,
    UnsortedAttestingIndices,
    SourceAfterTarget { source: Epoch, target: Epoch },
    ProposerIndexMismatch { header: u64, requested: u64 },
    /// Epoch beyond the current epoch plus the configured tolerance.
    FutureEpoch { epoch: Epoch, max_epoch: Epoch },
}

#[derive(Debug)]
pub enum Error {
    InvalidInput(InvalidInput),
    StaleInput {
        epoch: Epoch,
        min_epoch: Epoch,
    },
    InvalidTransition {
        id: SlashingId,
        from: SlashingStatus,
        to: SlashingStatus,
    },
    UnknownSlashing(SlashingId),
    DatabaseIOError(io::Error),
    #[cfg(feature = "redb")]
    DatabaseRedbError(redb::Error),
    SszDecodeError(ssz::DecodeError),
    SszTypesError(ssz_types::Error),
    BincodeError(bincode::Error),
    IncompatibleSchemaVersion {
        database_schema_version: u64,
        software_schema_version: u64,
    },
    ConfigInvalidZeroParameter {
        config: Config,
    },
    ConfigInvalidHistoryLength {
        history_length: usize,
    },
    ConfigIncompatible {
        on_disk_config: Config,
        config: Config,
    },
    DistanceTooLarge,
    /// Missing an attester record that we expected to exist.
    MissingAttesterRecord {
        validator_index: u64,
        target_epoch: Epoch,
    },
    MissingIndexedAttestation {
        validator_index: u64,
        target_epoch: Epoch,
        data_root: Hash256,
    },
    MissingAttestationData {
        target_epoch: Epoch,
        data_root: Hash256,
    },
    ProposalHistoryCorrupt {
        length: usize,
        expected: usize,
    },
    EpochSpanMapCorrupt,
    AttestationHistoryCorrupt,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_)
            | Error::ConfigInvalidZeroParameter { .. }
            | Error::ConfigInvalidHistoryLength { .. } => ErrorKind::InvalidInput,
            Error::StaleInput { .. } => ErrorKind::StaleInput,
            Error::InvalidTransition { .. } | Error::UnknownSlashing(_) => {
                ErrorKind::InvalidTransition
            }
            _ => ErrorKind::Storage,
        }
    }
}

impl From<InvalidInput> for Error {
    fn from(e: InvalidInput) -> Self {
        Error::InvalidInput(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::DatabaseIOError(e)
    }
}

impl From<ssz::DecodeError> for Error {
    fn from(e: ssz::DecodeError) -> Self {
        Error::SszDecodeError(e)
    }
}

impl From<ssz_types::Error> for Error {
    fn from(e: ssz_types::Error) -> Self {
        Error::SszTypesError(e)
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::BincodeError(e)
    }
}

#[cfg(feature = "redb")]
macro_rules! impl_from_redb_error {
    ($($error: ty),*) => {
        $(
            impl From<$error> for Error {
                fn from(e: $error) -> Self {
                    Error::DatabaseRedbError(e.into())
                }
            }
        )*
    };
}

#[cfg(feature = "redb")]
impl_from_redb_error!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);
