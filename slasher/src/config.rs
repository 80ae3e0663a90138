use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString};
use types::{typenum::U1048576, Epoch, Unsigned};

pub const DEFAULT_HISTORY_LENGTH: usize = 4096;
pub const DEFAULT_VALIDATOR_CHUNK_SIZE: usize = 256;
pub const DEFAULT_SPAN_CACHE_SIZE: usize = 1024;
pub const DEFAULT_MAX_FUTURE_EPOCHS: u64 = 1;

/// Upper bound on `history_length`, fixed by the width of the proposal bit list.
pub type MaxHistoryLength = U1048576;

pub fn max_history_length() -> usize {
    MaxHistoryLength::to_usize()
}

#[cfg(feature = "redb")]
pub const DEFAULT_BACKEND: DatabaseBackend = DatabaseBackend::Redb;
#[cfg(not(feature = "redb"))]
pub const DEFAULT_BACKEND: DatabaseBackend = DatabaseBackend::Memory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub database_path: PathBuf,
    pub backend: DatabaseBackend,
    /// Number of epochs of history to keep.
    ///
    /// This is the maximum distance between a source and target epoch that can be checked, and
    /// the width of the rolling window of proposal bits.
    pub history_length: usize,
    /// Number of consecutive validator indices sharing one update lock.
    pub validator_chunk_size: usize,
    /// Number of decoded epoch span maps to keep in memory.
    pub span_cache_size: usize,
    /// How far past the current epoch an attestation target or block may be.
    pub max_future_epochs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DatabaseBackend {
    /// Volatile storage, lost on restart.
    Memory,
    #[cfg(feature = "redb")]
    Redb,
}

impl Config {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            database_path,
            backend: DEFAULT_BACKEND,
            history_length: DEFAULT_HISTORY_LENGTH,
            validator_chunk_size: DEFAULT_VALIDATOR_CHUNK_SIZE,
            span_cache_size: DEFAULT_SPAN_CACHE_SIZE,
            max_future_epochs: DEFAULT_MAX_FUTURE_EPOCHS,
        }
    }

    /// Keep everything in memory for tests.
    pub fn for_testing(mut self) -> Self {
        self.backend = DatabaseBackend::Memory;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.history_length == 0 || self.validator_chunk_size == 0 || self.span_cache_size == 0
        {
            Err(Error::ConfigInvalidZeroParameter {
                config: self.clone(),
            })
        } else if self.history_length > max_history_length() {
            Err(Error::ConfigInvalidHistoryLength {
                history_length: self.history_length,
            })
        } else {
            Ok(())
        }
    }

    /// Whether a database written with `other` can be read using `self`.
    pub fn is_compatible(&self, other: &Config) -> bool {
        self.history_length == other.history_length
    }

    /// The oldest epoch that is still within the window when the chain is at `current_epoch`.
    pub fn min_epoch(&self, current_epoch: Epoch) -> Epoch {
        current_epoch
            .saturating_add(1u64)
            .saturating_sub(self.history_length as u64)
    }

    /// The newest epoch accepted as input when the chain is at `current_epoch`.
    pub fn max_epoch(&self, current_epoch: Epoch) -> Epoch {
        current_epoch.saturating_add(self.max_future_epochs)
    }

    pub fn validator_chunk_index(&self, validator_index: u64) -> u64 {
        validator_index / self.validator_chunk_size as u64
    }
}
