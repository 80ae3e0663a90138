use crate::{config::MaxHistoryLength, Error};
use ssz::Decode;
use ssz_derive::{Decode, Encode};
use types::{BitList, Epoch};

/// Rolling record of the epochs in which a validator proposed.
///
/// Bit `epoch % history_length` is set iff a proposal was recorded for `epoch`, for every epoch
/// in `(latest_epoch_written - history_length, latest_epoch_written]`.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ProposalHistory {
    epoch_bits: BitList<MaxHistoryLength>,
    latest_epoch_written: Epoch,
}

impl ProposalHistory {
    pub fn new(history_length: usize) -> Result<Self, Error> {
        Ok(Self {
            epoch_bits: BitList::with_capacity(history_length)?,
            latest_epoch_written: Epoch::new(0),
        })
    }

    pub fn latest_epoch_written(&self) -> Epoch {
        self.latest_epoch_written
    }

    /// Oldest epoch still represented by the bits.
    pub fn min_epoch(&self, history_length: usize) -> Epoch {
        self.latest_epoch_written
            .saturating_add(1u64)
            .saturating_sub(history_length as u64)
    }

    fn offset(epoch: Epoch, history_length: usize) -> usize {
        (epoch.as_u64() % history_length as u64) as usize
    }

    pub fn is_set(&self, epoch: Epoch, history_length: usize) -> Result<bool, Error> {
        Ok(self.epoch_bits.get(Self::offset(epoch, history_length))?)
    }

    pub fn set(&mut self, epoch: Epoch, history_length: usize) -> Result<(), Error> {
        Ok(self
            .epoch_bits
            .set(Self::offset(epoch, history_length), true)?)
    }

    /// Move the window forward so that it ends at `epoch`, clearing the bits of every epoch that
    /// falls out of it. Does nothing if `epoch` isn't newer than `latest_epoch_written`.
    pub fn advance_to(&mut self, epoch: Epoch, history_length: usize) -> Result<(), Error> {
        if epoch <= self.latest_epoch_written {
            return Ok(());
        }
        let gap = epoch.as_u64() - self.latest_epoch_written.as_u64();
        if gap >= history_length as u64 {
            self.epoch_bits = BitList::with_capacity(history_length)?;
        } else {
            for cleared in self.latest_epoch_written.as_u64() + 1..=epoch.as_u64() {
                self.epoch_bits
                    .set(Self::offset(Epoch::new(cleared), history_length), false)?;
            }
        }
        self.latest_epoch_written = epoch;
        Ok(())
    }

    pub fn num_proposals(&self) -> usize {
        self.epoch_bits.num_set_bits()
    }

    pub fn from_bytes(bytes: &[u8], history_length: usize) -> Result<Self, Error> {
        let history = Self::from_ssz_bytes(bytes)?;
        if history.epoch_bits.len() == history_length {
            Ok(history)
        } else {
            Err(Error::ProposalHistoryCorrupt {
                length: history.epoch_bits.len(),
                expected: history_length,
            })
        }
    }
}
