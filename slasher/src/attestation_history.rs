use crate::Error;
use ssz::Decode;
use ssz_derive::{Decode, Encode};
use types::Epoch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct TargetSource {
    pub target_epoch: Epoch,
    pub source_epoch: Epoch,
}

/// The source epoch voted for at each target epoch by a single validator.
///
/// Each target maps to at most one source. `latest_epoch_written` is the highest target ever
/// recorded and never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, Decode)]
pub struct AttestationHistory {
    target_to_source: Vec<TargetSource>,
    latest_epoch_written: Epoch,
}

impl AttestationHistory {
    fn position(&self, target_epoch: Epoch) -> Result<usize, usize> {
        self.target_to_source
            .binary_search_by_key(&target_epoch, |entry| entry.target_epoch)
    }

    pub fn source_for(&self, target_epoch: Epoch) -> Option<Epoch> {
        self.position(target_epoch)
            .ok()
            .map(|i| self.target_to_source[i].source_epoch)
    }

    /// Record `source_epoch` for `target_epoch`, replacing any previous source.
    pub fn insert(&mut self, target_epoch: Epoch, source_epoch: Epoch) {
        let entry = TargetSource {
            target_epoch,
            source_epoch,
        };
        match self.position(target_epoch) {
            Ok(i) => self.target_to_source[i] = entry,
            Err(i) => self.target_to_source.insert(i, entry),
        }
        self.latest_epoch_written = std::cmp::max(self.latest_epoch_written, target_epoch);
    }

    pub fn latest_epoch_written(&self) -> Epoch {
        self.latest_epoch_written
    }

    /// Drop every entry with a target before `min_epoch`.
    pub fn prune(&mut self, min_epoch: Epoch) {
        let keep_from = self.position(min_epoch).unwrap_or_else(|i| i);
        self.target_to_source.drain(..keep_from);
    }

    pub fn len(&self) -> usize {
        self.target_to_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target_to_source.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetSource> {
        self.target_to_source.iter()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let history = Self::from_ssz_bytes(bytes)?;
        let sorted = history
            .target_to_source
            .windows(2)
            .all(|pair| pair[0].target_epoch < pair[1].target_epoch);
        let bounded = history
            .target_to_source
            .last()
            .map_or(true, |entry| entry.target_epoch <= history.latest_epoch_written);

        if sorted && bounded {
            Ok(history)
        } else {
            Err(Error::AttestationHistoryCorrupt)
        }
    }
}
