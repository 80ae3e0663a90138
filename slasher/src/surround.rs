//! Min-max surround vote detection.
//!
//! For every epoch `e` in the history window a validator stores two distances:
//!
//! - `min_span[e]`: the distance from `e` to the smallest target of any vote whose source is
//!   after `e`.
//! - `max_span[e]`: the distance from `e` to the largest target of any vote whose source is
//!   before `e`.
//!
//! A new vote `(s, t)` surrounds an existing one iff `s + min_span[s] < t`, and is surrounded
//! by one iff `s + max_span[s] > t`. Both targets are monotonic in `e`, which lets updates stop
//! at the first epoch that already carries a tighter bound.
use crate::{AttestationHistory, EpochSpanMap, Error, InvalidInput};
use types::{Epoch, Hash256};

/// Result of checking a single validator's vote against their history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurroundCheck {
    /// Not slashable. The history and spans now include the vote.
    Updated,
    /// The same vote was already recorded. Nothing changed.
    Duplicate,
    /// A different vote for the same target was already recorded.
    DoubleVote { existing_target: Epoch },
    /// The new vote surrounds the recorded vote with this target.
    SurroundsExisting { existing_target: Epoch },
    /// The new vote is surrounded by the recorded vote with this target.
    SurroundedByExisting { existing_target: Epoch },
}

impl SurroundCheck {
    pub fn is_slashable(&self) -> bool {
        !matches!(self, SurroundCheck::Updated | SurroundCheck::Duplicate)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SurroundDetector {
    history_length: u64,
}

impl SurroundDetector {
    pub fn new(history_length: usize) -> Self {
        Self {
            history_length: history_length as u64,
        }
    }

    /// Oldest epoch still tracked for a validator whose latest target is `latest`.
    pub fn min_epoch(&self, latest: Epoch) -> Epoch {
        latest.saturating_add(1u64).saturating_sub(self.history_length)
    }

    /// Check the vote `source -> target` with attestation data root `data_root` and, if it is
    /// not slashable, record it.
    ///
    /// `existing_data_root` is only called when a vote with the same source and target is
    /// already recorded, and must return the data root stored for it.
    ///
    /// Neither `history` nor `spans` is modified unless `Updated` is returned.
    pub fn check_and_update(
        &self,
        history: &mut AttestationHistory,
        spans: &mut EpochSpanMap,
        source: Epoch,
        target: Epoch,
        data_root: Hash256,
        existing_data_root: impl FnOnce() -> Result<Hash256, Error>,
    ) -> Result<SurroundCheck, Error> {
        if source > target {
            return Err(InvalidInput::SourceAfterTarget { source, target }.into());
        }

        let min_epoch = self.min_epoch(history.latest_epoch_written());
        if source < min_epoch {
            return Err(Error::StaleInput {
                epoch: source,
                min_epoch,
            });
        }

        if let Some(existing_source) = history.source_for(target) {
            return if existing_source != source || existing_data_root()? != data_root {
                Ok(SurroundCheck::DoubleVote {
                    existing_target: target,
                })
            } else {
                Ok(SurroundCheck::Duplicate)
            };
        }

        let span = spans.get(source);
        if let Some(existing_target) = span.min_target(source).filter(|min| *min < target) {
            return Ok(SurroundCheck::SurroundsExisting { existing_target });
        }
        if let Some(existing_target) = span.max_target(source).filter(|max| *max > target) {
            return Ok(SurroundCheck::SurroundedByExisting { existing_target });
        }

        let latest = std::cmp::max(history.latest_epoch_written(), target);
        let min_epoch = self.min_epoch(latest);

        // Every distance is bounded by `target - min_epoch < history_length`, so none of these
        // can fail for a validated config. Compute them all before mutating anything.
        let min_updates = Self::min_span_updates(spans, source, target, min_epoch)?;
        let max_updates = Self::max_span_updates(spans, source, target)?;

        for (epoch, distance) in min_updates {
            spans.set_min_span(epoch, distance);
        }
        for (epoch, distance) in max_updates {
            spans.set_max_span(epoch, distance);
        }
        history.insert(target, source);
        history.prune(min_epoch);
        spans.prune(min_epoch);

        Ok(SurroundCheck::Updated)
    }

    /// Epochs before `source` whose minimum target is now `target`, walking backwards until an
    /// epoch already has a closer one.
    fn min_span_updates(
        spans: &EpochSpanMap,
        source: Epoch,
        target: Epoch,
        min_epoch: Epoch,
    ) -> Result<Vec<(Epoch, u32)>, Error> {
        let mut updates = vec![];
        for epoch in (min_epoch.as_u64()..source.as_u64()).rev().map(Epoch::new) {
            let existing = spans.get(epoch).min_epoch_span;
            let distance = epoch
                .distance_to(target)
                .ok_or(Error::DistanceTooLarge)?;
            if existing == 0 || existing > distance {
                updates.push((epoch, distance));
            } else {
                break;
            }
        }
        Ok(updates)
    }

    /// Epochs strictly between `source` and `target` whose maximum target is now `target`,
    /// walking forwards until an epoch already has a further one.
    fn max_span_updates(
        spans: &EpochSpanMap,
        source: Epoch,
        target: Epoch,
    ) -> Result<Vec<(Epoch, u32)>, Error> {
        let mut updates = vec![];
        for epoch in (source.as_u64().saturating_add(1)..target.as_u64()).map(Epoch::new) {
            let existing = spans.get(epoch).max_epoch_span;
            let distance = epoch
                .distance_to(target)
                .ok_or(Error::DistanceTooLarge)?;
            if distance > existing {
                updates.push((epoch, distance));
            } else {
                break;
            }
        }
        Ok(updates)
    }
}
