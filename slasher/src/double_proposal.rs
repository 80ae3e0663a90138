use crate::{Error, ProposalHistory};
use types::{Epoch, SignedBeaconBlockHeader};

#[derive(Debug, Clone, PartialEq)]
pub enum ProposalCheck {
    /// Not slashable. The caller must store the header.
    New,
    /// Identical header already recorded.
    Duplicate,
    /// A different header was already recorded for the same slot.
    DoubleProposal(Box<SignedBeaconBlockHeader>),
}

#[derive(Debug, Clone, Copy)]
pub struct DoubleProposalDetector {
    history_length: usize,
}

impl DoubleProposalDetector {
    pub fn new(history_length: usize) -> Self {
        Self { history_length }
    }

    /// Check a proposal of `header` in `epoch` against the validator's proposal bits.
    ///
    /// The bits only say that *some* block was proposed in an epoch, so when one is set the
    /// stored header for the same slot is loaded with `existing_header`. If there is none the
    /// earlier proposal was for another slot and the new one is not slashable.
    pub fn check_and_update(
        &self,
        history: &mut ProposalHistory,
        epoch: Epoch,
        header: &SignedBeaconBlockHeader,
        existing_header: impl FnOnce() -> Result<Option<SignedBeaconBlockHeader>, Error>,
    ) -> Result<ProposalCheck, Error> {
        let min_epoch = history.min_epoch(self.history_length);
        if epoch < min_epoch {
            return Err(Error::StaleInput { epoch, min_epoch });
        }

        history.advance_to(epoch, self.history_length)?;

        if !history.is_set(epoch, self.history_length)? {
            history.set(epoch, self.history_length)?;
            return Ok(ProposalCheck::New);
        }

        match existing_header()? {
            Some(existing) if existing == *header => Ok(ProposalCheck::Duplicate),
            Some(existing) => Ok(ProposalCheck::DoubleProposal(Box::new(existing))),
            None => Ok(ProposalCheck::New),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::block;
    use std::collections::HashMap;
    use types::Slot;

    const HISTORY_LENGTH: usize = 16;
    const SLOTS_PER_EPOCH: u64 = 8;

    /// Single-validator harness storing headers by slot.
    struct Proposer {
        detector: DoubleProposalDetector,
        history: ProposalHistory,
        headers: HashMap<Slot, SignedBeaconBlockHeader>,
    }

    impl Proposer {
        fn new() -> Self {
            Self {
                detector: DoubleProposalDetector::new(HISTORY_LENGTH),
                history: ProposalHistory::new(HISTORY_LENGTH).unwrap(),
                headers: HashMap::new(),
            }
        }

        fn propose(&mut self, slot: u64, root: u64) -> Result<ProposalCheck, Error> {
            let header = block(slot, 0, root);
            let slot = header.message.slot;
            let epoch = slot.epoch(SLOTS_PER_EPOCH);
            let headers = &self.headers;
            let check = self
                .detector
                .check_and_update(&mut self.history, epoch, &header, || {
                    Ok(headers.get(&slot).cloned())
                })?;
            if check == ProposalCheck::New {
                self.headers.insert(slot, header);
            }
            Ok(check)
        }
    }

    #[test]
    fn double_proposal() {
        let mut proposer = Proposer::new();
        assert_eq!(proposer.propose(80, 1).unwrap(), ProposalCheck::New);
        assert_eq!(
            proposer.propose(80, 2).unwrap(),
            ProposalCheck::DoubleProposal(Box::new(block(80, 0, 1)))
        );
    }

    #[test]
    fn resubmission_is_idempotent() {
        let mut proposer = Proposer::new();
        assert_eq!(proposer.propose(80, 1).unwrap(), ProposalCheck::New);
        assert_eq!(proposer.propose(80, 1).unwrap(), ProposalCheck::Duplicate);
        assert_eq!(proposer.history.num_proposals(), 1);
    }

    #[test]
    fn other_slot_same_epoch_is_not_slashable() {
        let mut proposer = Proposer::new();
        assert_eq!(proposer.propose(80, 1).unwrap(), ProposalCheck::New);
        assert_eq!(proposer.propose(81, 2).unwrap(), ProposalCheck::New);
        assert_eq!(
            proposer.propose(81, 3).unwrap(),
            ProposalCheck::DoubleProposal(Box::new(block(81, 0, 2)))
        );
    }

    #[test]
    fn ring_wrap_does_not_alias() {
        let mut proposer = Proposer::new();
        assert_eq!(proposer.propose(0, 1).unwrap(), ProposalCheck::New);
        // Same bit as epoch 0, one full window later.
        let slot = HISTORY_LENGTH as u64 * SLOTS_PER_EPOCH;
        assert_eq!(proposer.propose(slot, 2).unwrap(), ProposalCheck::New);
        assert_eq!(proposer.history.num_proposals(), 1);
    }

    #[test]
    fn rolled_past_epoch_is_stale() {
        let mut proposer = Proposer::new();
        let slot = 100 * SLOTS_PER_EPOCH;
        assert_eq!(proposer.propose(slot, 1).unwrap(), ProposalCheck::New);

        // Epoch 85 is the oldest epoch still inside the window.
        assert!(matches!(
            proposer.propose(84 * SLOTS_PER_EPOCH, 1),
            Err(Error::StaleInput { .. })
        ));
        assert_eq!(
            proposer.propose(85 * SLOTS_PER_EPOCH, 1).unwrap(),
            ProposalCheck::New
        );
        assert_eq!(proposer.history.latest_epoch_written(), Epoch::new(100));
    }
}
