use crate::{
    metrics, AttesterRecord, AttesterSlashingStatus, Config, DoubleProposalDetector, Error,
    InvalidInput, KeyedLocks, ProposalCheck, ProposerSlashingStatus, SlasherDB, SlashingId,
    SlashingStatus, SlashingStatusTracker, SurroundCheck, SurroundDetector,
};
use parking_lot::RwLock;
use slog::{debug, info, Logger};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tree_hash::TreeHash;
use types::{
    AttesterSlashing, Epoch, EthSpec, IndexedAttestation, ProposerSlashing,
    SignedBeaconBlockHeader,
};

#[derive(Debug)]
pub struct Slasher<E: EthSpec> {
    db: SlasherDB<E>,
    surround_detector: SurroundDetector,
    proposal_detector: DoubleProposalDetector,
    attester_slashings: SlashingStatusTracker<AttesterSlashing<E>>,
    proposer_slashings: SlashingStatusTracker<ProposerSlashing>,
    /// One lock per chunk of `config.validator_chunk_size` validators.
    validator_locks: KeyedLocks,
    /// One lock per target epoch, guarding that epoch's attestation list.
    ///
    /// Always acquired after the validator locks.
    target_locks: KeyedLocks,
    /// Held for reading while processing and for writing while pruning, so that evidence is
    /// never deleted out from under a check.
    prune_lock: RwLock<()>,
    /// The chain's current epoch, as last reported by `set_current_epoch` or `prune_database`.
    ///
    /// Never raised by attestation or block contents.
    current_epoch: AtomicU64,
    config: Arc<Config>,
    log: Logger,
}

impl<E: EthSpec> Slasher<E> {
    pub fn open(config: Config, log: Logger) -> Result<Self, Error> {
        config.validate()?;
        let config = Arc::new(config);
        let db = SlasherDB::open(config.clone(), log.clone())?;
        let current_epoch = db.load_current_epoch()?.unwrap_or_else(|| Epoch::new(0));

        info!(
            log,
            "Opened slasher database";
            "backend" => %config.backend,
            "history_length" => config.history_length,
            "current_epoch" => current_epoch.as_u64(),
        );

        Ok(Self {
            db,
            surround_detector: SurroundDetector::new(config.history_length),
            proposal_detector: DoubleProposalDetector::new(config.history_length),
            attester_slashings: SlashingStatusTracker::new(),
            proposer_slashings: SlashingStatusTracker::new(),
            validator_locks: KeyedLocks::new(),
            target_locks: KeyedLocks::new(),
            prune_lock: RwLock::new(()),
            current_epoch: AtomicU64::new(current_epoch.as_u64()),
            config,
            log,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn current_epoch(&self) -> Epoch {
        Epoch::new(self.current_epoch.load(Ordering::Relaxed))
    }

    /// Advance the current epoch, as read from the chain's slot clock. Earlier epochs are ignored.
    pub fn set_current_epoch(&self, epoch: Epoch) {
        let previous = self
            .current_epoch
            .fetch_max(epoch.as_u64(), Ordering::Relaxed);
        if epoch.as_u64() > previous {
            debug!(
                self.log,
                "Advanced slasher epoch";
                "current_epoch" => epoch.as_u64(),
            );
        }
    }

    /// Fail unless `oldest..=newest` lies inside the window that ends at the current epoch, plus
    /// the configured tolerance for future epochs.
    fn check_epochs_in_range(&self, oldest: Epoch, newest: Epoch) -> Result<(), Error> {
        let current_epoch = self.current_epoch();
        let max_epoch = self.config.max_epoch(current_epoch);
        if newest > max_epoch {
            debug!(
                self.log,
                "Rejecting future input";
                "epoch" => newest.as_u64(),
                "current_epoch" => current_epoch.as_u64(),
            );
            return Err(InvalidInput::FutureEpoch {
                epoch: newest,
                max_epoch,
            }
            .into());
        }

        let min_epoch = self
            .config
            .min_epoch(std::cmp::max(current_epoch, newest));
        if oldest < min_epoch {
            metrics::inc_counter(&metrics::SLASHER_NUM_STALE_INPUTS);
            debug!(
                self.log,
                "Rejecting stale input";
                "epoch" => oldest.as_u64(),
                "min_epoch" => min_epoch.as_u64(),
            );
            return Err(Error::StaleInput {
                epoch: oldest,
                min_epoch,
            });
        }
        Ok(())
    }

    fn validate_attestation(attestation: &IndexedAttestation<E>) -> Result<(), InvalidInput> {
        let source = attestation.data.source.epoch;
        let target = attestation.data.target.epoch;
        if attestation.attesting_indices_is_empty() {
            Err(InvalidInput::EmptyAttestingIndices)
        } else if !attestation.attesting_indices_are_sorted() {
            Err(InvalidInput::UnsortedAttestingIndices)
        } else if source > target {
            Err(InvalidInput::SourceAfterTarget { source, target })
        } else {
            Ok(())
        }
    }

    /// Check `attestation` for slashable conflicts with previously seen attestations, and record
    /// it for every attesting validator that it doesn't incriminate.
    ///
    /// Returns every distinct slashing found, which is empty if the attestation is safe.
    pub fn is_slashable_attestation(
        &self,
        attestation: &IndexedAttestation<E>,
    ) -> Result<Vec<AttesterSlashing<E>>, Error> {
        let _timer = metrics::start_timer(&metrics::SLASHER_ATTESTATION_CHECK_TIME);
        metrics::inc_counter(&metrics::SLASHER_NUM_ATTESTATIONS_PROCESSED);

        Self::validate_attestation(attestation)?;
        let source = attestation.data.source.epoch;
        let target = attestation.data.target.epoch;

        let _prune_guard = self.prune_lock.read();
        self.check_epochs_in_range(source, target)?;

        let data_root = attestation.data.tree_hash_root();

        let validator_guards = self.validator_locks.lock_many(
            attestation
                .attesting_indices_iter()
                .map(|validator_index| self.config.validator_chunk_index(*validator_index)),
        );
        let target_guard = self.target_locks.lock(target.as_u64());

        let mut txn = self.db.begin_transaction();
        let mut span_updates = vec![];
        let mut conflicts = vec![];

        for &validator_index in attestation.attesting_indices_iter() {
            let mut history = self.db.get_attestation_history(validator_index)?;
            let mut spans = self.db.get_epoch_span_map(validator_index)?;

            let check = self.surround_detector.check_and_update(
                &mut history,
                &mut spans,
                source,
                target,
                data_root,
                || {
                    self.db
                        .get_attester_record(validator_index, target)?
                        .map(|record| record.data_root)
                        .ok_or(Error::MissingAttesterRecord {
                            validator_index,
                            target_epoch: target,
                        })
                },
            )?;

            match check {
                SurroundCheck::Updated => {
                    txn.put_attestation_history(validator_index, &history);
                    txn.put_epoch_span_map(validator_index, &spans)?;
                    txn.put_attester_record(validator_index, target, AttesterRecord { data_root });
                    span_updates.push((validator_index, spans));
                }
                SurroundCheck::Duplicate => {}
                conflict => conflicts.push((validator_index, conflict)),
            }
        }

        if !span_updates.is_empty() {
            self.db.store_attestation(&mut txn, attestation, data_root)?;
        }
        self.db.commit(txn)?;
        self.db.cache_epoch_span_maps(span_updates);

        drop(target_guard);
        drop(validator_guards);

        let mut slashings: Vec<AttesterSlashing<E>> = vec![];
        for (validator_index, conflict) in conflicts {
            let status = self.load_attester_slashing_status(validator_index, conflict)?;
            if let Some(slashing) = status.into_slashing(attestation) {
                debug!(
                    self.log,
                    "Found attester slashing";
                    "validator_index" => validator_index,
                    "kind" => ?conflict,
                    "source" => source.as_u64(),
                    "target" => target.as_u64(),
                );

                if !slashings.contains(&slashing) {
                    slashings.push(slashing);
                }
            }
        }

        let num_new = slashings
            .iter()
            .filter(|slashing| self.attester_slashings.record((*slashing).clone()).1)
            .count();
        if num_new > 0 {
            metrics::inc_counter_by(&metrics::SLASHER_NUM_ATTESTER_SLASHINGS, num_new as u64);
            info!(
                self.log,
                "Found {} new attester slashings", num_new;
                "source" => source.as_u64(),
                "target" => target.as_u64(),
            );
        }

        Ok(slashings)
    }

    fn load_attester_slashing_status(
        &self,
        validator_index: u64,
        conflict: SurroundCheck,
    ) -> Result<AttesterSlashingStatus<E>, Error> {
        let load = |existing_target| {
            self.db
                .get_attestation_for_validator(validator_index, existing_target)
                .map(Box::new)
        };
        Ok(match conflict {
            SurroundCheck::Updated | SurroundCheck::Duplicate => {
                AttesterSlashingStatus::NotSlashable
            }
            SurroundCheck::DoubleVote { existing_target } => {
                AttesterSlashingStatus::DoubleVote(load(existing_target)?)
            }
            SurroundCheck::SurroundsExisting { existing_target } => {
                AttesterSlashingStatus::SurroundsExisting(load(existing_target)?)
            }
            SurroundCheck::SurroundedByExisting { existing_target } => {
                AttesterSlashingStatus::SurroundedByExisting(load(existing_target)?)
            }
        })
    }

    /// Check whether `header` conflicts with a block previously proposed by `validator_index`,
    /// recording it if it is new.
    pub fn is_slashable_block(
        &self,
        header: &SignedBeaconBlockHeader,
        validator_index: u64,
    ) -> Result<Option<ProposerSlashing>, Error> {
        let _timer = metrics::start_timer(&metrics::SLASHER_BLOCK_CHECK_TIME);
        metrics::inc_counter(&metrics::SLASHER_NUM_BLOCKS_PROCESSED);

        if header.message.proposer_index != validator_index {
            return Err(InvalidInput::ProposerIndexMismatch {
                header: header.message.proposer_index,
                requested: validator_index,
            }
            .into());
        }
        let slot = header.message.slot;
        let epoch = slot.epoch(E::slots_per_epoch());

        let _prune_guard = self.prune_lock.read();
        self.check_epochs_in_range(epoch, epoch)?;

        let validator_guard = self
            .validator_locks
            .lock(self.config.validator_chunk_index(validator_index));

        let mut history = self.db.get_proposal_history(validator_index)?;
        let check = self
            .proposal_detector
            .check_and_update(&mut history, epoch, header, || {
                self.db.get_block_proposal(validator_index, slot)
            })?;

        let status = match check {
            ProposalCheck::New => {
                let mut txn = self.db.begin_transaction();
                txn.put_proposal_history(validator_index, &history);
                txn.put_block_proposal(validator_index, header);
                self.db.commit(txn)?;
                ProposerSlashingStatus::NotSlashable
            }
            ProposalCheck::Duplicate => ProposerSlashingStatus::NotSlashable,
            ProposalCheck::DoubleProposal(existing) => {
                ProposerSlashingStatus::DoubleProposal(existing)
            }
        };
        drop(validator_guard);

        let slashing = status.into_slashing(header);
        if let Some(slashing) = &slashing {
            let (id, is_new) = self.proposer_slashings.record(slashing.clone());
            if is_new {
                metrics::inc_counter(&metrics::SLASHER_NUM_PROPOSER_SLASHINGS);
                info!(
                    self.log,
                    "Found new proposer slashing";
                    "id" => %id,
                    "validator_index" => validator_index,
                    "slot" => slot.as_u64(),
                );
            }
        }
        Ok(slashing)
    }

    /// All recorded attester slashings with `status`, oldest first.
    pub fn attester_slashings(&self, status: SlashingStatus) -> Vec<AttesterSlashing<E>> {
        self.attester_slashings.query(status)
    }

    /// All recorded proposer slashings with `status`, oldest first.
    pub fn proposer_slashings(&self, status: SlashingStatus) -> Vec<ProposerSlashing> {
        self.proposer_slashings.query(status)
    }

    pub fn attester_slashing_id(&self, slashing: &AttesterSlashing<E>) -> Option<SlashingId> {
        self.attester_slashings.id_of(slashing)
    }

    pub fn proposer_slashing_id(&self, slashing: &ProposerSlashing) -> Option<SlashingId> {
        self.proposer_slashings.id_of(slashing)
    }

    pub fn attester_slashing_status(&self, id: SlashingId) -> Result<SlashingStatus, Error> {
        self.attester_slashings.status(id)
    }

    pub fn proposer_slashing_status(&self, id: SlashingId) -> Result<SlashingStatus, Error> {
        self.proposer_slashings.status(id)
    }

    pub fn transition_attester_slashing(
        &self,
        id: SlashingId,
        status: SlashingStatus,
    ) -> Result<(), Error> {
        self.attester_slashings.transition(id, status)?;
        debug!(
            self.log,
            "Updated attester slashing status";
            "id" => %id,
            "status" => %status,
        );
        Ok(())
    }

    pub fn transition_proposer_slashing(
        &self,
        id: SlashingId,
        status: SlashingStatus,
    ) -> Result<(), Error> {
        self.proposer_slashings.transition(id, status)?;
        debug!(
            self.log,
            "Updated proposer slashing status";
            "id" => %id,
            "status" => %status,
        );
        Ok(())
    }

    /// Advance the current epoch to `current_epoch` and delete evidence that has fallen out of
    /// the window.
    pub fn prune_database(&self, current_epoch: Epoch) -> Result<(), Error> {
        let _timer = metrics::start_timer(&metrics::SLASHER_PRUNE_TIME);
        let _prune_guard = self.prune_lock.write();

        self.set_current_epoch(current_epoch);
        let current_epoch = self.current_epoch();
        self.db.prune(current_epoch)?;
        self.target_locks
            .prune_below(self.config.min_epoch(current_epoch).as_u64());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::database::{TargetEpochKey, ValidatorKey};
    use crate::test_utils::{block, indexed_att, logger, E};
    use crate::{AttestationHistory, DbTable, EpochSpanMap, ErrorKind};
    use std::path::PathBuf;

    const HISTORY_LENGTH: usize = 16;
    const CURRENT_EPOCH: u64 = 10;

    fn slasher() -> Slasher<E> {
        let mut config = Config::new(PathBuf::new()).for_testing();
        config.history_length = HISTORY_LENGTH;
        config.validator_chunk_size = 4;
        let slasher = Slasher::open(config, logger()).unwrap();
        slasher.set_current_epoch(Epoch::new(CURRENT_EPOCH));
        slasher
    }

    #[test]
    fn invalid_attestations_rejected() {
        let slasher = slasher();
        for (att, expected) in [
            (
                indexed_att(vec![], 0, 1, 0),
                InvalidInput::EmptyAttestingIndices,
            ),
            (
                indexed_att(vec![2, 1], 0, 1, 0),
                InvalidInput::UnsortedAttestingIndices,
            ),
            (
                indexed_att(vec![1, 1], 0, 1, 0),
                InvalidInput::UnsortedAttestingIndices,
            ),
            (
                indexed_att(vec![1], 3, 2, 0),
                InvalidInput::SourceAfterTarget {
                    source: Epoch::new(3),
                    target: Epoch::new(2),
                },
            ),
        ] {
            match slasher.is_slashable_attestation(&att) {
                Err(Error::InvalidInput(reason)) => assert_eq!(reason, expected),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[test]
    fn double_vote_orientation() {
        let slasher = slasher();
        let att1 = indexed_att(vec![1, 2], 0, 3, 0);
        let att2 = indexed_att(vec![2, 3], 0, 3, 1);

        assert!(slasher.is_slashable_attestation(&att1).unwrap().is_empty());
        let slashings = slasher.is_slashable_attestation(&att2).unwrap();
        assert_eq!(
            slashings,
            vec![AttesterSlashing {
                attestation_1: att1,
                attestation_2: att2,
            }]
        );
    }

    #[test]
    fn surround_orientation() {
        let slasher = slasher();
        let inner = indexed_att(vec![0], 2, 3, 0);
        let outer = indexed_att(vec![0], 1, 4, 0);

        assert!(slasher.is_slashable_attestation(&inner).unwrap().is_empty());
        let slashings = slasher.is_slashable_attestation(&outer).unwrap();
        assert_eq!(slashings.len(), 1);
        assert_eq!(slashings[0].attestation_1, outer);
        assert_eq!(slashings[0].attestation_2, inner);
        assert!(slashings[0].is_slashable_pair());
    }

    #[test]
    fn one_slashing_per_conflicting_attestation() {
        let slasher = slasher();
        let att1 = indexed_att(vec![1, 2, 3], 0, 3, 0);
        let att2 = indexed_att(vec![1, 2, 3], 0, 3, 1);

        slasher.is_slashable_attestation(&att1).unwrap();
        assert_eq!(slasher.is_slashable_attestation(&att2).unwrap().len(), 1);
        assert_eq!(slasher.attester_slashings(SlashingStatus::Active).len(), 1);
        // Resubmitting finds the same evidence without recording it twice.
        assert_eq!(slasher.is_slashable_attestation(&att2).unwrap().len(), 1);
        assert_eq!(slasher.attester_slashings(SlashingStatus::Active).len(), 1);
    }

    #[test]
    fn duplicate_attestation_not_slashable() {
        let slasher = slasher();
        let att = indexed_att(vec![5], 1, 2, 0);
        assert!(slasher.is_slashable_attestation(&att).unwrap().is_empty());
        assert!(slasher.is_slashable_attestation(&att).unwrap().is_empty());
    }

    #[test]
    fn proposer_index_mismatch() {
        let slasher = slasher();
        assert!(matches!(
            slasher.is_slashable_block(&block(0, 1, 0), 2),
            Err(Error::InvalidInput(InvalidInput::ProposerIndexMismatch {
                header: 1,
                requested: 2
            }))
        ));
    }

    #[test]
    fn double_proposal() {
        let slasher = slasher();
        let slot = 10 * E::slots_per_epoch();
        let block1 = block(slot, 3, 1);
        let block2 = block(slot, 3, 2);

        assert_eq!(slasher.is_slashable_block(&block1, 3).unwrap(), None);
        assert_eq!(slasher.is_slashable_block(&block1, 3).unwrap(), None);
        // Same epoch, different slot.
        assert_eq!(slasher.is_slashable_block(&block(slot + 1, 3, 7), 3).unwrap(), None);

        let slashing = slasher.is_slashable_block(&block2, 3).unwrap().unwrap();
        assert_eq!(slashing.signed_header_1, block1);
        assert_eq!(slashing.signed_header_2, block2);
        assert_eq!(slasher.proposer_slashings(SlashingStatus::Active), vec![slashing]);
    }

    #[test]
    fn future_epochs_rejected_without_moving_clock() {
        let slasher = slasher();
        let honest = indexed_att(vec![1], 9, 10, 0);
        assert!(slasher.is_slashable_attestation(&honest).unwrap().is_empty());

        for (source, target) in [(1_000_000, 1_000_000), (0, u64::MAX), (10, 12)] {
            assert!(matches!(
                slasher.is_slashable_attestation(&indexed_att(vec![2], source, target, 0)),
                Err(Error::InvalidInput(InvalidInput::FutureEpoch { .. }))
            ));
        }
        assert!(matches!(
            slasher.is_slashable_block(&block(1_000_000 * E::slots_per_epoch(), 4, 0), 4),
            Err(Error::InvalidInput(InvalidInput::FutureEpoch { .. }))
        ));
        assert_eq!(slasher.current_epoch(), Epoch::new(CURRENT_EPOCH));

        // Detection carries on as before.
        let double_vote = indexed_att(vec![1], 8, 10, 0);
        assert_eq!(
            slasher.is_slashable_attestation(&double_vote).unwrap(),
            vec![AttesterSlashing {
                attestation_1: honest,
                attestation_2: double_vote,
            }]
        );
        // One epoch ahead is tolerated.
        assert!(slasher
            .is_slashable_attestation(&indexed_att(vec![3], 10, 11, 0))
            .unwrap()
            .is_empty());
        assert_eq!(
            slasher
                .is_slashable_block(&block(11 * E::slots_per_epoch(), 4, 0), 4)
                .unwrap(),
            None
        );
        assert_eq!(slasher.current_epoch(), Epoch::new(CURRENT_EPOCH));
    }

    #[test]
    fn clock_only_moves_forward() {
        let slasher = slasher();
        slasher.set_current_epoch(Epoch::new(3));
        assert_eq!(slasher.current_epoch(), Epoch::new(CURRENT_EPOCH));
        slasher.set_current_epoch(Epoch::new(12));
        assert_eq!(slasher.current_epoch(), Epoch::new(12));
    }

    #[test]
    fn stale_after_clock_advances() {
        let slasher = slasher();
        slasher.set_current_epoch(Epoch::new(20));

        // Window is [5, 20].
        assert!(matches!(
            slasher.is_slashable_attestation(&indexed_att(vec![1], 4, 6, 0)),
            Err(Error::StaleInput { .. })
        ));
        assert!(slasher
            .is_slashable_attestation(&indexed_att(vec![1], 5, 6, 0))
            .unwrap()
            .is_empty());
        assert!(matches!(
            slasher.is_slashable_block(&block(4 * E::slots_per_epoch(), 0, 0), 0),
            Err(Error::StaleInput { .. })
        ));
    }

    #[test]
    fn attestation_spanning_window_is_stale() {
        let slasher = slasher();
        slasher.set_current_epoch(Epoch::new(HISTORY_LENGTH as u64));
        let err = slasher
            .is_slashable_attestation(&indexed_att(vec![0], 0, HISTORY_LENGTH as u64, 0))
            .unwrap_err();
        assert!(matches!(err, Error::StaleInput { .. }));
    }

    /// A validator's history, its span map as cached, and its span map as stored.
    fn validator_state(
        slasher: &Slasher<E>,
        validator_index: u64,
    ) -> (AttestationHistory, EpochSpanMap, EpochSpanMap) {
        let history = slasher.db.get_attestation_history(validator_index).unwrap();
        let cached = slasher.db.get_epoch_span_map(validator_index).unwrap();
        slasher.db.clear_span_cache();
        let stored = slasher.db.get_epoch_span_map(validator_index).unwrap();
        (history, cached, stored)
    }

    #[test]
    fn storage_failure_leaves_no_partial_update() {
        let corrupt_entries = [
            // Fails part way through the validators.
            (
                DbTable::AttestationHistories,
                ValidatorKey::new(2).as_ref().to_vec(),
            ),
            // Fails after every validator has been checked.
            (
                DbTable::CompressedAttestations,
                TargetEpochKey::new(Epoch::new(5)).as_ref().to_vec(),
            ),
        ];

        for (table, key) in corrupt_entries {
            let slasher = slasher();
            slasher
                .is_slashable_attestation(&indexed_att(vec![1, 2, 3], 1, 2, 0))
                .unwrap();
            slasher.db.put_raw(table, &key, vec![0xff; 3]).unwrap();

            let before = [1, 3].map(|i| validator_state(&slasher, i));
            let err = slasher
                .is_slashable_attestation(&indexed_att(vec![1, 2, 3], 3, 5, 0))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Storage, "{:?}", table);

            let after = [1, 3].map(|i| validator_state(&slasher, i));
            assert_eq!(before, after, "{:?}", table);
            for validator_index in [1, 3] {
                assert!(slasher
                    .db
                    .get_attester_record(validator_index, Epoch::new(5))
                    .unwrap()
                    .is_none());
            }
            assert_eq!(slasher.current_epoch(), Epoch::new(CURRENT_EPOCH));
            assert!(slasher.attester_slashings(SlashingStatus::Active).is_empty());
        }
    }

    #[test]
    fn prune_advances_current_epoch() {
        let slasher = slasher();
        slasher.prune_database(Epoch::new(40)).unwrap();
        assert_eq!(slasher.current_epoch(), Epoch::new(40));
        slasher.prune_database(Epoch::new(30)).unwrap();
        assert_eq!(slasher.current_epoch(), Epoch::new(40));
    }
}
