pub mod interface;
mod memory_impl;
mod redb_impl;

use crate::{
    metrics, AttestationHistory, AttesterRecord, CompressedIdxAttList,
    CompressedIndexedAttestation, Config, EpochSpanMap, Error, ProposalHistory,
};
use byteorder::{BigEndian, ByteOrder};
use derivative::Derivative;
use interface::{DbTable, Environment, KeyValueStoreOp};
use lru::LruCache;
use parking_lot::Mutex;
use slog::{debug, Logger};
use ssz::{Decode, Encode};
use std::marker::PhantomData;
use std::num::NonZeroUsize;
use std::sync::Arc;
use types::{
    AttestationData, Epoch, EthSpec, FixedBytesExtended, Hash256, IndexedAttestation,
    SignedBeaconBlockHeader, Slot,
};

/// Current database schema version, to check compatibility of on-disk DB with software.
pub const CURRENT_SCHEMA_VERSION: u64 = 1;

/// Constant key under which the schema version is stored in the `metadata` table.
const METADATA_VERSION_KEY: &[u8] = &[0];
/// Constant key under which the slasher configuration is stored in the `metadata` table.
const METADATA_CONFIG_KEY: &[u8] = &[1];
/// Constant key under which the highest epoch pruned to is stored in the `metadata` table.
const METADATA_CURRENT_EPOCH_KEY: &[u8] = &[2];

const ATTESTER_KEY_SIZE: usize = 16;
const PROPOSER_KEY_SIZE: usize = 16;
const ATTESTATION_DATA_KEY_SIZE: usize = 40;

/// Database key for the `attesters` table.
///
/// Stored as big-endian `(target_epoch, validator_index)` to enable efficient iteration
/// while pruning.
#[derive(Debug)]
pub struct AttesterKey {
    data: [u8; ATTESTER_KEY_SIZE],
}

impl AttesterKey {
    pub fn new(validator_index: u64, target_epoch: Epoch) -> Self {
        let mut data = [0; ATTESTER_KEY_SIZE];
        BigEndian::write_u64(&mut data[0..8], target_epoch.as_u64());
        BigEndian::write_u64(&mut data[8..], validator_index);
        AttesterKey { data }
    }

    #[cfg(test)]
    pub fn parse(data: &[u8]) -> Option<(Epoch, u64)> {
        (data.len() == ATTESTER_KEY_SIZE).then(|| {
            let target_epoch = Epoch::new(BigEndian::read_u64(&data[..8]));
            let validator_index = BigEndian::read_u64(&data[8..]);
            (target_epoch, validator_index)
        })
    }
}

impl AsRef<[u8]> for AttesterKey {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Database key for the `proposers` table.
///
/// Stored as big-endian `(slot, validator_index)` to enable efficient iteration
/// while pruning.
#[derive(Debug)]
pub struct ProposerKey {
    data: [u8; PROPOSER_KEY_SIZE],
}

impl ProposerKey {
    pub fn new(validator_index: u64, slot: Slot) -> Self {
        let mut data = [0; PROPOSER_KEY_SIZE];
        BigEndian::write_u64(&mut data[0..8], slot.as_u64());
        BigEndian::write_u64(&mut data[8..], validator_index);
        ProposerKey { data }
    }

    #[cfg(test)]
    pub fn parse(data: &[u8]) -> Option<(Slot, u64)> {
        (data.len() == PROPOSER_KEY_SIZE).then(|| {
            let slot = Slot::new(BigEndian::read_u64(&data[..8]));
            let validator_index = BigEndian::read_u64(&data[8..]);
            (slot, validator_index)
        })
    }
}

impl AsRef<[u8]> for ProposerKey {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Database key for the `attestation_data` table: big-endian `(target_epoch, data_root)`.
#[derive(Debug)]
pub struct AttestationDataKey {
    data: [u8; ATTESTATION_DATA_KEY_SIZE],
}

impl AttestationDataKey {
    pub fn new(target_epoch: Epoch, data_root: Hash256) -> Self {
        let mut data = [0; ATTESTATION_DATA_KEY_SIZE];
        BigEndian::write_u64(&mut data[0..8], target_epoch.as_u64());
        data[8..].copy_from_slice(data_root.as_slice());
        AttestationDataKey { data }
    }
}

impl AsRef<[u8]> for AttestationDataKey {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Key containing a validator index.
#[derive(Debug)]
pub struct ValidatorKey {
    validator_index: [u8; 8],
}

impl ValidatorKey {
    pub fn new(validator_index: u64) -> Self {
        Self {
            validator_index: validator_index.to_be_bytes(),
        }
    }
}

impl AsRef<[u8]> for ValidatorKey {
    fn as_ref(&self) -> &[u8] {
        &self.validator_index
    }
}

/// Key for the `compressed_attestations` table.
#[derive(Debug)]
pub struct TargetEpochKey {
    target_epoch: [u8; 8],
}

impl TargetEpochKey {
    pub fn new(target_epoch: Epoch) -> Self {
        Self {
            target_epoch: target_epoch.as_u64().to_be_bytes(),
        }
    }
}

impl AsRef<[u8]> for TargetEpochKey {
    fn as_ref(&self) -> &[u8] {
        &self.target_epoch
    }
}

/// A batch of writes, applied atomically by `SlasherDB::commit`.
#[derive(Debug, Default)]
pub struct Transaction {
    ops: Vec<KeyValueStoreOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, table: DbTable, key: impl AsRef<[u8]>, value: Vec<u8>) {
        self.ops.push(KeyValueStoreOp::PutKeyValue(
            table,
            key.as_ref().to_vec(),
            value,
        ));
    }

    pub fn put_attestation_history(&mut self, validator_index: u64, history: &AttestationHistory) {
        self.put(
            DbTable::AttestationHistories,
            ValidatorKey::new(validator_index),
            history.as_ssz_bytes(),
        );
    }

    pub fn put_epoch_span_map(
        &mut self,
        validator_index: u64,
        spans: &EpochSpanMap,
    ) -> Result<(), Error> {
        self.put(
            DbTable::EpochSpans,
            ValidatorKey::new(validator_index),
            spans.to_compressed_bytes()?,
        );
        Ok(())
    }

    pub fn put_attester_record(
        &mut self,
        validator_index: u64,
        target_epoch: Epoch,
        record: AttesterRecord,
    ) {
        self.put(
            DbTable::Attesters,
            AttesterKey::new(validator_index, target_epoch),
            record.as_ssz_bytes(),
        );
    }

    pub fn put_compressed_attestations<E: EthSpec>(
        &mut self,
        target_epoch: Epoch,
        list: &CompressedIdxAttList<E>,
    ) {
        self.put(
            DbTable::CompressedAttestations,
            TargetEpochKey::new(target_epoch),
            list.as_ssz_bytes(),
        );
    }

    pub fn put_attestation_data(
        &mut self,
        target_epoch: Epoch,
        data_root: Hash256,
        data: &AttestationData,
    ) {
        self.put(
            DbTable::AttestationData,
            AttestationDataKey::new(target_epoch, data_root),
            data.as_ssz_bytes(),
        );
    }

    pub fn put_proposal_history(&mut self, validator_index: u64, history: &ProposalHistory) {
        self.put(
            DbTable::ProposalHistories,
            ValidatorKey::new(validator_index),
            history.as_ssz_bytes(),
        );
    }

    pub fn put_block_proposal(&mut self, validator_index: u64, header: &SignedBeaconBlockHeader) {
        self.put(
            DbTable::Proposers,
            ProposerKey::new(validator_index, header.message.slot),
            header.as_ssz_bytes(),
        );
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct SlasherDB<E: EthSpec> {
    env: Environment,
    /// LRU cache mapping validator indices to their decoded span maps.
    #[derivative(Debug = "ignore")]
    span_cache: Mutex<LruCache<u64, EpochSpanMap>>,
    config: Arc<Config>,
    log: Logger,
    _phantom: PhantomData<E>,
}

impl<E: EthSpec> SlasherDB<E> {
    pub fn open(config: Arc<Config>, log: Logger) -> Result<Self, Error> {
        let env = Environment::new(&config)?;
        let span_cache_size = NonZeroUsize::new(config.span_cache_size).ok_or_else(|| {
            Error::ConfigInvalidZeroParameter {
                config: (*config).clone(),
            }
        })?;

        let db = Self {
            env,
            span_cache: Mutex::new(LruCache::new(span_cache_size)),
            config,
            log,
            _phantom: PhantomData,
        };

        if let Some(schema_version) = db.load_schema_version()? {
            if schema_version != CURRENT_SCHEMA_VERSION {
                return Err(Error::IncompatibleSchemaVersion {
                    database_schema_version: schema_version,
                    software_schema_version: CURRENT_SCHEMA_VERSION,
                });
            }
        }

        if let Some(on_disk_config) = db.load_config()? {
            if !db.config.is_compatible(&on_disk_config) {
                return Err(Error::ConfigIncompatible {
                    on_disk_config,
                    config: (*db.config).clone(),
                });
            }
        }

        db.env.commit(vec![
            KeyValueStoreOp::PutKeyValue(
                DbTable::Metadata,
                METADATA_VERSION_KEY.to_vec(),
                bincode::serialize(&CURRENT_SCHEMA_VERSION)?,
            ),
            KeyValueStoreOp::PutKeyValue(
                DbTable::Metadata,
                METADATA_CONFIG_KEY.to_vec(),
                bincode::serialize(db.config.as_ref())?,
            ),
        ])?;

        Ok(db)
    }

    pub fn load_schema_version(&self) -> Result<Option<u64>, Error> {
        Ok(self
            .env
            .get(DbTable::Metadata, METADATA_VERSION_KEY)?
            .map(|bytes| bincode::deserialize(&bytes))
            .transpose()?)
    }

    pub fn load_config(&self) -> Result<Option<Config>, Error> {
        Ok(self
            .env
            .get(DbTable::Metadata, METADATA_CONFIG_KEY)?
            .map(|bytes| bincode::deserialize(&bytes))
            .transpose()?)
    }

    /// The epoch passed to the most recent `prune`, if any.
    pub fn load_current_epoch(&self) -> Result<Option<Epoch>, Error> {
        Ok(self
            .env
            .get(DbTable::Metadata, METADATA_CURRENT_EPOCH_KEY)?
            .map(|bytes| bincode::deserialize::<u64>(&bytes))
            .transpose()?
            .map(Epoch::new))
    }

    pub fn begin_transaction(&self) -> Transaction {
        Transaction::new()
    }

    pub fn commit(&self, txn: Transaction) -> Result<(), Error> {
        self.env.commit(txn.ops)
    }

    pub fn get_attestation_history(
        &self,
        validator_index: u64,
    ) -> Result<AttestationHistory, Error> {
        self.env
            .get(
                DbTable::AttestationHistories,
                ValidatorKey::new(validator_index).as_ref(),
            )?
            .map(|bytes| AttestationHistory::from_bytes(&bytes))
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// Load a validator's span map, from the cache if possible.
    pub fn get_epoch_span_map(&self, validator_index: u64) -> Result<EpochSpanMap, Error> {
        if let Some(spans) = self.span_cache.lock().get(&validator_index) {
            metrics::inc_counter(&metrics::SLASHER_SPAN_CACHE_HITS);
            return Ok(spans.clone());
        }
        metrics::inc_counter(&metrics::SLASHER_SPAN_CACHE_MISSES);

        let spans = self
            .env
            .get(DbTable::EpochSpans, ValidatorKey::new(validator_index).as_ref())?
            .map(|bytes| EpochSpanMap::from_compressed_bytes(&bytes))
            .transpose()?
            .unwrap_or_default();
        self.span_cache.lock().put(validator_index, spans.clone());
        Ok(spans)
    }

    /// Refresh the cache with span maps that have just been committed.
    pub fn cache_epoch_span_maps(&self, updates: impl IntoIterator<Item = (u64, EpochSpanMap)>) {
        let mut cache = self.span_cache.lock();
        for (validator_index, spans) in updates {
            cache.put(validator_index, spans);
        }
    }

    pub fn get_attester_record(
        &self,
        validator_index: u64,
        target_epoch: Epoch,
    ) -> Result<Option<AttesterRecord>, Error> {
        let attester_key = AttesterKey::new(validator_index, target_epoch);
        Ok(self
            .env
            .get(DbTable::Attesters, attester_key.as_ref())?
            .map(|bytes| AttesterRecord::from_ssz_bytes(&bytes))
            .transpose()?)
    }

    pub fn get_compressed_attestations(
        &self,
        target_epoch: Epoch,
    ) -> Result<CompressedIdxAttList<E>, Error> {
        Ok(self
            .env
            .get(
                DbTable::CompressedAttestations,
                TargetEpochKey::new(target_epoch).as_ref(),
            )?
            .map(|bytes| CompressedIdxAttList::from_ssz_bytes(&bytes))
            .transpose()?
            .unwrap_or_default())
    }

    pub fn get_attestation_data(
        &self,
        target_epoch: Epoch,
        data_root: Hash256,
    ) -> Result<Option<AttestationData>, Error> {
        let key = AttestationDataKey::new(target_epoch, data_root);
        Ok(self
            .env
            .get(DbTable::AttestationData, key.as_ref())?
            .map(|bytes| AttestationData::from_ssz_bytes(&bytes))
            .transpose()?)
    }

    /// Reconstruct the attestation that `validator_index` signed for `target_epoch`.
    pub fn get_attestation_for_validator(
        &self,
        validator_index: u64,
        target_epoch: Epoch,
    ) -> Result<IndexedAttestation<E>, Error> {
        let record = self
            .get_attester_record(validator_index, target_epoch)?
            .ok_or(Error::MissingAttesterRecord {
                validator_index,
                target_epoch,
            })?;
        let data_root = record.data_root;

        let compressed = self
            .get_compressed_attestations(target_epoch)?
            .find(validator_index, data_root)
            .cloned()
            .ok_or(Error::MissingIndexedAttestation {
                validator_index,
                target_epoch,
                data_root,
            })?;
        let data = self
            .get_attestation_data(target_epoch, data_root)?
            .ok_or(Error::MissingAttestationData {
                target_epoch,
                data_root,
            })?;

        Ok(compressed.decompress(data))
    }

    /// Stage `attestation` in the shared per-target tables.
    ///
    /// Must be called with the target epoch's lock held, since the list for the target is
    /// read-modify-written.
    pub fn store_attestation(
        &self,
        txn: &mut Transaction,
        attestation: &IndexedAttestation<E>,
        data_root: Hash256,
    ) -> Result<(), Error> {
        let target_epoch = attestation.data.target.epoch;
        let mut list = self.get_compressed_attestations(target_epoch)?;
        if list.insert(CompressedIndexedAttestation::compress(attestation)) {
            txn.put_compressed_attestations(target_epoch, &list);
        }
        txn.put_attestation_data(target_epoch, data_root, &attestation.data);
        Ok(())
    }

    pub fn get_proposal_history(&self, validator_index: u64) -> Result<ProposalHistory, Error> {
        self.env
            .get(
                DbTable::ProposalHistories,
                ValidatorKey::new(validator_index).as_ref(),
            )?
            .map(|bytes| ProposalHistory::from_bytes(&bytes, self.config.history_length))
            .unwrap_or_else(|| ProposalHistory::new(self.config.history_length))
    }

    pub fn get_block_proposal(
        &self,
        proposer_index: u64,
        slot: Slot,
    ) -> Result<Option<SignedBeaconBlockHeader>, Error> {
        let proposer_key = ProposerKey::new(proposer_index, slot);
        Ok(self
            .env
            .get(DbTable::Proposers, proposer_key.as_ref())?
            .map(|bytes| SignedBeaconBlockHeader::from_ssz_bytes(&bytes))
            .transpose()?)
    }

    #[cfg(test)]
    pub(crate) fn put_raw(&self, table: DbTable, key: &[u8], value: Vec<u8>) -> Result<(), Error> {
        self.env
            .commit(vec![KeyValueStoreOp::PutKeyValue(table, key.to_vec(), value)])
    }

    #[cfg(test)]
    pub(crate) fn clear_span_cache(&self) {
        self.span_cache.lock().clear();
    }

    /// Delete shared attestation and proposal records that are older than the history window
    /// ending at `current_epoch`.
    ///
    /// Per-validator histories and spans are pruned as they are updated.
    pub fn prune(&self, current_epoch: Epoch) -> Result<(), Error> {
        let min_epoch = self.config.min_epoch(current_epoch);
        let min_slot = min_epoch.start_slot(E::slots_per_epoch());

        let attesters = self.env.delete_before(
            DbTable::Attesters,
            AttesterKey::new(0, min_epoch).as_ref(),
        )?;
        let compressed = self.env.delete_before(
            DbTable::CompressedAttestations,
            TargetEpochKey::new(min_epoch).as_ref(),
        )?;
        let data = self.env.delete_before(
            DbTable::AttestationData,
            AttestationDataKey::new(min_epoch, Hash256::zero()).as_ref(),
        )?;
        let proposers = self
            .env
            .delete_before(DbTable::Proposers, ProposerKey::new(0, min_slot).as_ref())?;
        self.env.commit(vec![KeyValueStoreOp::PutKeyValue(
            DbTable::Metadata,
            METADATA_CURRENT_EPOCH_KEY.to_vec(),
            bincode::serialize(&current_epoch.as_u64())?,
        )])?;

        debug!(
            self.log,
            "Pruned slasher database";
            "min_epoch" => min_epoch.as_u64(),
            "attester_records" => attesters,
            "attestation_lists" => compressed,
            "attestation_data" => data,
            "block_proposals" => proposers,
        );
        Ok(())
    }
}
