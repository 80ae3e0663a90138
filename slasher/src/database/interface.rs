use crate::database::memory_impl;
#[cfg(feature = "redb")]
use crate::database::redb_impl;
use crate::{config::DatabaseBackend, Config, Error};
use strum::{EnumIter, IntoStaticStr};

/// The tables of the slasher database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DbTable {
    /// Schema version and on-disk config.
    Metadata,
    /// Map from `validator_index` to compressed `EpochSpanMap`.
    EpochSpans,
    /// Map from `validator_index` to `AttestationHistory`.
    AttestationHistories,
    /// Map from `(target_epoch, validator_index)` to `AttesterRecord`.
    Attesters,
    /// Map from `target_epoch` to `CompressedIdxAttList`.
    CompressedAttestations,
    /// Map from `(target_epoch, data_root)` to `AttestationData`.
    AttestationData,
    /// Map from `validator_index` to `ProposalHistory`.
    ProposalHistories,
    /// Map from `(slot, validator_index)` to `SignedBeaconBlockHeader`.
    Proposers,
}

impl DbTable {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValueStoreOp {
    PutKeyValue(DbTable, Vec<u8>, Vec<u8>),
    DeleteKey(DbTable, Vec<u8>),
}

/// An ordered key-value store with atomic batch writes.
#[derive(Debug)]
pub enum Environment {
    Memory(memory_impl::Environment),
    #[cfg(feature = "redb")]
    Redb(redb_impl::Environment),
}

impl Environment {
    pub fn new(config: &Config) -> Result<Environment, Error> {
        match config.backend {
            DatabaseBackend::Memory => Ok(Environment::Memory(memory_impl::Environment::new())),
            #[cfg(feature = "redb")]
            DatabaseBackend::Redb => redb_impl::Environment::new(config).map(Environment::Redb),
        }
    }

    pub fn get(&self, table: DbTable, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        match self {
            Environment::Memory(env) => env.get(table, key),
            #[cfg(feature = "redb")]
            Environment::Redb(env) => env.get(table, key),
        }
    }

    /// Apply every op, or none of them.
    pub fn commit(&self, ops: Vec<KeyValueStoreOp>) -> Result<(), Error> {
        if ops.is_empty() {
            return Ok(());
        }
        match self {
            Environment::Memory(env) => env.commit(ops),
            #[cfg(feature = "redb")]
            Environment::Redb(env) => env.commit(ops),
        }
    }

    /// Delete every key in `table` that sorts before `key`, returning how many were deleted.
    pub fn delete_before(&self, table: DbTable, key: &[u8]) -> Result<usize, Error> {
        match self {
            Environment::Memory(env) => env.delete_before(table, key),
            #[cfg(feature = "redb")]
            Environment::Redb(env) => env.delete_before(table, key),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;
    use strum::IntoEnumIterator;

    fn check_backend(env: Environment) {
        let put = |table, key: &[u8], value: &[u8]| {
            KeyValueStoreOp::PutKeyValue(table, key.to_vec(), value.to_vec())
        };

        env.commit(vec![
            put(DbTable::Attesters, &[0, 1], &[1]),
            put(DbTable::Attesters, &[0, 2], &[2]),
            put(DbTable::Attesters, &[1, 0], &[3]),
            put(DbTable::Proposers, &[0, 1], &[4]),
        ])
        .unwrap();

        assert_eq!(env.get(DbTable::Attesters, &[0, 2]).unwrap(), Some(vec![2]));
        assert_eq!(env.get(DbTable::Proposers, &[0, 1]).unwrap(), Some(vec![4]));
        assert_eq!(env.get(DbTable::Proposers, &[0, 2]).unwrap(), None);

        env.commit(vec![
            KeyValueStoreOp::DeleteKey(DbTable::Attesters, vec![0, 1]),
            put(DbTable::Attesters, &[0, 2], &[5]),
        ])
        .unwrap();
        assert_eq!(env.get(DbTable::Attesters, &[0, 1]).unwrap(), None);
        assert_eq!(env.get(DbTable::Attesters, &[0, 2]).unwrap(), Some(vec![5]));

        assert_eq!(env.delete_before(DbTable::Attesters, &[1, 0]).unwrap(), 1);
        assert_eq!(env.get(DbTable::Attesters, &[0, 2]).unwrap(), None);
        assert_eq!(env.get(DbTable::Attesters, &[1, 0]).unwrap(), Some(vec![3]));
        // Other tables are untouched.
        assert_eq!(env.get(DbTable::Proposers, &[0, 1]).unwrap(), Some(vec![4]));

        let remaining = DbTable::iter()
            .map(|table| env.delete_before(table, &[0xff; 8]).unwrap())
            .sum::<usize>();
        assert_eq!(remaining, 2);
    }

    #[test]
    fn table_names() {
        assert_eq!(DbTable::EpochSpans.name(), "epoch_spans");
        assert_eq!(DbTable::AttestationData.name(), "attestation_data");
    }

    #[test]
    fn memory_backend() {
        let config = Config::new(PathBuf::new()).for_testing();
        check_backend(Environment::new(&config).unwrap());
    }

    #[cfg(feature = "redb")]
    #[test]
    fn redb_backend() {
        let tempdir = tempfile::tempdir().unwrap();
        let mut config = Config::new(tempdir.path().into());
        config.backend = DatabaseBackend::Redb;
        check_backend(Environment::new(&config).unwrap());
    }
}
