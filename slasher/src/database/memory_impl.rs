use crate::database::interface::{DbTable, KeyValueStoreOp};
use crate::Error;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// Volatile backend: one ordered map per table behind a single lock.
#[derive(Debug, Default)]
pub struct Environment {
    tables: RwLock<HashMap<DbTable, Table>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: DbTable, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self
            .tables
            .read()
            .get(&table)
            .and_then(|t| t.get(key))
            .cloned())
    }

    pub fn commit(&self, ops: Vec<KeyValueStoreOp>) -> Result<(), Error> {
        let mut tables = self.tables.write();
        for op in ops {
            match op {
                KeyValueStoreOp::PutKeyValue(table, key, value) => {
                    tables.entry(table).or_default().insert(key, value);
                }
                KeyValueStoreOp::DeleteKey(table, key) => {
                    if let Some(t) = tables.get_mut(&table) {
                        t.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn delete_before(&self, table: DbTable, key: &[u8]) -> Result<usize, Error> {
        let mut tables = self.tables.write();
        let Some(t) = tables.get_mut(&table) else {
            return Ok(0);
        };
        let keep = t.split_off(key);
        let deleted = t.len();
        *t = keep;
        Ok(deleted)
    }
}
