#![cfg(feature = "redb")]
use crate::database::interface::{DbTable, KeyValueStoreOp};
use crate::{Config, Error};
use derivative::Derivative;
use redb::{ReadableTable, TableDefinition};
use strum::IntoEnumIterator;

pub const DB_FILE_NAME: &str = "slasher.redb";

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Environment {
    #[derivative(Debug = "ignore")]
    db: redb::Database,
}

fn table_definition(table: DbTable) -> TableDefinition<'static, &'static [u8], &'static [u8]> {
    TableDefinition::new(table.name())
}

impl Environment {
    pub fn new(config: &Config) -> Result<Environment, Error> {
        std::fs::create_dir_all(&config.database_path)?;
        let path = config.database_path.join(DB_FILE_NAME);
        let db = redb::Database::create(&path)?;

        let tx = db.begin_write()?;
        for table in DbTable::iter() {
            tx.open_table(table_definition(table))?;
        }
        tx.commit()?;

        Ok(Environment { db })
    }

    pub fn get(&self, table: DbTable, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(table_definition(table))?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    pub fn commit(&self, ops: Vec<KeyValueStoreOp>) -> Result<(), Error> {
        let tx = self.db.begin_write()?;
        for op in ops {
            match op {
                KeyValueStoreOp::PutKeyValue(table, key, value) => {
                    let mut table = tx.open_table(table_definition(table))?;
                    table.insert(key.as_slice(), value.as_slice())?;
                }
                KeyValueStoreOp::DeleteKey(table, key) => {
                    let mut table = tx.open_table(table_definition(table))?;
                    table.remove(key.as_slice())?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_before(&self, table: DbTable, key: &[u8]) -> Result<usize, Error> {
        let tx = self.db.begin_write()?;
        let deleted = {
            let mut table = tx.open_table(table_definition(table))?;
            let keys = table
                .range::<&[u8]>(..key)?
                .map(|entry| entry.map(|(k, _)| k.value().to_vec()))
                .collect::<Result<Vec<_>, _>>()?;
            for k in &keys {
                table.remove(k.as_slice())?;
            }
            keys.len()
        };
        tx.commit()?;
        Ok(deleted)
    }
}
