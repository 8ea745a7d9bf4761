use std::sync::Arc;

use redb::{Database, Durability, ReadableTable, TableDefinition};

use super::{ssz_encoder::SSZEncoding, table::Table};
use crate::{errors::StoreError, record::ValidatorRecord};

/// Table definition for the Validators table
///
/// Key: validator index
/// Value: ValidatorRecord
pub const VALIDATORS_TABLE: TableDefinition<u64, SSZEncoding<ValidatorRecord>> =
    TableDefinition::new("validators");

pub struct ValidatorsTable {
    pub db: Arc<Database>,
}

impl ValidatorsTable {
    /// Returns the stored record, inserting `record` first when the index is unknown.
    ///
    /// Lookup and insert share one write transaction.
    pub fn get_or_insert(&self, record: ValidatorRecord) -> Result<ValidatorRecord, StoreError> {
        let mut write_txn = self.db.begin_write()?;
        write_txn.set_durability(Durability::Immediate);
        let mut table = write_txn.open_table(VALIDATORS_TABLE)?;
        let stored = table.get(record.idx)?.map(|guard| guard.value());
        let result = match stored {
            Some(stored) => stored,
            None => {
                table.insert(record.idx, record)?;
                record
            }
        };
        drop(table);
        write_txn.commit()?;
        Ok(result)
    }

    /// Overwrites an existing record. Fails when nothing is stored under its index.
    pub fn replace(&self, record: ValidatorRecord) -> Result<(), StoreError> {
        let mut write_txn = self.db.begin_write()?;
        write_txn.set_durability(Durability::Immediate);
        let mut table = write_txn.open_table(VALIDATORS_TABLE)?;
        if table.get(record.idx)?.is_none() {
            return Err(StoreError::ValidatorNotFound(record.idx));
        }
        table.insert(record.idx, record)?;
        drop(table);
        write_txn.commit()?;
        Ok(())
    }
}

impl Table for ValidatorsTable {
    type Key = u64;

    type Value = ValidatorRecord;

    fn get(&self, key: Self::Key) -> Result<Option<Self::Value>, StoreError> {
        let read_txn = self.db.begin_read()?;

        let table = read_txn.open_table(VALIDATORS_TABLE)?;
        let result = table.get(key)?;
        Ok(result.map(|res| res.value()))
    }

    fn insert(&self, key: Self::Key, value: Self::Value) -> Result<(), StoreError> {
        let mut write_txn = self.db.begin_write()?;
        write_txn.set_durability(Durability::Immediate);
        let mut table = write_txn.open_table(VALIDATORS_TABLE)?;
        table.insert(key, value)?;
        drop(table);
        write_txn.commit()?;
        Ok(())
    }
}
