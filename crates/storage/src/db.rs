use std::{fs, path::PathBuf, sync::Arc};

use redb::{Builder, Database, backends::InMemoryBackend};
use tracing::info;

use crate::{
    errors::StoreError,
    record::ValidatorRecord,
    repository::Repository,
    tables::{
        table::Table,
        validators::{VALIDATORS_TABLE, ValidatorsTable},
    },
};

pub const REDB_FILE: &str = "posmoni.redb";

/// The size of the cache for the database
///
/// 64 MiB
pub const REDB_CACHE_SIZE: usize = 64 * 1_024 * 1_024;

#[derive(Clone, Debug)]
pub struct MonitorDB {
    db: Arc<Database>,
}

impl MonitorDB {
    pub fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&data_dir)?;
        let path = data_dir.join(REDB_FILE);
        let db = Builder::new()
            .set_cache_size(REDB_CACHE_SIZE)
            .create(&path)?;
        info!("Opened validator database at {}", path.display());

        Ok(Self { db: Arc::new(db) })
    }

    /// Database that lives only as long as this handle and its clones.
    pub fn ephemeral() -> Result<Self, StoreError> {
        let db = Builder::new().create_with_backend(InMemoryBackend::new())?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn validators_table(&self) -> ValidatorsTable {
        ValidatorsTable {
            db: self.db.clone(),
        }
    }
}

impl Repository for MonitorDB {
    fn get_or_create(&self, record: ValidatorRecord) -> Result<ValidatorRecord, StoreError> {
        self.validators_table().get_or_insert(record)
    }

    fn update(&self, record: ValidatorRecord) -> Result<(), StoreError> {
        self.validators_table().replace(record)
    }

    fn validator(&self, idx: u64) -> Result<Option<ValidatorRecord>, StoreError> {
        self.validators_table().get(idx)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        write_txn.open_table(VALIDATORS_TABLE)?;
        write_txn.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn migrated_db() -> MonitorDB {
        let db = MonitorDB::ephemeral().expect("in memory database");
        db.migrate().expect("migration");
        db
    }

    #[test]
    fn test_get_or_create_keeps_existing_record() {
        let db = migrated_db();
        let stored = ValidatorRecord {
            idx: 1,
            balance: 32_000_136_946,
            missed_atts: 2,
            missed_atts_total: 3,
        };

        assert_eq!(db.get_or_create(stored).expect("created"), stored);
        assert_eq!(
            db.get_or_create(ValidatorRecord::new(1, 40_000_000_000))
                .expect("existing"),
            stored
        );
    }

    #[test]
    fn test_update_requires_existing_record() {
        let db = migrated_db();

        let err = db
            .update(ValidatorRecord::new(9, 32_000_000_000))
            .expect_err("unknown validator");
        assert!(matches!(err, StoreError::ValidatorNotFound(9)));
        assert_eq!(db.validator(9).expect("lookup"), None);
    }

    #[test]
    fn test_update_overwrites_counters() {
        let db = migrated_db();
        let created = db
            .get_or_create(ValidatorRecord::new(1, 34_000_136_946))
            .expect("created");

        let updated = created.observe_balance(32_000_136_946);
        db.update(updated).expect("updated");

        assert_eq!(db.validator(1).expect("lookup"), Some(updated));
        assert_eq!(db.validator(2).expect("lookup"), None);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let db = migrated_db();
        db.validators_table()
            .insert(5, ValidatorRecord::new(5, 1))
            .expect("insert");

        db.migrate().expect("second migration");

        assert_eq!(
            db.validator(5).expect("lookup"),
            Some(ValidatorRecord::new(5, 1))
        );
    }

    #[test]
    fn test_records_survive_reopen() {
        let data_dir = TempDir::new("posmoni_db_test").expect("temp dir");
        let record = ValidatorRecord {
            idx: 42,
            balance: 31_999_000_000,
            missed_atts: 1,
            missed_atts_total: 1,
        };

        {
            let db = MonitorDB::new(data_dir.path().to_path_buf()).expect("open database");
            db.migrate().expect("migration");
            db.get_or_create(record).expect("created");
        }

        let db = MonitorDB::new(data_dir.path().to_path_buf()).expect("reopen database");
        assert_eq!(db.validator(42).expect("lookup"), Some(record));
    }
}
