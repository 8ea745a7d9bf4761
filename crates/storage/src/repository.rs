use crate::{errors::StoreError, record::ValidatorRecord};

/// Storage of validator records keyed by validator index.
///
/// Implementations provide their own atomicity for `get_or_create`, callers do not lock.
pub trait Repository: Send + Sync {
    /// Returns the stored record for `record.idx`, storing `record` first if there is none.
    fn get_or_create(&self, record: ValidatorRecord) -> Result<ValidatorRecord, StoreError>;

    /// Overwrites the stored counters of `record.idx`.
    fn update(&self, record: ValidatorRecord) -> Result<(), StoreError>;

    fn validator(&self, idx: u64) -> Result<Option<ValidatorRecord>, StoreError>;

    /// Prepares the backing store. Called once before anything else.
    fn migrate(&self) -> Result<(), StoreError>;
}

/// Repository that stores nothing, for commands that never touch validator records.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRepository;

impl Repository for EmptyRepository {
    fn get_or_create(&self, record: ValidatorRecord) -> Result<ValidatorRecord, StoreError> {
        Ok(record)
    }

    fn update(&self, _record: ValidatorRecord) -> Result<(), StoreError> {
        Ok(())
    }

    fn validator(&self, _idx: u64) -> Result<Option<ValidatorRecord>, StoreError> {
        Ok(None)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
