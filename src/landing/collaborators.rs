use async_trait::async_trait;

use crate::{
    error::PersistenceError,
    models::waitlist_models::{LocalWaitlistRecord, WaitlistEntry},
};

/// Remote durable store for waitlist entries. Any failure is treated the
/// same way by the caller, so implementations need not classify errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists the entry and returns the identifier the store assigned.
    async fn add_waitlist_entry(&self, entry: &WaitlistEntry) -> Result<String, PersistenceError>;
}

/// Local fallback store holding an ordered list of records under a key,
/// newest first.
#[cfg_attr(test, mockall::automock)]
pub trait LocalStore: Send + Sync {
    fn prepend_waitlist_record(&self, key: &str, record: &LocalWaitlistRecord) -> Result<(), PersistenceError>;

    fn waitlist_records(&self, key: &str) -> Result<Vec<LocalWaitlistRecord>, PersistenceError>;
}
