use crate::core::query::StoreQuery;
use crate::domain::model::{AddressEntries, ImportRow, PostalRecord, RecordFields, RecordSummary};
use crate::utils::error::{LookupError, Result};
use async_trait::async_trait;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// First record stored under `code`, if any.
    async fn find_by_code(&self, code: &str) -> Result<Option<PostalRecord>>;

    async fn count(&self, query: &StoreQuery) -> Result<u64>;

    /// Matching records sorted ascending by code.
    async fn list(&self, query: &StoreQuery, offset: u64, limit: u64) -> Result<Vec<RecordSummary>>;

    /// Replaces the mutable fields of the record keyed by `fields.cp`, creating it if absent.
    async fn upsert(&self, fields: &RecordFields) -> Result<()>;

    /// Inserts every row as a new record in one operation; returns the inserted count.
    async fn insert_many(&self, rows: &[ImportRow]) -> Result<u64>;
}

#[async_trait]
pub trait PostalLookup: Send + Sync {
    async fn lookup(&self, code: &str) -> std::result::Result<AddressEntries, LookupError>;
}
