//! Observation store.
//!
//! The store is the only shared mutable state in the system. Its contract:
//!
//! - `insert` is append-only and ignores rows whose `(series_name, date)` is
//!   already present; a batch becomes visible to readers all at once
//! - `query` filters are optional and AND-combined; rows come back ordered by
//!   `(date, series_name)`
//! - `record_update` appends to the ingestion audit log
//!
//! Components receive a `&dyn ObservationStore` so tests can swap in
//! [`MemoryStore`].

use chrono::NaiveDate;

use crate::domain::{Observation, ObservationQuery, UpdateRecord};
use crate::error::StoreError;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait ObservationStore: Send + Sync {
    /// Insert rows, skipping duplicates. Returns the number of rows newly stored.
    fn insert(&self, rows: &[Observation]) -> Result<usize, StoreError>;

    fn query(&self, query: &ObservationQuery) -> Result<Vec<Observation>, StoreError>;

    fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError>;

    fn record_update(&self, records_added: usize, status: &str) -> Result<(), StoreError>;

    /// Most recent audit entries, newest first.
    fn recent_updates(&self, limit: usize) -> Result<Vec<UpdateRecord>, StoreError>;
}
