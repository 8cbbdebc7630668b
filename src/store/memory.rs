//! In-memory observation store with the same contract as the SQLite one.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};

use crate::domain::{Observation, ObservationQuery, UpdateRecord};
use crate::error::StoreError;
use crate::store::ObservationStore;

#[derive(Default)]
struct Inner {
    rows: Vec<Observation>,
    keys: HashSet<(String, NaiveDate)>,
    updates: Vec<UpdateRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ObservationStore for MemoryStore {
    fn insert(&self, rows: &[Observation]) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let mut inserted = 0;
        for row in rows {
            if inner.keys.insert((row.series_name.clone(), row.date)) {
                inner.rows.push(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn query(&self, query: &ObservationQuery) -> Result<Vec<Observation>, StoreError> {
        let inner = self.lock();
        let mut out: Vec<Observation> = inner.rows.iter().filter(|o| query.matches(o)).cloned().collect();
        out.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.series_name.cmp(&b.series_name)));
        Ok(out)
    }

    fn latest_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        Ok(self.lock().rows.iter().map(|o| o.date).max())
    }

    fn record_update(&self, records_added: usize, status: &str) -> Result<(), StoreError> {
        self.lock().updates.push(UpdateRecord {
            updated_at: Utc::now(),
            records_added,
            status: status.to_string(),
        });
        Ok(())
    }

    fn recent_updates(&self, limit: usize) -> Result<Vec<UpdateRecord>, StoreError> {
        Ok(self.lock().updates.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_deduplicates_on_series_and_date() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let row = Observation::classified("All banks reserves", date, 1.0);
        assert_eq!(store.insert(&[row.clone(), row.clone()]).unwrap(), 1);
        assert_eq!(store.insert(&[row]).unwrap(), 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest_date().unwrap(), Some(date));
    }
}
