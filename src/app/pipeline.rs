//! One ingestion cycle: fetch -> parse -> deduplicate -> persist -> audit.
//!
//! Shared by the `download` and `demo` commands, which differ only in where
//! the archive bytes come from.

use tracing::{error, info, warn};

use crate::data::ArchiveFetcher;
use crate::domain::{IngestionResult, IngestionStatus};
use crate::error::IngestError;
use crate::io::archive::parse_archive;
use crate::store::ObservationStore;

const STATUS_SUCCESS: &str = "success";
const NO_DATA_DETAIL: &str = "no data found in archive";

/// Run a full ingestion cycle.
///
/// Never fails: every outcome, including fetch and parse errors, is turned
/// into an [`IngestionResult`] and one update record in the store.
/// `records_added` on success is the number of rows handed to the store;
/// rows already present are ignored there.
pub fn run_ingestion(fetcher: &dyn ArchiveFetcher, store: &dyn ObservationStore) -> IngestionResult {
    info!(source = fetcher.source(), "Starting ingestion");

    match ingest(fetcher, store) {
        Ok((0, documents)) => {
            warn!(documents, "Archive contained no observations");
            audit(store, 0, &format!("error: {NO_DATA_DETAIL}"));
            IngestionResult {
                status: IngestionStatus::Error,
                records_added: 0,
                documents_examined: documents,
                message: "No data found in archive".to_string(),
            }
        }
        Ok((attempted, documents)) => {
            audit(store, attempted, STATUS_SUCCESS);
            info!(records = attempted, documents, "Ingestion complete");
            IngestionResult {
                status: IngestionStatus::Success,
                records_added: attempted,
                documents_examined: documents,
                message: format!("Successfully loaded {attempted} records"),
            }
        }
        Err(err) => {
            error!(error = %err, "Ingestion failed");
            audit(store, 0, &format!("error: {err}"));
            IngestionResult {
                status: IngestionStatus::Error,
                records_added: 0,
                documents_examined: 0,
                message: format!("Error loading data: {err}"),
            }
        }
    }
}

/// Returns `(rows attempted, documents examined)`.
fn ingest(fetcher: &dyn ArchiveFetcher, store: &dyn ObservationStore) -> Result<(usize, usize), IngestError> {
    let bytes = fetcher.fetch()?;
    let parsed = parse_archive(&bytes)?;
    if parsed.observations.is_empty() {
        return Ok((0, parsed.documents_examined));
    }

    let inserted = store.insert(&parsed.observations)?;
    info!(
        attempted = parsed.observations.len(),
        inserted,
        skipped_documents = parsed.documents_failed,
        "Rows stored"
    );
    Ok((parsed.observations.len(), parsed.documents_examined))
}

/// A failed audit write is logged and otherwise ignored.
fn audit(store: &dyn ObservationStore, records_added: usize, status: &str) {
    if let Err(err) = store.record_update(records_added, status) {
        error!(error = %err, status, "Failed to record update");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryArchive;
    use crate::data::synthetic::{SyntheticConfig, build_release, generate_series, zip_documents};
    use crate::domain::ObservationQuery;
    use crate::store::MemoryStore;

    struct FailingFetcher;

    impl ArchiveFetcher for FailingFetcher {
        fn source(&self) -> &str {
            "unreachable"
        }

        fn fetch(&self) -> Result<Vec<u8>, IngestError> {
            Err(IngestError::Timeout(60))
        }
    }

    fn small_release() -> Vec<u8> {
        let config = SyntheticConfig { weeks: 20, ..SyntheticConfig::default() };
        build_release(&generate_series(&config).unwrap()).unwrap()
    }

    #[test]
    fn reingesting_the_same_archive_is_idempotent() {
        let store = MemoryStore::new();
        let archive = InMemoryArchive::new("demo", small_release());

        let first = run_ingestion(&archive, &store);
        assert!(first.is_success(), "{}", first.message);
        let count = store.len();
        assert_eq!(first.records_added, count);

        let second = run_ingestion(&archive, &store);
        assert!(second.is_success());
        assert_eq!(second.records_added, first.records_added);
        assert_eq!(store.len(), count);

        let updates = store.recent_updates(10).unwrap();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.status == "success"));
    }

    #[test]
    fn fetch_failure_becomes_error_result_and_audit_entry() {
        let store = MemoryStore::new();
        let result = run_ingestion(&FailingFetcher, &store);

        assert_eq!(result.status, IngestionStatus::Error);
        assert_eq!(result.records_added, 0);
        assert!(result.message.starts_with("Error loading data:"), "{}", result.message);

        let updates = store.recent_updates(10).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].records_added, 0);
        assert!(updates[0].status.starts_with("error: "));
        assert!(store.query(&ObservationQuery::all()).unwrap().is_empty());
    }

    #[test]
    fn archive_without_data_documents_is_an_error() {
        let store = MemoryStore::new();
        let bytes = zip_documents(&[("README.txt", "nothing here".to_string())]).unwrap();
        let result = run_ingestion(&InMemoryArchive::new("empty", bytes), &store);

        assert!(!result.is_success());
        assert_eq!(result.records_added, 0);
        assert_eq!(store.recent_updates(1).unwrap()[0].status, "error: no data found in archive");
    }

    #[test]
    fn garbage_bytes_are_absorbed() {
        let store = MemoryStore::new();
        let result = run_ingestion(&InMemoryArchive::new("junk", b"not a zip".to_vec()), &store);
        assert!(!result.is_success());
        assert!(store.is_empty());
    }
}
