//! Storage abstraction for Rulesheet.
//!
//! The [`SummaryStore`] trait is the persistent document store capability:
//! records keyed by id, with the handful of queries the application needs.
//! The SQLite backend lives in the `rulesheet` crate; [`memory`] provides an
//! in-memory implementation for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

pub use memory::InMemoryStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{NewSummary, SummaryPatch, SummaryRecord};

/// Abstract storage backend for summary records.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](SummaryStore::insert) | Create a record, assigning `created_at` |
/// | [`get`](SummaryStore::get) | Lookup by id |
/// | [`list`](SummaryStore::list) | All records, newest first |
/// | [`find_by_filename`](SummaryStore::find_by_filename) | Records built from a given source file |
/// | [`find_by_link`](SummaryStore::find_by_link) | Records with a given external link |
/// | [`update`](SummaryStore::update) | Overwrite title, markdown, or link |
/// | [`delete`](SummaryStore::delete) | Remove a record |
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Persist a new record in a single write. The store assigns the
    /// creation timestamp and returns the stored record.
    async fn insert(&self, summary: NewSummary) -> Result<SummaryRecord>;

    async fn get(&self, id: &str) -> Result<Option<SummaryRecord>>;

    /// All records ordered by creation time, newest first.
    async fn list(&self) -> Result<Vec<SummaryRecord>>;

    /// Records whose stored filename list contains `name`, compared with
    /// [`filename_matches`].
    async fn find_by_filename(&self, name: &str) -> Result<Vec<SummaryRecord>>;

    /// Records whose external link equals `link` exactly.
    async fn find_by_link(&self, link: &str) -> Result<Vec<SummaryRecord>>;

    /// Apply `patch` to record `id`. Returns `false` if there is no such record.
    async fn update(&self, id: &str, patch: &SummaryPatch) -> Result<bool>;

    /// Delete record `id`. Returns `false` if there is no such record.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Whether `record` was built from a file called `name`.
///
/// Each source filename is compared whole, ignoring surrounding whitespace
/// and ASCII/Unicode case. Commas inside a filename are part of the name.
/// Every backend uses this rule.
pub fn filename_matches(record: &SummaryRecord, name: &str) -> bool {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return false;
    }
    record.filenames().any(|s| s.trim().to_lowercase() == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn built_from(names: &[&str]) -> SummaryRecord {
        NewSummary {
            id: "r".to_string(),
            game_title: "Catan".to_string(),
            source_filenames: names.iter().map(|n| n.to_string()).collect(),
            markdown: "## Catan".to_string(),
            bgg_link: None,
            created_by: None,
        }
        .into_record(Utc::now())
    }

    #[test]
    fn filename_match_is_whole_entry_and_case_insensitive() {
        assert!(filename_matches(&built_from(&["Catan.pdf"]), "Catan.pdf"));
        assert!(filename_matches(&built_from(&["Catan.pdf"]), "catan.PDF"));
        assert!(filename_matches(
            &built_from(&["Seafarers.pdf", "Catan.pdf"]),
            "Catan.pdf"
        ));
        assert!(!filename_matches(&built_from(&["Catan Junior.pdf"]), "Catan.pdf"));
        assert!(!filename_matches(&built_from(&["Catan.pdf"]), ""));
    }

    #[test]
    fn commas_inside_a_filename_do_not_split_it() {
        let record = built_from(&["Catan, 5th Edition.pdf"]);
        assert!(filename_matches(&record, "Catan, 5th Edition.pdf"));
        assert!(!filename_matches(&record, "Catan"));
        assert!(!filename_matches(&record, "5th Edition.pdf"));
    }
}
