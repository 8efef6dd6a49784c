//! Advisory duplicate detection for new uploads.
//!
//! Two independent checks warn (never block) when a summary may already
//! exist:
//!
//! - **By filename**: each file added to the pending upload set is looked up
//!   once. Warnings are keyed by filename, so removing the file removes its
//!   warning.
//! - **By external link**: the link field is looked up when it loses focus,
//!   and the warning is cleared when the field is emptied.
//!
//! Lookups are plain reads that may finish after the user has moved on.
//! Both checks split a lookup into a ticket and an `apply` step, and drop
//! results whose ticket no longer matches the current input.

use anyhow::Result;

use crate::models::SummaryRecord;
use crate::store::SummaryStore;

/// Records built from a file called `name`.
pub async fn find_by_filename(store: &dyn SummaryStore, name: &str) -> Result<Vec<SummaryRecord>> {
    if name.trim().is_empty() {
        return Ok(Vec::new());
    }
    store.find_by_filename(name).await
}

/// Records whose external link equals the trimmed `link`. Empty input yields
/// no matches.
pub async fn find_by_external_link(
    store: &dyn SummaryStore,
    link: &str,
) -> Result<Vec<SummaryRecord>> {
    let trimmed = link.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    store.find_by_link(trimmed).await
}

/// Existing records sharing a pending file's name.
#[derive(Debug, Clone, PartialEq)]
pub struct FilenameWarning {
    pub filename: String,
    pub summaries: Vec<SummaryRecord>,
}

impl FilenameWarning {
    /// Record shown as the representative duplicate.
    pub fn first(&self) -> Option<&SummaryRecord> {
        self.summaries.first()
    }
}

/// Ticket for an in-flight filename lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameLookup {
    pub filename: String,
}

/// The set of files queued for one upload, plus their duplicate warnings.
#[derive(Debug, Clone)]
pub struct PendingUploads<F> {
    files: Vec<(String, F)>,
    warnings: Vec<FilenameWarning>,
}

impl<F> Default for PendingUploads<F> {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl<F> PendingUploads<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(n, _)| n.as_str())
    }

    pub fn files(&self) -> impl Iterator<Item = &F> {
        self.files.iter().map(|(_, f)| f)
    }

    pub fn warnings(&self) -> &[FilenameWarning] {
        &self.warnings
    }

    /// Queue a file and return the lookup to run for it.
    pub fn add(&mut self, filename: impl Into<String>, file: F) -> FilenameLookup {
        let filename = filename.into();
        self.files.push((filename.clone(), file));
        FilenameLookup { filename }
    }

    /// Apply lookup results. Results for a file that has since been removed
    /// are discarded; an empty result adds no warning. Returns whether the
    /// results were applied.
    pub fn apply(&mut self, lookup: FilenameLookup, summaries: Vec<SummaryRecord>) -> bool {
        if !self.filenames().any(|n| same_name(n, &lookup.filename)) {
            return false;
        }
        self.warnings
            .retain(|w| !same_name(&w.filename, &lookup.filename));
        if !summaries.is_empty() {
            self.warnings.push(FilenameWarning {
                filename: lookup.filename,
                summaries,
            });
        }
        true
    }

    /// Queue a file and run its duplicate lookup immediately.
    pub async fn add_and_check(
        &mut self,
        store: &dyn SummaryStore,
        filename: impl Into<String>,
        file: F,
    ) -> Result<()> {
        let lookup = self.add(filename, file);
        let found = find_by_filename(store, &lookup.filename).await?;
        self.apply(lookup, found);
        Ok(())
    }

    /// Remove the file at `index`, dropping warnings for names no longer pending.
    pub fn remove(&mut self, index: usize) -> Option<F> {
        if index >= self.files.len() {
            return None;
        }
        let (_, file) = self.files.remove(index);
        let remaining: Vec<String> = self.files.iter().map(|(n, _)| n.to_lowercase()).collect();
        self.warnings
            .retain(|w| remaining.contains(&w.filename.to_lowercase()));
        Some(file)
    }

    /// Take the queued files, in the order they were added.
    pub fn into_files(self) -> Vec<(String, F)> {
        self.files
    }
}

/// Ticket for an in-flight link lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLookup {
    seq: u64,
    pub link: String,
}

/// State of the external-link field and its duplicate warning.
#[derive(Debug, Clone, Default)]
pub struct LinkCheck {
    input: String,
    seq: u64,
    matches: Vec<SummaryRecord>,
}

impl LinkCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn matches(&self) -> &[SummaryRecord] {
        &self.matches
    }

    /// The field value changed. Any in-flight lookup becomes stale, and an
    /// emptied field clears the warning.
    pub fn set_input(&mut self, value: &str) {
        if self.input != value {
            self.input = value.to_string();
            self.seq += 1;
        }
        if self.input.trim().is_empty() {
            self.matches.clear();
        }
    }

    /// The field lost focus. Returns the lookup to run, or `None` (after
    /// clearing the warning) when the field is empty.
    pub fn begin(&mut self) -> Option<LinkLookup> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            self.matches.clear();
            return None;
        }
        Some(LinkLookup {
            seq: self.seq,
            link: trimmed.to_string(),
        })
    }

    /// Apply lookup results unless the field changed since the lookup began.
    pub fn apply(&mut self, lookup: LinkLookup, matches: Vec<SummaryRecord>) -> bool {
        if lookup.seq != self.seq || lookup.link != self.input.trim() {
            return false;
        }
        self.matches = matches;
        true
    }

    /// Run the blur-time check against `store`.
    pub async fn check(&mut self, store: &dyn SummaryStore) -> Result<&[SummaryRecord]> {
        if let Some(lookup) = self.begin() {
            let found = find_by_external_link(store, &lookup.link).await?;
            self.apply(lookup, found);
        }
        Ok(&self.matches)
    }
}
