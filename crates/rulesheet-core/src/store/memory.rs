//! In-memory [`SummaryStore`] implementation for testing.
//!
//! Uses a `Vec` behind `std::sync::RwLock`. Insertion order doubles as the
//! tie-breaker when two records share a timestamp.

use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{NewSummary, SummaryPatch, SummaryRecord};

use super::{filename_matches, SummaryStore};

/// In-memory store for tests and offline tooling.
pub struct InMemoryStore {
    records: RwLock<Vec<SummaryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Seed a store with already-persisted records (timestamps kept).
    pub fn with_records(records: Vec<SummaryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl SummaryStore for InMemoryStore {
    async fn insert(&self, summary: NewSummary) -> Result<SummaryRecord> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.iter().any(|r| r.id == summary.id) {
            bail!("summary id already exists: {}", summary.id);
        }
        let record = summary.into_record(Utc::now());
        records.push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<SummaryRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<SummaryRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut out: Vec<(usize, SummaryRecord)> =
            records.iter().cloned().enumerate().collect();
        out.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));
        Ok(out.into_iter().map(|(_, r)| r).collect())
    }

    async fn find_by_filename(&self, name: &str) -> Result<Vec<SummaryRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| filename_matches(r, name))
            .collect())
    }

    async fn find_by_link(&self, link: &str) -> Result<Vec<SummaryRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.bgg_link.as_deref() == Some(link))
            .collect())
    }

    async fn update(&self, id: &str, patch: &SummaryPatch) -> Result<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                patch.apply(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_summary(id: &str, filenames: &[&str], link: Option<&str>) -> NewSummary {
        NewSummary {
            id: id.to_string(),
            game_title: id.to_uppercase(),
            source_filenames: filenames.iter().map(|f| f.to_string()).collect(),
            markdown: format!("## {}", id),
            bgg_link: link.map(str::to_string),
            created_by: None,
        }
    }

    #[tokio::test]
    async fn insert_then_get() {
        let store = InMemoryStore::new();
        let rec = store
            .insert(new_summary("catan", &["Catan.pdf"], None))
            .await
            .unwrap();
        assert_eq!(rec.id, "catan");
        let got = store.get("catan").await.unwrap().unwrap();
        assert_eq!(got, rec);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = InMemoryStore::new();
        store.insert(new_summary("a", &["a.pdf"], None)).await.unwrap();
        assert!(store.insert(new_summary("a", &["b.pdf"], None)).await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = InMemoryStore::new();
        for id in ["first", "second", "third"] {
            store.insert(new_summary(id, &["x.pdf"], None)).await.unwrap();
        }
        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn finds_by_filename_and_link() {
        let store = InMemoryStore::new();
        store
            .insert(new_summary("catan", &["Catan.pdf", "Seafarers.pdf"], None))
            .await
            .unwrap();
        store
            .insert(new_summary(
                "azul",
                &["Azul.pdf"],
                Some("https://boardgamegeek.com/boardgame/230802/azul"),
            ))
            .await
            .unwrap();

        let hits = store.find_by_filename("seafarers.pdf").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "catan");

        let hits = store
            .find_by_link("https://boardgamegeek.com/boardgame/230802/azul")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "azul");
        assert!(store.find_by_link("https://example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filename_with_comma_is_matched_whole() {
        let store = InMemoryStore::new();
        store
            .insert(new_summary("catan5", &["Catan, 5th Edition.pdf"], None))
            .await
            .unwrap();

        let hits = store.find_by_filename("Catan, 5th Edition.pdf").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "catan5");
        assert!(store.find_by_filename("Catan").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete() {
        let store = InMemoryStore::new();
        store.insert(new_summary("a", &["a.pdf"], None)).await.unwrap();
        let patch = SummaryPatch {
            game_title: Some("Alpha".to_string()),
            ..Default::default()
        };
        assert!(store.update("a", &patch).await.unwrap());
        assert!(!store.update("b", &patch).await.unwrap());
        assert_eq!(store.get("a").await.unwrap().unwrap().game_title, "Alpha");

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert!(store.is_empty());
    }
}
