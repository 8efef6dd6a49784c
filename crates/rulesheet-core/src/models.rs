//! Core data models used throughout Rulesheet.
//!
//! A [`SummaryRecord`] is the single persisted entity: one generated rules
//! summary, built from one or more uploaded rulebooks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator used when several source filenames are stored in one record.
pub const FILENAME_SEPARATOR: &str = ", ";

/// Identity snapshot captured when a record is created.
///
/// Used later to decide who may edit or delete the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBy {
    pub uid: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A persisted rules summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub id: String,
    pub game_title: String,
    /// Source filenames joined for display. Not parsed back.
    pub original_filename: String,
    /// Source filenames, one entry per uploaded file.
    #[serde(default)]
    pub source_filenames: Vec<String>,
    pub markdown: String,
    pub bgg_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<CreatedBy>,
}

impl SummaryRecord {
    /// Source filenames, in upload order.
    ///
    /// Records written before the list was kept only have the display join;
    /// for those the join is split on [`FILENAME_SEPARATOR`].
    pub fn filenames(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        if self.source_filenames.is_empty() {
            Box::new(
                self.original_filename
                    .split(FILENAME_SEPARATOR)
                    .map(str::trim)
                    .filter(|s| !s.is_empty()),
            )
        } else {
            Box::new(self.source_filenames.iter().map(String::as_str))
        }
    }

    /// Filename offered when the markdown is downloaded.
    pub fn download_name(&self) -> String {
        format!("{} - Rules Summary.md", self.game_title)
    }
}

/// A record about to be persisted. The store assigns `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSummary {
    pub id: String,
    pub game_title: String,
    pub source_filenames: Vec<String>,
    pub markdown: String,
    pub bgg_link: Option<String>,
    pub created_by: Option<CreatedBy>,
}

impl NewSummary {
    /// Attach the persistence timestamp, producing the stored record.
    pub fn into_record(self, created_at: DateTime<Utc>) -> SummaryRecord {
        SummaryRecord {
            id: self.id,
            game_title: self.game_title,
            original_filename: join_filenames(&self.source_filenames),
            source_filenames: self.source_filenames,
            markdown: self.markdown,
            bgg_link: self.bgg_link,
            created_at,
            created_by: self.created_by,
        }
    }
}

/// In-place edit applied by an authorized editor. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryPatch {
    pub game_title: Option<String>,
    pub markdown: Option<String>,
    /// `Some(None)` clears the link.
    pub bgg_link: Option<Option<String>>,
}

impl SummaryPatch {
    pub fn is_empty(&self) -> bool {
        self.game_title.is_none() && self.markdown.is_none() && self.bgg_link.is_none()
    }

    pub fn apply(&self, record: &mut SummaryRecord) {
        if let Some(ref title) = self.game_title {
            record.game_title = title.clone();
        }
        if let Some(ref markdown) = self.markdown {
            record.markdown = markdown.clone();
        }
        if let Some(ref link) = self.bgg_link {
            record.bgg_link = link.clone();
        }
    }
}

/// Generate a fresh record id.
pub fn new_summary_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Join source filenames the way they are stored on a record.
pub fn join_filenames<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(FILENAME_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(filenames: &[&str]) -> SummaryRecord {
        NewSummary {
            id: "abc".to_string(),
            game_title: "Catan".to_string(),
            source_filenames: filenames.iter().map(|f| f.to_string()).collect(),
            markdown: "## Catan".to_string(),
            bgg_link: None,
            created_by: None,
        }
        .into_record(Utc::now())
    }

    #[test]
    fn display_join_and_list_are_both_kept() {
        let r = record(&["Catan, 5th Edition.pdf", "Seafarers.pdf"]);
        assert_eq!(r.original_filename, "Catan, 5th Edition.pdf, Seafarers.pdf");
        let names: Vec<&str> = r.filenames().collect();
        assert_eq!(names, vec!["Catan, 5th Edition.pdf", "Seafarers.pdf"]);
    }

    #[test]
    fn legacy_records_fall_back_to_the_join() {
        let mut r = record(&[]);
        r.original_filename = "Catan.pdf, Seafarers.pdf".to_string();
        let names: Vec<&str> = r.filenames().collect();
        assert_eq!(names, vec!["Catan.pdf", "Seafarers.pdf"]);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_summary_id(), new_summary_id());
    }

    #[test]
    fn patch_overwrites_only_given_fields() {
        let mut r = record(&["Catan.pdf"]);
        r.bgg_link = Some("https://boardgamegeek.com/boardgame/13".to_string());
        let patch = SummaryPatch {
            markdown: Some("## Catan\nNew".to_string()),
            bgg_link: Some(None),
            ..Default::default()
        };
        patch.apply(&mut r);
        assert_eq!(r.game_title, "Catan");
        assert_eq!(r.markdown, "## Catan\nNew");
        assert_eq!(r.bgg_link, None);
    }

    #[test]
    fn download_name_uses_title() {
        assert_eq!(record(&["x.pdf"]).download_name(), "Catan - Rules Summary.md");
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(record(&["Catan.pdf"])).unwrap();
        assert!(json.get("gameTitle").is_some());
        assert!(json.get("originalFilename").is_some());
        assert_eq!(json["sourceFilenames"][0], "Catan.pdf");
    }
}
