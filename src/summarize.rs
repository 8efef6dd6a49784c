//! `rulesheet summarize` and `rulesheet duplicates`.
//!
//! `summarize` runs the same upload pipeline as `POST /upload` on local
//! PDF files, printing duplicate warnings first. `duplicates` runs the
//! advisory lookups on their own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use rulesheet_core::duplicates::{self, LinkCheck, PendingUploads};
use rulesheet_core::models::SummaryRecord;
use rulesheet_core::store::SummaryStore;

use crate::config::Config;
use crate::db;
use crate::extract::{PdfExtractor, MIME_PDF};
use crate::generate::{Generator, OpenAiGenerator};
use crate::migrate;
use crate::sqlite_store::SqliteStore;
use crate::upload::{Summarizer, UploadFile, UploadLimits, UploadRequest};

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Content type for a local file, by extension.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => MIME_PDF,
        _ => "application/octet-stream",
    }
}

fn print_matches(heading: &str, matches: &[SummaryRecord]) {
    if matches.is_empty() {
        return;
    }
    println!("{}", heading);
    for record in matches {
        println!("  {}  {}", record.id, record.game_title);
    }
}

/// Queue `paths`, look each name up, and print any warnings.
async fn check_files(
    store: &dyn SummaryStore,
    paths: &[PathBuf],
) -> Result<PendingUploads<PathBuf>> {
    let mut pending = PendingUploads::new();
    for path in paths {
        pending
            .add_and_check(store, display_name(path), path.clone())
            .await?;
    }
    for warning in pending.warnings() {
        if let Some(first) = warning.first() {
            println!(
                "A summary already exists for: {} ({}  {})",
                warning.filename, first.id, first.game_title
            );
        }
    }
    Ok(pending)
}

async fn check_link(store: &dyn SummaryStore, link: &str) -> Result<()> {
    let mut check = LinkCheck::new();
    check.set_input(link);
    let matches = check.check(store).await?;
    print_matches("A summary with this BGG link already exists:", matches);
    Ok(())
}

/// `rulesheet summarize <pdf>... [--bgg-link]`.
pub async fn run_summarize(
    config: &Config,
    paths: &[PathBuf],
    bgg_link: Option<String>,
) -> Result<()> {
    if paths.is_empty() {
        bail!("No file given.");
    }
    let generator: Arc<dyn Generator> = Arc::new(OpenAiGenerator::new(&config.generation)?);

    let pool = db::connect(config).await?;
    migrate::migrate_pool(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool));

    let pending = check_files(store.as_ref(), paths).await?;
    if let Some(ref link) = bgg_link {
        check_link(store.as_ref(), link).await?;
    }
    if !pending.warnings().is_empty() {
        println!("Creating a new summary anyway.");
    }

    let mut files = Vec::with_capacity(pending.len());
    for (filename, path) in pending.into_files() {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(UploadFile {
            filename,
            content_type: content_type_for(&path).to_string(),
            bytes,
        });
    }

    println!(
        "Summarizing {} file(s) with {}...",
        files.len(),
        generator.model_name()
    );

    let summarizer = Summarizer {
        store: store.clone(),
        extractor: Arc::new(PdfExtractor),
        generator,
        limits: UploadLimits::from_config(config),
    };
    let result = summarizer
        .create_summary(UploadRequest {
            files,
            bgg_link,
            identity: None,
        })
        .await;
    store.pool().close().await;

    let id = result.map_err(|e| {
        tracing::error!(error = %e, "summarize failed");
        anyhow!(e.user_message())
    })?;
    println!("Created summary {}", id);
    Ok(())
}

/// `rulesheet duplicates [--filename] [--link]`.
pub async fn run_duplicates(
    config: &Config,
    filename: Option<&str>,
    link: Option<&str>,
) -> Result<()> {
    if filename.is_none() && link.is_none() {
        bail!("Pass --filename and/or --link.");
    }

    let store = SqliteStore::new(db::connect(config).await?);
    let mut found_any = false;

    if let Some(name) = filename {
        let matches = duplicates::find_by_filename(&store, name).await?;
        found_any |= !matches.is_empty();
        print_matches(&format!("Summaries built from {}:", name), &matches);
    }
    if let Some(link) = link {
        let matches = duplicates::find_by_external_link(&store, link).await?;
        found_any |= !matches.is_empty();
        print_matches(
            &format!("Summaries linked to {}:", link.trim()),
            &matches,
        );
    }
    store.pool().close().await;

    if !found_any {
        println!("No duplicates found.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rulesheet_core::models::NewSummary;
    use rulesheet_core::store::InMemoryStore;

    #[test]
    fn content_type_by_extension() {
        assert_eq!(content_type_for(Path::new("a/Catan.PDF")), MIME_PDF);
        assert_eq!(
            content_type_for(Path::new("notes.txt")),
            "application/octet-stream"
        );
        assert_eq!(display_name(Path::new("/tmp/rules/Azul.pdf")), "Azul.pdf");
    }

    #[tokio::test]
    async fn check_files_warns_per_existing_name() {
        let store = InMemoryStore::new();
        store
            .insert(NewSummary {
                id: "c".into(),
                game_title: "Catan".into(),
                source_filenames: vec!["Catan.pdf".into(), "Seafarers.pdf".into()],
                markdown: "## Catan".into(),
                bgg_link: None,
                created_by: None,
            })
            .await
            .unwrap();

        let pending = check_files(
            &store,
            &[PathBuf::from("x/catan.pdf"), PathBuf::from("y/Azul.pdf")],
        )
        .await
        .unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending.warnings().len(), 1);
        assert_eq!(pending.warnings()[0].filename, "catan.pdf");
        assert_eq!(pending.warnings()[0].first().unwrap().id, "c");
    }
}
