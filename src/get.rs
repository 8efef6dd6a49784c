//! Summary retrieval from the command line.
//!
//! Backs the `rulesheet list`, `rulesheet get` and `rulesheet delete`
//! commands. Output goes to stdout; a missing id prints an error and exits
//! with status 1.

use anyhow::Result;
use chrono::Utc;

use rulesheet_core::models::SummaryRecord;
use rulesheet_core::store::SummaryStore;
use rulesheet_core::time::{long_date, time_ago};

use crate::config::Config;
use crate::db;
use crate::pages::filter_by_title;
use crate::sqlite_store::SqliteStore;

async fn open_store(config: &Config) -> Result<SqliteStore> {
    Ok(SqliteStore::new(db::connect(config).await?))
}

/// Fetch one summary, exiting with an error message when it does not exist.
async fn require(store: &SqliteStore, id: &str) -> Result<SummaryRecord> {
    match store.get(id).await? {
        Some(record) => Ok(record),
        None => {
            eprintln!("Error: summary not found: {}", id);
            std::process::exit(1);
        }
    }
}

/// `rulesheet list [--query]`: newest first, optionally filtered by title.
pub async fn run_list(config: &Config, query: Option<&str>) -> Result<()> {
    let store = open_store(config).await?;
    let records = store.list().await?;
    store.pool().close().await;

    let shown = filter_by_title(&records, query.unwrap_or(""));
    if shown.is_empty() {
        if records.is_empty() {
            println!("No summaries yet.");
        } else {
            println!("No matching summaries found.");
        }
        return Ok(());
    }

    let now = Utc::now();
    for record in shown {
        println!(
            "{}  {:<32}  {}",
            record.id,
            record.game_title,
            time_ago(record.created_at, now)
        );
    }
    Ok(())
}

/// `rulesheet get <id> [--raw]`.
pub async fn run_get(config: &Config, id: &str, raw: bool) -> Result<()> {
    let store = open_store(config).await?;
    let record = require(&store, id).await?;
    store.pool().close().await;

    if raw {
        print!("{}", record.markdown);
        if !record.markdown.ends_with('\n') {
            println!();
        }
        return Ok(());
    }

    println!("--- Summary ---");
    println!("id:         {}", record.id);
    println!("title:      {}", record.game_title);
    println!("files:      {}", record.original_filename);
    if let Some(ref link) = record.bgg_link {
        println!("bgg_link:   {}", link);
    }
    println!("created_at: {}", long_date(record.created_at));
    if let Some(ref owner) = record.created_by {
        println!(
            "created_by: {}",
            owner.name.as_deref().unwrap_or(&owner.uid)
        );
    }
    println!();
    println!("--- Markdown ---");
    println!("{}", record.markdown);

    Ok(())
}

/// `rulesheet delete <id>`.
pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let deleted = store.delete(id).await?;
    store.pool().close().await;

    if !deleted {
        eprintln!("Error: summary not found: {}", id);
        std::process::exit(1);
    }
    tracing::info!(id = %id, "summary deleted");
    println!("Deleted {}", id);
    Ok(())
}
