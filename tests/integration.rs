use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use rulesheet::db;
use rulesheet::migrate;
use rulesheet::sqlite_store::SqliteStore;
use rulesheet_core::models::{CreatedBy, NewSummary};
use rulesheet_core::store::SummaryStore;

const CATAN_LINK: &str = "https://boardgamegeek.com/boardgame/13/catan";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/rulesheet.sqlite"

[server]
bind = "127.0.0.1:0"
max_upload_mb = 5

[generation]
model = "gpt-5"
"#,
        root.display()
    );

    let config_path = config_dir.join("rulesheet.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_rulesheet(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let root = config_path.parent().unwrap().parent().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_rulesheet"))
        .current_dir(root)
        .env_remove("OPENAI_API_KEY")
        .env_remove("OPENAI_MODEL")
        .env_remove("MAX_FILE_SIZE_MB")
        .env_remove("UPLOAD_PASSWORD_SHA256")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .expect("failed to run rulesheet binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

async fn seed(config_path: &Path) {
    let root = config_path.parent().unwrap().parent().unwrap();
    let pool = db::connect_path(&root.join("data/rulesheet.sqlite"))
        .await
        .unwrap();
    migrate::migrate_pool(&pool).await.unwrap();
    let store = SqliteStore::new(pool);
    store
        .insert(NewSummary {
            id: "catan".to_string(),
            game_title: "Catan".to_string(),
            source_filenames: vec!["Catan.pdf".to_string(), "Seafarers.pdf".to_string()],
            markdown: "## Catan (1995)\n\n* **Goal:** first to 10 points.\n".to_string(),
            bgg_link: Some(CATAN_LINK.to_string()),
            created_by: Some(CreatedBy {
                uid: "u1".to_string(),
                name: Some("Ada".to_string()),
                email: None,
            }),
        })
        .await
        .unwrap();
    store
        .insert(NewSummary {
            id: "azul".to_string(),
            game_title: "Azul".to_string(),
            source_filenames: vec!["Azul.pdf".to_string()],
            markdown: "## Azul (2017)".to_string(),
            bgg_link: None,
            created_by: None,
        })
        .await
        .unwrap();
    store.pool().close().await;
}

#[test]
fn test_init_is_idempotent() {
    let (_tmp, config) = setup_test_env();

    let (stdout, stderr, ok) = run_rulesheet(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully."));

    let (_, stderr, ok) = run_rulesheet(&config, &["init"]);
    assert!(ok, "second init failed: {}", stderr);
}

#[test]
fn test_list_empty() {
    let (_tmp, config) = setup_test_env();
    run_rulesheet(&config, &["init"]);

    let (stdout, stderr, ok) = run_rulesheet(&config, &["list"]);
    assert!(ok, "list failed: {}", stderr);
    assert!(stdout.contains("No summaries yet."));
}

#[tokio::test]
async fn test_list_get_and_filter() {
    let (_tmp, config) = setup_test_env();
    seed(&config).await;

    let (stdout, _, ok) = run_rulesheet(&config, &["list"]);
    assert!(ok);
    assert!(stdout.contains("catan"));
    assert!(stdout.contains("Azul"));

    let (stdout, _, ok) = run_rulesheet(&config, &["list", "--query", "CAT"]);
    assert!(ok);
    assert!(stdout.contains("Catan"));
    assert!(!stdout.contains("Azul"));

    let (stdout, _, ok) = run_rulesheet(&config, &["list", "--query", "Gloomhaven"]);
    assert!(ok);
    assert!(stdout.contains("No matching summaries found."));

    let (stdout, _, ok) = run_rulesheet(&config, &["get", "catan"]);
    assert!(ok);
    assert!(stdout.contains("title:      Catan"));
    assert!(stdout.contains("files:      Catan.pdf, Seafarers.pdf"));
    assert!(stdout.contains("created_by: Ada"));

    let (stdout, _, ok) = run_rulesheet(&config, &["get", "catan", "--raw"]);
    assert!(ok);
    assert!(stdout.starts_with("## Catan (1995)"));
    assert!(!stdout.contains("title:"));
}

#[test]
fn test_get_unknown_id_fails() {
    let (_tmp, config) = setup_test_env();
    run_rulesheet(&config, &["init"]);

    let (_, stderr, ok) = run_rulesheet(&config, &["get", "nope"]);
    assert!(!ok);
    assert!(stderr.contains("summary not found"));
}

#[tokio::test]
async fn test_duplicates_by_filename_and_link() {
    let (_tmp, config) = setup_test_env();
    seed(&config).await;

    let (stdout, _, ok) = run_rulesheet(&config, &["duplicates", "--filename", "seafarers.PDF"]);
    assert!(ok);
    assert!(stdout.contains("catan"));
    assert!(!stdout.contains("azul"));

    let (stdout, _, ok) = run_rulesheet(
        &config,
        &["duplicates", "--link", &format!("  {}  ", CATAN_LINK)],
    );
    assert!(ok);
    assert!(stdout.contains("catan"));

    let (stdout, _, ok) = run_rulesheet(&config, &["duplicates", "--filename", "Seafarers"]);
    assert!(ok);
    assert!(stdout.contains("No duplicates found."));

    let (_, _, ok) = run_rulesheet(&config, &["duplicates"]);
    assert!(!ok);
}

#[tokio::test]
async fn test_delete() {
    let (_tmp, config) = setup_test_env();
    seed(&config).await;

    let (stdout, _, ok) = run_rulesheet(&config, &["delete", "azul"]);
    assert!(ok);
    assert!(stdout.contains("Deleted azul"));

    let (_, _, ok) = run_rulesheet(&config, &["get", "azul"]);
    assert!(!ok);

    let (_, stderr, ok) = run_rulesheet(&config, &["delete", "azul"]);
    assert!(!ok);
    assert!(stderr.contains("summary not found"));
}

#[test]
fn test_summarize_requires_api_key() {
    let (tmp, config) = setup_test_env();
    let pdf = tmp.path().join("Catan.pdf");
    fs::write(&pdf, b"%PDF-1.4\n").unwrap();

    let (_, stderr, ok) = run_rulesheet(&config, &["summarize", pdf.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("OPENAI_API_KEY"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("config").join("absent.toml");

    let (stdout, stderr, ok) = run_rulesheet(&missing, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully."));
    assert!(tmp.path().join("data/rulesheet.sqlite").exists());
}
