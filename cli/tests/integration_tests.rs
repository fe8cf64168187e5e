use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("rowmap_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn path(&self) -> &PathBuf {
        &self.path
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

const ITEM_CATALOG: &str = r#"version: "1"
entities:
  - name: Item
    autoincrement: true
    columns:
      - { name: id, type: integer, primary_key: true }
      - { name: content, type: text }
      - { name: created_time, type: timestamp, indexed: true }
"#;

fn write_catalog(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write catalog");
    path
}

fn rowmap(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rowmap"))
        .args(args)
        .output()
        .expect("failed to run rowmap")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_reports_entities_and_fingerprint() {
    let dir = TempDir::new("check_ok");
    let catalog = write_catalog(&dir, "entities.yaml", ITEM_CATALOG);

    let output = rowmap(&["check", "--catalog", catalog.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("is valid: 1 entity."));
    assert!(out.contains("Item -> Item (3 columns, key 'id', autoincrement)"));
    let fingerprint = out
        .lines()
        .find_map(|l| l.strip_prefix("Fingerprint: "))
        .expect("fingerprint line");
    assert_eq!(fingerprint.len(), 64);
}

#[test]
fn check_json_output() {
    let dir = TempDir::new("check_json");
    let catalog = write_catalog(&dir, "entities.yaml", ITEM_CATALOG);

    let output = rowmap(&["check", "--catalog", catalog.to_str().unwrap(), "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["version"], "1");
    assert_eq!(summary["entities"][0]["table"], "Item");
    assert_eq!(summary["entities"][0]["columns"][2]["storage"], "INTEGER");
}

#[test]
fn check_lists_every_descriptor_error() {
    let dir = TempDir::new("check_invalid");
    let catalog = write_catalog(
        &dir,
        "broken.json",
        r#"{
            "version": "1",
            "entities": [{
                "name": "Broken",
                "autoincrement": true,
                "columns": [
                    {"name": "code", "type": "text", "primary_key": true},
                    {"name": "code", "type": "text"}
                ]
            }]
        }"#,
    );

    let output = rowmap(&["check", "--catalog", catalog.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("duplicate column: code"));
    assert!(err.contains("autoincrement requires an integer primary key"));
    assert!(err.contains("error: 1 invalid entity in catalog"));
}

#[test]
fn check_counts_several_invalid_entities() {
    let dir = TempDir::new("check_invalid_many");
    let catalog = write_catalog(
        &dir,
        "broken.json",
        r#"{
            "version": "1",
            "entities": [
                {"name": "First", "columns": [{"name": "a", "type": "text"}]},
                {"name": "Second", "columns": []}
            ]
        }"#,
    );

    let output = rowmap(&["check", "--catalog", catalog.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("error: 2 invalid entities in catalog"));
    assert!(!err.contains("entit(ies)"));
}

#[test]
fn check_missing_catalog_fails() {
    let dir = TempDir::new("check_missing");
    let output = rowmap(&[
        "check",
        "--catalog",
        dir.join("absent.yaml").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error: Failed to load catalog"));
}

#[test]
fn check_accepts_directory() {
    let dir = TempDir::new("check_dir");
    write_catalog(&dir, "a.yaml", ITEM_CATALOG);
    write_catalog(
        &dir,
        "b.json",
        r#"{"version": "1", "entities": [{"name": "Tag", "columns": [{"name": "name", "type": "text", "primary_key": true}]}]}"#,
    );

    let output = rowmap(&["check", "--catalog", dir.path().to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("is valid: 2 entities."));
}

// ---------------------------------------------------------------------------
// ddl
// ---------------------------------------------------------------------------

#[test]
fn ddl_prints_tables_and_indexes() {
    let dir = TempDir::new("ddl");
    let catalog = write_catalog(&dir, "entities.yml", ITEM_CATALOG);

    let output = rowmap(&["ddl", "--catalog", catalog.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains(r#""id" INTEGER PRIMARY KEY AUTOINCREMENT"#));
    assert!(out.contains(r#"CREATE INDEX IF NOT EXISTS "index_created_time_on_Item""#));
    assert_eq!(out.lines().count(), 2);
}

// ---------------------------------------------------------------------------
// migrate
// ---------------------------------------------------------------------------

#[test]
fn migrate_up_status_down() {
    let dir = TempDir::new("migrate_cycle");
    let catalog = write_catalog(&dir, "entities.yaml", ITEM_CATALOG);
    let db = dir.join("items.db");
    let catalog = catalog.to_str().unwrap();
    let db = db.to_str().unwrap();

    let output = rowmap(&["migrate", "status", "--db", db, "--catalog", catalog]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Tables exist: no"));
    assert!(stdout(&output).contains("Fingerprint: not recorded"));

    let output = rowmap(&["migrate", "up", "--db", db, "--catalog", catalog]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("1 table created"));

    let output = rowmap(&["migrate", "status", "--db", db, "--catalog", catalog]);
    let out = stdout(&output);
    assert!(out.contains("Tables exist: yes"));
    assert!(out.contains("Item (Item): 0 rows"));
    assert!(out.contains("Fingerprint: matches catalog"));

    let output = rowmap(&["migrate", "down", "--db", db, "--catalog", catalog]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = rowmap(&["migrate", "status", "--db", db, "--catalog", catalog]);
    assert!(stdout(&output).contains("Item (Item): missing"));
}

#[test]
fn migrate_status_detects_changed_catalog() {
    let dir = TempDir::new("migrate_drift");
    let original = write_catalog(&dir, "v1.yaml", ITEM_CATALOG);
    let changed = write_catalog(
        &dir,
        "v2.yaml",
        &ITEM_CATALOG.replace("{ name: content, type: text }", "{ name: content, type: text, unique: true }"),
    );
    let db = dir.join("items.db");
    let db = db.to_str().unwrap();

    let output = rowmap(&["migrate", "up", "--db", db, "--catalog", original.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = rowmap(&["migrate", "status", "--db", db, "--catalog", changed.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Fingerprint: differs from catalog"));
}

#[test]
fn migrate_refresh_empties_tables() {
    let dir = TempDir::new("migrate_refresh");
    let catalog = write_catalog(&dir, "entities.yaml", ITEM_CATALOG);
    let db_path = dir.join("items.db");
    let catalog = catalog.to_str().unwrap();
    let db = db_path.to_str().unwrap();

    let output = rowmap(&["migrate", "up", "--db", db, "--catalog", catalog]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute(
            "INSERT INTO \"Item\" (\"content\", \"created_time\") VALUES ('x', 0)",
            [],
        )
        .unwrap();
    }

    let output = rowmap(&["migrate", "status", "--db", db, "--catalog", catalog]);
    assert!(stdout(&output).contains("Item (Item): 1 row\n"));

    let output = rowmap(&["migrate", "refresh", "--db", db, "--catalog", catalog]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = rowmap(&["migrate", "status", "--db", db, "--catalog", catalog]);
    assert!(stdout(&output).contains("Item (Item): 0 rows"));
}

#[test]
fn migrate_rejects_invalid_catalog() {
    let dir = TempDir::new("migrate_invalid");
    let catalog = write_catalog(
        &dir,
        "dup.yaml",
        &format!("{ITEM_CATALOG}{}", ITEM_CATALOG.lines().skip(2).collect::<Vec<_>>().join("\n")),
    );
    let db = dir.join("items.db");

    let output = rowmap(&[
        "migrate",
        "up",
        "--db",
        db.to_str().unwrap(),
        "--catalog",
        catalog.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to initialize migration"));
}
