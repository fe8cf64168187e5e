use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rowmap_catalog::Catalog;
use rowmap_core::{
    EntityDescriptor, create_index_sql, create_table_sql, storage_type, validate_descriptor,
};
use rowmap_sqlite::Migration;

#[derive(Debug, Parser)]
#[command(name = "rowmap")]
#[command(about = "Entity catalog checks, DDL generation, and SQLite table management")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and validate a catalog, then print a summary and its fingerprint.
    Check(CheckArgs),
    /// Print CREATE TABLE and CREATE INDEX statements for a catalog.
    Ddl(DdlArgs),
    /// SQLite table lifecycle operations.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Catalog file (.yaml, .yml, .json) or directory of catalog files.
    #[arg(long)]
    catalog: PathBuf,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct DdlArgs {
    /// Catalog file (.yaml, .yml, .json) or directory of catalog files.
    #[arg(long)]
    catalog: PathBuf,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[command(subcommand)]
    operation: MigrateOperation,
}

#[derive(Debug, Subcommand)]
enum MigrateOperation {
    /// Create entity tables and record the catalog fingerprint.
    Up(MigrateTarget),
    /// Drop entity tables.
    Down(MigrateTarget),
    /// Drop and recreate entity tables.
    Refresh(MigrateTarget),
    /// Show table existence, row counts, and fingerprint match.
    Status(MigrateTarget),
}

#[derive(Debug, Args)]
struct MigrateTarget {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Catalog file (.yaml, .yml, .json) or directory of catalog files.
    #[arg(long)]
    catalog: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Ddl(args) => run_ddl(args),
        Command::Migrate(args) => run_migrate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// check command
// ---------------------------------------------------------------------------

fn run_check(args: CheckArgs) -> Result<(), String> {
    let catalog = load_catalog(&args.catalog)?;

    let mut invalid = 0usize;
    for descriptor in &catalog.entities {
        let errors = validate_descriptor(descriptor);
        if !errors.is_empty() {
            invalid += 1;
            for error in errors {
                eprintln!("  {}: {error}", descriptor.name);
            }
        }
    }
    if invalid > 0 {
        return Err(format!(
            "{} in catalog",
            counted(invalid, "invalid entity", "invalid entities")
        ));
    }

    let fingerprint = catalog.fingerprint().map_err(|e| e.to_string())?;
    let registry = catalog
        .to_registry()
        .map_err(|e| format!("Catalog rejected: {e}"))?;

    if args.json {
        let entities: Vec<serde_json::Value> = registry.entities().map(entity_summary).collect();
        let summary = serde_json::json!({
            "version": catalog.version,
            "fingerprint": fingerprint,
            "entities": entities,
        });
        let raw = serde_json::to_string_pretty(&summary)
            .map_err(|err| format!("Failed to serialize summary: {err}"))?;
        println!("{raw}");
        return Ok(());
    }

    println!(
        "Catalog '{}' (version {}) is valid: {}.",
        args.catalog.display(),
        catalog.version,
        counted(registry.len(), "entity", "entities")
    );
    for descriptor in registry.entities() {
        let key = descriptor
            .primary_key()
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        println!(
            "  {} -> {} ({}, key '{}'{})",
            descriptor.name,
            descriptor.table_name(),
            counted(descriptor.column_count(), "column", "columns"),
            key,
            if descriptor.autoincrement {
                ", autoincrement"
            } else {
                ""
            }
        );
    }
    println!("Fingerprint: {fingerprint}");
    Ok(())
}

fn entity_summary(descriptor: &EntityDescriptor) -> serde_json::Value {
    let columns: Vec<serde_json::Value> = descriptor
        .columns
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "type": c.logical_type.as_str(),
                "storage": storage_type(c.logical_type),
                "nullable": c.nullable,
                "primary_key": c.primary_key,
                "references": c.references,
            })
        })
        .collect();
    serde_json::json!({
        "name": descriptor.name,
        "table": descriptor.table_name(),
        "autoincrement": descriptor.autoincrement,
        "columns": columns,
    })
}

/// Formats a count with the singular or plural noun.
fn counted(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("1 {singular}")
    } else {
        format!("{n} {plural}")
    }
}

// ---------------------------------------------------------------------------
// ddl command
// ---------------------------------------------------------------------------

fn run_ddl(args: DdlArgs) -> Result<(), String> {
    let registry = load_catalog(&args.catalog)?
        .into_registry()
        .map_err(|e| format!("Catalog rejected: {e}"))?;

    for descriptor in registry.entities() {
        let table = create_table_sql(descriptor).map_err(|e| e.to_string())?;
        println!("{table};");
        for index in create_index_sql(descriptor).map_err(|e| e.to_string())? {
            println!("{index};");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// migrate command
// ---------------------------------------------------------------------------

fn run_migrate(args: MigrateArgs) -> Result<(), String> {
    match args.operation {
        MigrateOperation::Up(t) => run_migrate_up(t),
        MigrateOperation::Down(t) => run_migrate_down(t),
        MigrateOperation::Refresh(t) => run_migrate_refresh(t),
        MigrateOperation::Status(t) => run_migrate_status(t),
    }
}

fn run_migrate_up(target: MigrateTarget) -> Result<(), String> {
    let mut migration = open_migration(&target)?;
    migration
        .up()
        .map_err(|e| format!("Migration up failed: {e}"))?;
    println!(
        "Migration up complete. {} created in '{}'.",
        counted(migration.registry().len(), "table", "tables"),
        target.db.display()
    );
    Ok(())
}

fn run_migrate_down(target: MigrateTarget) -> Result<(), String> {
    let mut migration = open_migration(&target)?;
    migration
        .down()
        .map_err(|e| format!("Migration down failed: {e}"))?;
    println!(
        "Migration down complete. {} dropped from '{}'.",
        counted(migration.registry().len(), "table", "tables"),
        target.db.display()
    );
    Ok(())
}

fn run_migrate_refresh(target: MigrateTarget) -> Result<(), String> {
    let mut migration = open_migration(&target)?;
    migration
        .refresh()
        .map_err(|e| format!("Refresh failed: {e}"))?;
    println!(
        "Refresh complete (tables dropped and recreated in '{}').",
        target.db.display()
    );
    Ok(())
}

fn run_migrate_status(target: MigrateTarget) -> Result<(), String> {
    let migration = open_migration(&target)?;
    let status = migration
        .status()
        .map_err(|e| format!("Failed to get migration status: {e}"))?;

    println!("Migration Status:");
    println!(
        "  Tables exist: {}",
        if status.tables_exist() { "yes" } else { "no" }
    );
    for table in &status.tables {
        if table.exists {
            println!(
                "  {} ({}): {}",
                table.entity,
                table.table,
                counted(table.rows, "row", "rows")
            );
        } else {
            println!("  {} ({}): missing", table.entity, table.table);
        }
    }
    let fingerprint = match &status.stored_fingerprint {
        None => "not recorded",
        Some(_) if status.fingerprint_matches() => "matches catalog",
        Some(_) => "differs from catalog",
    };
    println!("  Fingerprint: {fingerprint}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Loads a catalog from a file, or merges every catalog file in a directory.
fn load_catalog(path: &Path) -> Result<Catalog, String> {
    let result = if path.is_dir() {
        Catalog::from_dir(path)
    } else {
        Catalog::load(path)
    };
    result.map_err(|e| format!("Failed to load catalog '{}': {e}", path.display()))
}

fn open_migration(target: &MigrateTarget) -> Result<Migration, String> {
    let catalog = load_catalog(&target.catalog)?;
    let conn = rusqlite::Connection::open(&target.db)
        .map_err(|e| format!("Failed to open database '{}': {e}", target.db.display()))?;
    Migration::new(conn, catalog).map_err(|e| format!("Failed to initialize migration: {e}"))
}
