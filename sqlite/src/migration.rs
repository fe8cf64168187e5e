//! Table lifecycle operations for catalog entities.
//!
//! Provides [`Migration`] for creating, dropping, refreshing, and
//! inspecting the tables described by a [`Catalog`]. The catalog's
//! fingerprint is recorded in a small metadata table on
//! [`up`](Migration::up) so that [`status`](Migration::status) can tell
//! whether the database was created from the same entity definitions.
//!
//! # Example
//!
//! ```no_run
//! use rowmap_catalog::Catalog;
//! use rowmap_sqlite::Migration;
//! use rusqlite::Connection;
//!
//! let catalog = Catalog::load("entities.yaml").unwrap();
//! let conn = Connection::open("items.db").unwrap();
//! let mut migration = Migration::new(conn, catalog).unwrap();
//!
//! migration.up().unwrap();
//!
//! let status = migration.status().unwrap();
//! assert!(status.fingerprint_matches());
//! ```

use rowmap_catalog::Catalog;
use rowmap_core::{
    EntityDescriptor, SchemaRegistry, create_index_sql, create_table_sql, drop_table_sql,
};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::error::{Result, SqliteError};
use crate::store::count_rows;

/// Name of the table holding migration metadata.
pub const META_TABLE: &str = "_rowmap_meta";

const FINGERPRINT_KEY: &str = "catalog_fingerprint";

/// Manages the lifecycle of the tables described by a catalog.
///
/// All mutation operations use transactions, so either every table is
/// created (or dropped) or none is.
pub struct Migration {
    conn: Connection,
    registry: SchemaRegistry,
    fingerprint: String,
}

impl Migration {
    /// Creates a migration manager for the given connection and catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Catalog`] if the catalog does not build a valid
    /// registry.
    ///
    /// Foreign key enforcement is switched on for the connection, so
    /// association columns reject keys with no referenced row.
    pub fn new(conn: Connection, catalog: Catalog) -> Result<Self> {
        let fingerprint = catalog.fingerprint()?;
        let registry = catalog.into_registry()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn,
            registry,
            fingerprint,
        })
    }

    /// Creates every entity table, its indexes, and the metadata table, then
    /// records the catalog fingerprint.
    ///
    /// Uses `IF NOT EXISTS`, so it is safe to call multiple times.
    pub fn up(&mut self) -> Result<()> {
        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{META_TABLE}\" (\"key\" TEXT PRIMARY KEY NOT NULL, \"value\" TEXT NOT NULL);\n"
        );
        for descriptor in self.registry.entities() {
            sql.push_str(&create_table_sql(descriptor)?);
            sql.push_str(";\n");
            for index in create_index_sql(descriptor)? {
                sql.push_str(&index);
                sql.push_str(";\n");
            }
        }

        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::Migration(format!("failed to create tables: {e}")))?;
        tx.execute(
            &format!("INSERT OR REPLACE INTO \"{META_TABLE}\" (\"key\", \"value\") VALUES (?1, ?2)"),
            params![FINGERPRINT_KEY, self.fingerprint],
        )?;
        tx.commit()?;

        info!(
            entities = self.registry.len(),
            fingerprint = %self.fingerprint,
            "Created tables"
        );
        Ok(())
    }

    /// Drops every entity table and the metadata table, in reverse
    /// registration order.
    ///
    /// Uses `DROP TABLE IF EXISTS`, so it is safe to call even if the tables
    /// do not exist.
    pub fn down(&mut self) -> Result<()> {
        let descriptors: Vec<&EntityDescriptor> = self.registry.entities().collect();
        let mut sql = String::new();
        for descriptor in descriptors.iter().rev() {
            sql.push_str(&drop_table_sql(descriptor));
            sql.push_str(";\n");
        }
        sql.push_str(&format!("DROP TABLE IF EXISTS \"{META_TABLE}\";\n"));

        let tx = self.conn.transaction()?;
        tx.execute_batch(&sql)
            .map_err(|e| SqliteError::Migration(format!("failed to drop tables: {e}")))?;
        tx.commit()?;

        info!(entities = descriptors.len(), "Dropped tables");
        Ok(())
    }

    /// Drops and recreates every table.
    ///
    /// Equivalent to calling [`down`](Self::down) then [`up`](Self::up).
    /// All stored rows are lost.
    pub fn refresh(&mut self) -> Result<()> {
        self.down()?;
        self.up()
    }

    /// Reports which tables exist, how many rows each holds, and whether the
    /// recorded fingerprint matches the catalog.
    pub fn status(&self) -> Result<MigrationStatus> {
        let mut tables = Vec::with_capacity(self.registry.len());
        for descriptor in self.registry.entities() {
            let exists = self.table_exists(descriptor.table_name())?;
            let rows = if exists {
                count_rows(&self.conn, descriptor)?
            } else {
                0
            };
            debug!(entity = %descriptor.name, exists, rows, "Checked table");
            tables.push(TableStatus {
                entity: descriptor.name.clone(),
                table: descriptor.table_name().to_string(),
                exists,
                rows,
            });
        }

        Ok(MigrationStatus {
            tables,
            stored_fingerprint: self.stored_fingerprint()?,
            fingerprint: self.fingerprint.clone(),
        })
    }

    /// Returns the registry built from the catalog.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Returns the catalog fingerprint this migration records.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Consumes the migration and returns the underlying connection.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1")?;
        let count: i64 = stmt.query_row([table], |row| row.get(0))?;
        Ok(count > 0)
    }

    fn stored_fingerprint(&self) -> Result<Option<String>> {
        if !self.table_exists(META_TABLE)? {
            return Ok(None);
        }
        let stored = self
            .conn
            .query_row(
                &format!("SELECT \"value\" FROM \"{META_TABLE}\" WHERE \"key\" = ?1"),
                [FINGERPRINT_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(stored)
    }
}

/// Existence and size of one entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStatus {
    /// Entity type name.
    pub entity: String,
    /// Table name in the database.
    pub table: String,
    /// Whether the table exists.
    pub exists: bool,
    /// Number of rows, 0 when the table is missing.
    pub rows: usize,
}

/// Snapshot of the migration state.
///
/// Returned by [`Migration::status`].
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// One entry per catalog entity, in registration order.
    pub tables: Vec<TableStatus>,
    /// Fingerprint recorded by the last [`Migration::up`], if any.
    pub stored_fingerprint: Option<String>,
    /// Fingerprint of the catalog in use.
    pub fingerprint: String,
}

impl MigrationStatus {
    /// Returns `true` if every entity table exists.
    pub fn tables_exist(&self) -> bool {
        self.tables.iter().all(|t| t.exists)
    }

    /// Returns `true` if the stored fingerprint equals the catalog's.
    pub fn fingerprint_matches(&self) -> bool {
        self.stored_fingerprint.as_deref() == Some(self.fingerprint.as_str())
    }

    /// Total rows across all entity tables.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}
