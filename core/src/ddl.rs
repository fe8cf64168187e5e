//! Table definition SQL generated from descriptors.
//!
//! Produces `CREATE TABLE`, `CREATE INDEX`, and `DROP TABLE` statements in
//! SQLite flavored SQL. Timestamps are stored as `INTEGER` milliseconds since
//! the Unix epoch. Creation statements use `IF NOT EXISTS` so they can be
//! replayed safely.

use crate::error::Result;
use crate::statement::quote_identifier;
use crate::types::{ColumnDescriptor, EntityDescriptor, LogicalType};
use crate::validate::ensure_valid;

/// Returns the storage type used for a logical type.
pub fn storage_type(logical_type: LogicalType) -> &'static str {
    match logical_type {
        LogicalType::Integer | LogicalType::Timestamp => "INTEGER",
        LogicalType::Text => "TEXT",
    }
}

fn column_definition(descriptor: &EntityDescriptor, column: &ColumnDescriptor) -> String {
    let mut parts = vec![
        quote_identifier(&column.name),
        storage_type(column.logical_type).to_string(),
    ];

    if column.primary_key {
        parts.push("PRIMARY KEY".to_string());
        if descriptor.autoincrement {
            parts.push("AUTOINCREMENT".to_string());
        }
    } else {
        if column.unique {
            parts.push("UNIQUE".to_string());
        }
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if let Some(target) = &column.references {
            parts.push(format!("REFERENCES {}", quote_identifier(target)));
        }
    }

    parts.join(" ")
}

/// Generates the `CREATE TABLE` statement for an entity.
///
/// # Errors
///
/// Returns [`MappingError::InvalidDescriptor`](crate::MappingError::InvalidDescriptor)
/// if the descriptor fails validation.
///
/// # Examples
///
/// ```
/// use rowmap_core::*;
///
/// let sql = create_table_sql(&Item::descriptor()).unwrap();
/// assert_eq!(
///     sql,
///     r#"CREATE TABLE IF NOT EXISTS "Item" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "content" TEXT NOT NULL, "created_time" INTEGER NOT NULL)"#
/// );
/// ```
pub fn create_table_sql(descriptor: &EntityDescriptor) -> Result<String> {
    ensure_valid(descriptor)?;

    let columns: Vec<String> = descriptor
        .columns
        .iter()
        .map(|c| column_definition(descriptor, c))
        .collect();

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(descriptor.table_name()),
        columns.join(", ")
    ))
}

/// Generates one `CREATE INDEX` per indexed non-key column.
///
/// Index names follow `index_{column}_on_{table}`.
///
/// # Errors
///
/// Returns [`MappingError::InvalidDescriptor`](crate::MappingError::InvalidDescriptor)
/// if the descriptor fails validation.
pub fn create_index_sql(descriptor: &EntityDescriptor) -> Result<Vec<String>> {
    ensure_valid(descriptor)?;
    let table = descriptor.table_name();

    Ok(descriptor
        .columns
        .iter()
        .filter(|c| c.indexed && !c.primary_key)
        .map(|c| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_identifier(&format!("index_{}_on_{table}", c.name)),
                quote_identifier(table),
                quote_identifier(&c.name)
            )
        })
        .collect())
}

/// Generates the `DROP TABLE IF EXISTS` statement for an entity.
pub fn drop_table_sql(descriptor: &EntityDescriptor) -> String {
    format!(
        "DROP TABLE IF EXISTS {}",
        quote_identifier(descriptor.table_name())
    )
}
