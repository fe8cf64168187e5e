//! Parameterized statement construction.
//!
//! Every builder is a pure function of its descriptor and inputs. Values
//! always travel as bound parameters (`?1`, `?2`, ...) and identifiers are
//! always double-quoted, so nothing caller-supplied is ever spliced into
//! statement text.
//!
//! # Example
//!
//! ```
//! use rowmap_core::*;
//!
//! let d = Item::descriptor();
//! let row = encode(&d, &Item::created_now(UNSET_KEY, "hello")).unwrap();
//!
//! let insert = build_insert(&d, &row).unwrap();
//! assert_eq!(
//!     insert.sql(),
//!     r#"INSERT INTO "Item" ("content", "created_time") VALUES (?1, ?2)"#
//! );
//! assert_eq!(insert.params().len(), 2);
//!
//! let select = build_select_by_key(&d, &Value::Integer(1)).unwrap();
//! assert!(select.sql().ends_with(r#"WHERE "id" = ?1"#));
//! ```

use std::fmt;

use crate::codec::check_shape;
use crate::error::{MappingError, Result};
use crate::types::{EncodedRow, EntityDescriptor, Value};
use crate::validate::key_index;

/// Statement text plus its ordered bound parameters.
///
/// Produced by the `build_*` functions and handed to a storage driver for
/// execution. Parameter `n` in [`params`](Self::params) binds to
/// placeholder `?{n + 1}` in [`sql`](Self::sql).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub(crate) fn new(sql: String, params: Vec<Value>) -> Self {
        Self { sql, params }
    }

    /// Statement text with numbered placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Splits the statement into its text and parameters.
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Conflict resolution for `INSERT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
    /// Plain `INSERT`.
    #[default]
    None,
    /// `INSERT OR ABORT`.
    Abort,
    /// `INSERT OR FAIL`.
    Fail,
    /// `INSERT OR IGNORE`.
    Ignore,
    /// `INSERT OR REPLACE`.
    Replace,
    /// `INSERT OR ROLLBACK`.
    Rollback,
}

impl OnConflict {
    fn clause(self) -> Option<&'static str> {
        match self {
            OnConflict::None => None,
            OnConflict::Abort => Some("ABORT"),
            OnConflict::Fail => Some("FAIL"),
            OnConflict::Ignore => Some("IGNORE"),
            OnConflict::Replace => Some("REPLACE"),
            OnConflict::Rollback => Some("ROLLBACK"),
        }
    }
}

/// Wraps an identifier in double quotes, doubling embedded quotes.
pub fn quote_identifier(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub(crate) fn placeholders(from: usize, count: usize) -> String {
    (from..from + count)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn column_list(descriptor: &EntityDescriptor) -> String {
    descriptor
        .columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checks a key against the primary key column and returns its position.
fn check_key(descriptor: &EntityDescriptor, key: &Value) -> Result<usize> {
    let index = key_index(descriptor)?;
    let expected = descriptor.columns[index].logical_type;
    if key.logical_type() != Some(expected) {
        return Err(MappingError::InvalidKey {
            entity: descriptor.name.clone(),
            expected,
            found: key.type_name(),
        });
    }
    Ok(index)
}

/// Builds an `INSERT` for an encoded row.
///
/// Names every column except an unset autoincrement primary key.
///
/// # Errors
///
/// Returns [`MappingError::RowShape`] if the row length differs from the
/// column count.
pub fn build_insert(descriptor: &EntityDescriptor, row: &EncodedRow) -> Result<Statement> {
    build_insert_with(descriptor, row, OnConflict::None)
}

/// Builds an `INSERT` with a conflict resolution clause.
///
/// # Examples
///
/// ```
/// use rowmap_core::*;
///
/// let d = Item::descriptor();
/// let row = encode(&d, &Item::created_now(7, "x")).unwrap();
/// let stmt = build_insert_with(&d, &row, OnConflict::Replace).unwrap();
/// assert!(stmt.sql().starts_with(r#"INSERT OR REPLACE INTO "Item" ("id", "#));
/// assert_eq!(stmt.params()[0], Value::Integer(7));
/// ```
pub fn build_insert_with(
    descriptor: &EntityDescriptor,
    row: &EncodedRow,
    on_conflict: OnConflict,
) -> Result<Statement> {
    check_shape(descriptor, row)?;
    let key = key_index(descriptor)?;
    let skip_key = descriptor.autoincrement && row.values()[key].is_null();

    let mut columns = Vec::with_capacity(descriptor.columns.len());
    let mut params = Vec::with_capacity(descriptor.columns.len());
    for (index, (column, value)) in descriptor.columns.iter().zip(row.iter()).enumerate() {
        if skip_key && index == key {
            continue;
        }
        columns.push(quote_identifier(&column.name));
        params.push(value.clone());
    }

    let verb = match on_conflict.clause() {
        Some(clause) => format!("INSERT OR {clause}"),
        None => "INSERT".to_string(),
    };
    let table = quote_identifier(descriptor.table_name());

    let sql = if columns.is_empty() {
        format!("{verb} INTO {table} DEFAULT VALUES")
    } else {
        format!(
            "{verb} INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders(1, params.len())
        )
    };
    Ok(Statement::new(sql, params))
}

/// Builds a `SELECT` of every column for the row with the given key.
///
/// # Errors
///
/// Returns [`MappingError::InvalidKey`] if the key's type differs from the
/// primary key column's logical type.
///
/// # Examples
///
/// ```
/// use rowmap_core::*;
///
/// let d = Item::descriptor();
/// let err = build_select_by_key(&d, &Value::from("not-a-number")).unwrap_err();
/// assert!(matches!(err, MappingError::InvalidKey { .. }));
/// ```
pub fn build_select_by_key(descriptor: &EntityDescriptor, key: &Value) -> Result<Statement> {
    let index = check_key(descriptor, key)?;
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        column_list(descriptor),
        quote_identifier(descriptor.table_name()),
        quote_identifier(&descriptor.columns[index].name)
    );
    Ok(Statement::new(sql, vec![key.clone()]))
}

/// Builds a `SELECT` of every row ordered by primary key.
pub fn build_select_all(descriptor: &EntityDescriptor) -> Result<Statement> {
    let index = key_index(descriptor)?;
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        column_list(descriptor),
        quote_identifier(descriptor.table_name()),
        quote_identifier(&descriptor.columns[index].name)
    );
    Ok(Statement::new(sql, Vec::new()))
}

/// Builds a `SELECT COUNT(*)` over the entity's table.
pub fn build_count(descriptor: &EntityDescriptor) -> Statement {
    let sql = format!(
        "SELECT COUNT(*) FROM {}",
        quote_identifier(descriptor.table_name())
    );
    Statement::new(sql, Vec::new())
}

/// Builds an `UPDATE` of every non-key column, keyed on the row's key.
///
/// # Errors
///
/// - [`MappingError::RowShape`] if the row length differs from the column
///   count.
/// - [`MappingError::InvalidKey`] if the key slot is unset or mistyped.
pub fn build_update_by_key(descriptor: &EntityDescriptor, row: &EncodedRow) -> Result<Statement> {
    check_shape(descriptor, row)?;
    let key_value = &row.values()[key_index(descriptor)?];
    let key = check_key(descriptor, key_value)?;
    let key_column = quote_identifier(&descriptor.columns[key].name);

    let mut assignments = Vec::with_capacity(descriptor.columns.len());
    let mut params = Vec::with_capacity(descriptor.columns.len());
    for (index, (column, value)) in descriptor.columns.iter().zip(row.iter()).enumerate() {
        if index == key {
            continue;
        }
        params.push(value.clone());
        assignments.push(format!("{} = ?{}", quote_identifier(&column.name), params.len()));
    }
    // key-only entity; keep the statement well formed
    if assignments.is_empty() {
        params.push(key_value.clone());
        assignments.push(format!("{key_column} = ?1"));
    }
    params.push(key_value.clone());

    let sql = format!(
        "UPDATE {} SET {} WHERE {key_column} = ?{}",
        quote_identifier(descriptor.table_name()),
        assignments.join(", "),
        params.len()
    );
    Ok(Statement::new(sql, params))
}

/// Builds a `DELETE` of the row with the given key.
///
/// # Errors
///
/// Returns [`MappingError::InvalidKey`] if the key's type differs from the
/// primary key column's logical type.
pub fn build_delete_by_key(descriptor: &EntityDescriptor, key: &Value) -> Result<Statement> {
    let index = check_key(descriptor, key)?;
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1",
        quote_identifier(descriptor.table_name()),
        quote_identifier(&descriptor.columns[index].name)
    );
    Ok(Statement::new(sql, vec![key.clone()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Entity, UNSET_KEY, encode};
    use crate::item::Item;
    use crate::types::{ColumnDescriptor, LogicalType};
    use chrono::{TimeZone, Utc};

    fn t() -> chrono::DateTime<Utc> {
        Utc.timestamp_millis_opt(1_600_000_000_000).unwrap()
    }

    fn item_row(id: i64) -> EncodedRow {
        encode(&Item::descriptor(), &Item::new(id, "hello", t())).unwrap()
    }

    #[test]
    fn test_insert_omits_unset_autoincrement_key() {
        let stmt = build_insert(&Item::descriptor(), &item_row(UNSET_KEY)).unwrap();
        assert_eq!(
            stmt.sql(),
            r#"INSERT INTO "Item" ("content", "created_time") VALUES (?1, ?2)"#
        );
        assert_eq!(
            stmt.params(),
            &[Value::from("hello"), Value::Timestamp(t())]
        );
        assert!(!stmt.sql().contains(r#""id""#));
    }

    #[test]
    fn test_insert_includes_assigned_key() {
        let stmt = build_insert(&Item::descriptor(), &item_row(4)).unwrap();
        assert_eq!(
            stmt.sql(),
            r#"INSERT INTO "Item" ("id", "content", "created_time") VALUES (?1, ?2, ?3)"#
        );
        assert_eq!(stmt.params()[0], Value::Integer(4));
    }

    #[test]
    fn test_insert_values_never_interpolated() {
        let d = Item::descriptor();
        let row = encode(&d, &Item::new(UNSET_KEY, "'); DROP TABLE Item; --", t())).unwrap();
        let stmt = build_insert(&d, &row).unwrap();
        assert!(!stmt.sql().contains("DROP"));
        assert_eq!(stmt.params()[0], Value::from("'); DROP TABLE Item; --"));
    }

    #[test]
    fn test_insert_wrong_shape() {
        let row = EncodedRow::new(vec![Value::from("hello")]);
        assert!(matches!(
            build_insert(&Item::descriptor(), &row),
            Err(MappingError::RowShape { expected: 3, found: 1, .. })
        ));
    }

    #[test]
    fn test_insert_key_only_entity_uses_default_values() {
        let d = EntityDescriptor::new("Counter")
            .with_autoincrement()
            .with_column(ColumnDescriptor::new("id", LogicalType::Integer).primary_key());
        let stmt = build_insert(&d, &EncodedRow::new(vec![Value::Null])).unwrap();
        assert_eq!(stmt.sql(), r#"INSERT INTO "Counter" DEFAULT VALUES"#);
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_insert_conflict_clauses() {
        let d = Item::descriptor();
        let row = item_row(1);
        for (mode, verb) in [
            (OnConflict::Abort, "INSERT OR ABORT"),
            (OnConflict::Fail, "INSERT OR FAIL"),
            (OnConflict::Ignore, "INSERT OR IGNORE"),
            (OnConflict::Replace, "INSERT OR REPLACE"),
            (OnConflict::Rollback, "INSERT OR ROLLBACK"),
        ] {
            let stmt = build_insert_with(&d, &row, mode).unwrap();
            assert!(stmt.sql().starts_with(verb), "{}", stmt.sql());
        }
    }

    #[test]
    fn test_select_by_key() {
        let stmt = build_select_by_key(&Item::descriptor(), &Value::Integer(3)).unwrap();
        assert_eq!(
            stmt.sql(),
            r#"SELECT "id", "content", "created_time" FROM "Item" WHERE "id" = ?1"#
        );
        assert_eq!(stmt.params(), &[Value::Integer(3)]);
    }

    #[test]
    fn test_select_by_key_rejects_wrong_type() {
        let err = build_select_by_key(&Item::descriptor(), &Value::from("not-a-number"))
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::InvalidKey {
                entity: "Item".into(),
                expected: LogicalType::Integer,
                found: "text",
            }
        );
        assert!(build_select_by_key(&Item::descriptor(), &Value::Null).is_err());
    }

    #[test]
    fn test_select_all_and_count() {
        let d = Item::descriptor().with_table("items");
        assert_eq!(
            build_select_all(&d).unwrap().sql(),
            r#"SELECT "id", "content", "created_time" FROM "items" ORDER BY "id""#
        );
        assert_eq!(build_count(&d).sql(), r#"SELECT COUNT(*) FROM "items""#);
    }

    #[test]
    fn test_update_by_key() {
        let stmt = build_update_by_key(&Item::descriptor(), &item_row(8)).unwrap();
        assert_eq!(
            stmt.sql(),
            r#"UPDATE "Item" SET "content" = ?1, "created_time" = ?2 WHERE "id" = ?3"#
        );
        assert_eq!(
            stmt.params(),
            &[Value::from("hello"), Value::Timestamp(t()), Value::Integer(8)]
        );
    }

    #[test]
    fn test_update_requires_assigned_key() {
        let err = build_update_by_key(&Item::descriptor(), &item_row(UNSET_KEY)).unwrap_err();
        assert!(matches!(err, MappingError::InvalidKey { found: "null", .. }));
    }

    #[test]
    fn test_delete_by_key() {
        let stmt = build_delete_by_key(&Item::descriptor(), &Value::Integer(2)).unwrap();
        assert_eq!(stmt.sql(), r#"DELETE FROM "Item" WHERE "id" = ?1"#);
        assert!(build_delete_by_key(&Item::descriptor(), &Value::Timestamp(t())).is_err());
    }

    #[test]
    fn test_builders_are_deterministic() {
        let d = Item::descriptor();
        let row = item_row(UNSET_KEY);
        assert_eq!(build_insert(&d, &row), build_insert(&d, &row));
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("id"), r#""id""#);
        assert_eq!(quote_identifier(r#"a"b"#), r#""a""b""#);
    }

    #[test]
    fn test_into_parts() {
        let (sql, params) = build_count(&Item::descriptor()).into_parts();
        assert!(sql.starts_with("SELECT COUNT(*)"));
        assert!(params.is_empty());
    }
}
