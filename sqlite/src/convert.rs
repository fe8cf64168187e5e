//! Conversion between rowmap [`Value`]s and SQLite storage values.
//!
//! Logical types map onto SQLite storage classes as follows:
//!
//! | Logical     | Storage | Encoding                         |
//! |-------------|---------|----------------------------------|
//! | `integer`   | INTEGER | as is                            |
//! | `text`      | TEXT    | UTF-8                            |
//! | `timestamp` | INTEGER | milliseconds since the Unix epoch |
//!
//! `NULL` passes through unchanged in both directions; whether a column may
//! hold it is checked by the codec when the row is decoded.

use chrono::DateTime;
use rowmap_core::{ColumnDescriptor, EncodedRow, EntityDescriptor, LogicalType, Statement, Value};
use rusqlite::types::Value as SqlValue;

use crate::error::{Result, SqliteError};

/// Converts a bound parameter to its SQLite representation.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(n) => SqlValue::Integer(*n),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Timestamp(ts) => SqlValue::Integer(ts.timestamp_millis()),
    }
}

/// Converts a statement's parameters for `params_from_iter`.
pub(crate) fn statement_params(statement: &Statement) -> Vec<SqlValue> {
    statement.params().iter().map(to_sql).collect()
}

/// Converts a stored value back into the logical type of its column.
pub(crate) fn from_sql(
    descriptor: &EntityDescriptor,
    column: &ColumnDescriptor,
    raw: SqlValue,
) -> Result<Value> {
    let value = match (column.logical_type, raw) {
        (_, SqlValue::Null) => Value::Null,
        (LogicalType::Integer, SqlValue::Integer(n)) => Value::Integer(n),
        (LogicalType::Text, SqlValue::Text(s)) => Value::Text(s),
        (LogicalType::Timestamp, SqlValue::Integer(ms)) => {
            let ts = DateTime::from_timestamp_millis(ms).ok_or_else(|| {
                SqliteError::Conversion(format!(
                    "{}.{}: timestamp {ms} is out of range",
                    descriptor.name, column.name
                ))
            })?;
            Value::Timestamp(ts)
        }
        (expected, other) => {
            return Err(SqliteError::Conversion(format!(
                "{}.{}: expected {expected}, found {}",
                descriptor.name,
                column.name,
                other.data_type()
            )));
        }
    };
    Ok(value)
}

/// Converts a raw result row, in descriptor column order, into an
/// [`EncodedRow`].
pub(crate) fn read_row(descriptor: &EntityDescriptor, raw: Vec<SqlValue>) -> Result<EncodedRow> {
    if raw.len() != descriptor.columns.len() {
        return Err(SqliteError::Conversion(format!(
            "{}: expected {} columns, found {}",
            descriptor.name,
            descriptor.columns.len(),
            raw.len()
        )));
    }
    descriptor
        .columns
        .iter()
        .zip(raw)
        .map(|(column, value)| from_sql(descriptor, column, value))
        .collect::<Result<Vec<_>>>()
        .map(EncodedRow::new)
}
