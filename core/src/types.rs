//! Descriptor and value types for entity-to-table mapping.
//!
//! This module defines the static shape of an entity ([`EntityDescriptor`],
//! [`ColumnDescriptor`], [`LogicalType`]) and the runtime projection of an
//! entity value ([`Value`], [`EncodedRow`]). Descriptors derive [`serde`]
//! traits so they can be loaded from catalog files as well as built in code.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical type of a column.
///
/// Independent of any storage engine; drivers decide how each type is
/// physically stored (see [`storage_type`](crate::storage_type)).
///
/// # Examples
///
/// ```
/// use rowmap_core::LogicalType;
///
/// assert_eq!(LogicalType::Timestamp.as_str(), "timestamp");
/// assert_eq!(LogicalType::Integer.to_string(), "integer");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    /// 64-bit signed integer.
    Integer,
    /// UTF-8 text.
    Text,
    /// Point in time with millisecond resolution.
    Timestamp,
}

impl LogicalType {
    /// Returns the lowercase name used in catalogs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalType::Integer => "integer",
            LogicalType::Text => "text",
            LogicalType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Description of a single column.
///
/// Columns are non-nullable by default. Use the builder methods to mark a
/// column as the primary key, nullable, unique, or indexed.
///
/// # Examples
///
/// ```
/// use rowmap_core::{ColumnDescriptor, LogicalType};
///
/// let id = ColumnDescriptor::new("id", LogicalType::Integer).primary_key();
/// assert!(id.primary_key);
/// assert!(!id.nullable);
///
/// let note = ColumnDescriptor::new("note", LogicalType::Text).nullable();
/// assert!(note.nullable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name, unique within its entity.
    pub name: String,
    /// Logical type of stored values.
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
    /// Whether the column accepts `NULL`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// Whether this column is the entity's primary key.
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    /// Whether values must be unique across rows.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Whether a secondary index should be created for this column.
    #[serde(default, skip_serializing_if = "is_false")]
    pub indexed: bool,
    /// Table whose primary key this column holds, for a single-valued
    /// association.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

impl ColumnDescriptor {
    /// Creates a non-nullable column.
    pub fn new(name: &str, logical_type: LogicalType) -> Self {
        Self {
            name: name.to_string(),
            logical_type,
            nullable: false,
            primary_key: false,
            unique: false,
            indexed: false,
            references: None,
        }
    }

    /// Marks the column as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows `NULL` values.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds a uniqueness constraint.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Requests a secondary index.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Declares the column as a foreign key to `table`'s primary key.
    pub fn references(mut self, table: &str) -> Self {
        self.references = Some(table.to_string());
        self
    }
}

/// Static description of an entity type.
///
/// Holds the type name, the table it maps to, the ordered column list, and
/// whether the primary key is assigned by storage on insert. Exactly one
/// column must be marked [`primary_key`](ColumnDescriptor::primary_key);
/// this is enforced when the descriptor is registered with a
/// [`SchemaRegistry`](crate::SchemaRegistry).
///
/// # Examples
///
/// ```
/// use rowmap_core::{ColumnDescriptor, EntityDescriptor, LogicalType};
///
/// let todo = EntityDescriptor::new("Todo")
///     .with_table("todos")
///     .with_autoincrement()
///     .with_column(ColumnDescriptor::new("id", LogicalType::Integer).primary_key())
///     .with_column(ColumnDescriptor::new("title", LogicalType::Text));
///
/// assert_eq!(todo.table_name(), "todos");
/// assert_eq!(todo.primary_key_index(), Some(0));
/// assert_eq!(todo.column_index("title"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity type name, unique within a registry.
    pub name: String,
    /// Table name; defaults to the entity name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Whether the primary key is generated by storage on insert.
    #[serde(default, skip_serializing_if = "is_false")]
    pub autoincrement: bool,
    /// Ordered column list.
    pub columns: Vec<ColumnDescriptor>,
}

impl EntityDescriptor {
    /// Creates a descriptor with no columns.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: None,
            autoincrement: false,
            columns: Vec::new(),
        }
    }

    /// Maps the entity to an explicit table name.
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Marks the primary key as storage-assigned.
    pub fn with_autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Appends a column.
    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Returns the table name, falling back to the entity name.
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// Returns the index of the first column marked as primary key.
    pub fn primary_key_index(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.primary_key)
    }

    /// Returns the primary key column, if one is marked.
    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.primary_key_index().map(|i| &self.columns[i])
    }

    /// Returns the position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of declared columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// A single column value.
///
/// `Null` doubles as the "unset" marker for an autoincrement primary key in
/// an [`EncodedRow`].
///
/// # Examples
///
/// ```
/// use rowmap_core::{LogicalType, Value};
///
/// let v = Value::from("hello");
/// assert_eq!(v.logical_type(), Some(LogicalType::Text));
/// assert!(Value::Null.is_null());
/// assert_eq!(Value::from(None::<i64>), Value::Null);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Integer value.
    Integer(i64),
    /// Text value.
    Text(String),
    /// Timestamp value.
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the logical type of a non-null value.
    pub fn logical_type(&self) -> Option<LogicalType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(LogicalType::Integer),
            Value::Text(_) => Some(LogicalType::Text),
            Value::Timestamp(_) => Some(LogicalType::Timestamp),
        }
    }

    /// Returns the runtime type name, `"null"` for [`Value::Null`].
    pub fn type_name(&self) -> &'static str {
        self.logical_type().map_or("null", LogicalType::as_str)
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the timestamp payload, if any.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Ordered column values, index-aligned with an [`EntityDescriptor`].
///
/// Produced by [`encode`](crate::encode), consumed by
/// [`decode`](crate::decode) and the statement builders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedRow {
    values: Vec<Value>,
}

impl EncodedRow {
    /// Wraps a vector of values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when the row holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Borrows all values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterates over the values in column order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Consumes the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub(crate) fn set(&mut self, index: usize, value: Value) {
        self.values[index] = value;
    }
}

impl From<Vec<Value>> for EncodedRow {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<Value> for EncodedRow {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a EncodedRow {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo() -> EntityDescriptor {
        EntityDescriptor::new("Todo")
            .with_column(ColumnDescriptor::new("title", LogicalType::Text))
            .with_column(ColumnDescriptor::new("id", LogicalType::Integer).primary_key())
    }

    #[test]
    fn test_table_name_defaults_to_entity_name() {
        assert_eq!(todo().table_name(), "Todo");
        assert_eq!(todo().with_table("todos").table_name(), "todos");
    }

    #[test]
    fn test_primary_key_lookup() {
        let d = todo();
        assert_eq!(d.primary_key_index(), Some(1));
        assert_eq!(d.primary_key().unwrap().name, "id");
        assert!(EntityDescriptor::new("Empty").primary_key().is_none());
    }

    #[test]
    fn test_column_lookup() {
        let d = todo();
        assert_eq!(d.column_index("title"), Some(0));
        assert_eq!(d.column("id").unwrap().logical_type, LogicalType::Integer);
        assert!(d.column("missing").is_none());
        assert_eq!(d.column_count(), 2);
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Integer(1).type_name(), "integer");
        assert_eq!(Value::from("x").type_name(), "text");
        assert_eq!(Value::from(Utc::now()).type_name(), "timestamp");
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Integer(7).as_integer(), Some(7));
        assert_eq!(Value::from("a").as_text(), Some("a"));
        assert_eq!(Value::Integer(7).as_text(), None);
        assert_eq!(Value::from(Some("b")), Value::Text("b".into()));
    }

    #[test]
    fn test_descriptor_serde_defaults() {
        let json = r#"{
            "name": "Todo",
            "columns": [
                {"name": "id", "type": "integer", "primary_key": true},
                {"name": "title", "type": "text"}
            ]
        }"#;
        let d: EntityDescriptor = serde_json::from_str(json).unwrap();
        assert!(!d.autoincrement);
        assert!(d.table.is_none());
        assert!(d.columns[0].primary_key);
        assert!(!d.columns[1].nullable);

        let out = serde_json::to_string(&d).unwrap();
        assert!(!out.contains("nullable"));
        assert!(!out.contains("references"));
        assert!(out.contains(r#""type":"integer""#));
    }

    #[test]
    fn test_references_serde() {
        let column: ColumnDescriptor =
            serde_json::from_str(r#"{"name": "owner", "type": "integer", "references": "users"}"#)
                .unwrap();
        assert_eq!(
            column,
            ColumnDescriptor::new("owner", LogicalType::Integer).references("users")
        );
    }
}
