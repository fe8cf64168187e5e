//! Bidirectional conversion between entity values and [`EncodedRow`]s.
//!
//! Entities describe themselves through the [`Entity`] trait: a static
//! descriptor, a getter by column name, and a constructor that reads named
//! [`Fields`]. [`encode`] and [`decode`] walk the descriptor's column order,
//! checking every value against its column's logical type.
//!
//! # Autoincrement keys
//!
//! An autoincrement primary key is *unset* while it holds [`UNSET_KEY`]
//! (`0`). Encoding writes [`Value::Null`] into the key slot for an unset key
//! and decoding turns a `Null` key slot back into `0`. After storage assigns
//! a key, [`assign_key`] writes it into the row so that a later [`decode`]
//! reflects it.

use chrono::{DateTime, Utc};

use crate::error::{MappingError, Result};
use crate::types::{ColumnDescriptor, EncodedRow, EntityDescriptor, LogicalType, Value};
use crate::validate::key_index;

/// Identifier value of an autoincrement key that storage has not assigned yet.
pub const UNSET_KEY: i64 = 0;

/// A Rust type that maps to a table.
///
/// Implementations replace annotation metadata with code: the descriptor is
/// built explicitly, and field access goes through column names.
///
/// # Examples
///
/// ```
/// use rowmap_core::*;
///
/// struct Tag {
///     name: String,
/// }
///
/// impl Entity for Tag {
///     const NAME: &'static str = "Tag";
///
///     fn descriptor() -> EntityDescriptor {
///         EntityDescriptor::new(Self::NAME)
///             .with_column(ColumnDescriptor::new("name", LogicalType::Text).primary_key())
///     }
///
///     fn field(&self, column: &str) -> Option<Value> {
///         match column {
///             "name" => Some(Value::from(self.name.as_str())),
///             _ => None,
///         }
///     }
///
///     fn from_fields(fields: &Fields<'_>) -> Result<Self> {
///         Ok(Tag { name: fields.get_as("name")? })
///     }
/// }
///
/// let d = Tag::descriptor();
/// let row = encode(&d, &Tag { name: "rust".into() }).unwrap();
/// let tag: Tag = decode(&d, row).unwrap();
/// assert_eq!(tag.name, "rust");
/// ```
pub trait Entity: Sized {
    /// Entity type name used as the registry key.
    const NAME: &'static str;

    /// Returns the static description of this entity.
    fn descriptor() -> EntityDescriptor;

    /// Returns the value stored for `column`, or `None` if the entity has
    /// no such field.
    fn field(&self, column: &str) -> Option<Value>;

    /// Builds an entity from decoded column values.
    fn from_fields(fields: &Fields<'_>) -> Result<Self>;
}

/// Conversion from a checked [`Value`] into a Rust field type.
///
/// Implement it for a domain type to store that type through one of the
/// logical types; [`Entity::field`] supplies the other direction.
pub trait FromValue: Sized {
    /// Returns `None` if the value has a different type.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_text().map(String::from)
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_timestamp()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Decoded column values addressed by column name.
///
/// Handed to [`Entity::from_fields`] by [`decode`]. Every value has already
/// been checked against its column's logical type.
#[derive(Debug)]
pub struct Fields<'a> {
    descriptor: &'a EntityDescriptor,
    values: &'a [Value],
}

impl<'a> Fields<'a> {
    fn new(descriptor: &'a EntityDescriptor, values: &'a [Value]) -> Self {
        Self { descriptor, values }
    }

    /// Returns the raw value of `column`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::FieldMissing`] if the descriptor has no such
    /// column.
    pub fn get(&self, column: &str) -> Result<&'a Value> {
        self.descriptor
            .column_index(column)
            .map(|i| &self.values[i])
            .ok_or_else(|| MappingError::FieldMissing {
                entity: self.descriptor.name.clone(),
                column: column.to_string(),
            })
    }

    /// Returns the value of `column` converted to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::FieldMissing`] for an unknown column, or
    /// [`MappingError::TypeMismatch`] if the entity reads the column as a
    /// different type than the descriptor declares.
    pub fn get_as<T: FromValue>(&self, column: &str) -> Result<T> {
        let value = self.get(column)?;
        T::from_value(value).ok_or_else(|| {
            let expected = self
                .descriptor
                .column(column)
                .map_or(LogicalType::Text, |c| c.logical_type);
            MappingError::TypeMismatch {
                entity: self.descriptor.name.clone(),
                column: column.to_string(),
                expected,
                found: value.type_name(),
            }
        })
    }
}

/// Checks one value against its column.
///
/// `Null` is accepted in nullable columns and in an unset autoincrement key
/// slot.
fn check_value(
    descriptor: &EntityDescriptor,
    column: &ColumnDescriptor,
    auto_key: bool,
    value: &Value,
) -> Result<()> {
    let matches = match value.logical_type() {
        None => column.nullable || auto_key,
        Some(t) => t == column.logical_type,
    };
    if matches {
        Ok(())
    } else {
        Err(MappingError::TypeMismatch {
            entity: descriptor.name.clone(),
            column: column.name.clone(),
            expected: column.logical_type,
            found: value.type_name(),
        })
    }
}

pub(crate) fn check_shape(descriptor: &EntityDescriptor, row: &EncodedRow) -> Result<()> {
    if row.len() != descriptor.columns.len() {
        return Err(MappingError::RowShape {
            entity: descriptor.name.clone(),
            expected: descriptor.columns.len(),
            found: row.len(),
        });
    }
    Ok(())
}

/// Encodes an entity into a row following the descriptor's column order.
///
/// # Errors
///
/// - [`MappingError::FieldMissing`] if the entity has no field for a
///   declared column.
/// - [`MappingError::TypeMismatch`] if a field's type disagrees with its
///   column, or a non-nullable column receives `Null`.
/// - [`MappingError::InvalidKey`] if an autoincrement key is negative. Keys
///   are [`UNSET_KEY`] before storage assigns one and positive afterwards.
/// - [`MappingError::InvalidDescriptor`] if the descriptor has no primary key.
///
/// # Examples
///
/// ```
/// use rowmap_core::*;
///
/// let d = Item::descriptor();
/// let item = Item::created_now(UNSET_KEY, "hello");
/// let row = encode(&d, &item).unwrap();
/// assert_eq!(row.get(0), Some(&Value::Null));
/// assert_eq!(row.get(1), Some(&Value::from("hello")));
/// ```
pub fn encode<E: Entity>(descriptor: &EntityDescriptor, instance: &E) -> Result<EncodedRow> {
    let key = key_index(descriptor)?;
    let mut values = Vec::with_capacity(descriptor.columns.len());

    for (index, column) in descriptor.columns.iter().enumerate() {
        let auto_key = descriptor.autoincrement && index == key;
        let value = instance
            .field(&column.name)
            .ok_or_else(|| MappingError::FieldMissing {
                entity: descriptor.name.clone(),
                column: column.name.clone(),
            })?;
        let value = match value {
            Value::Integer(UNSET_KEY) if auto_key => Value::Null,
            Value::Integer(n) if auto_key && n < 0 => {
                return Err(MappingError::InvalidKey {
                    entity: descriptor.name.clone(),
                    expected: column.logical_type,
                    found: "negative integer",
                });
            }
            other => other,
        };
        check_value(descriptor, column, auto_key, &value)?;
        values.push(value);
    }

    Ok(EncodedRow::new(values))
}

/// Decodes a row into an entity.
///
/// # Errors
///
/// - [`MappingError::RowShape`] if the row length differs from the column
///   count.
/// - [`MappingError::TypeMismatch`] if a value's type disagrees with its
///   column.
/// - [`MappingError::FieldMissing`] if the entity reads a column the
///   descriptor does not declare.
///
/// # Examples
///
/// ```
/// use rowmap_core::*;
///
/// let d = Item::descriptor();
/// let err = decode::<Item>(&d, EncodedRow::new(vec![Value::from("hello")])).unwrap_err();
/// assert!(matches!(err, MappingError::RowShape { expected: 3, found: 1, .. }));
/// ```
pub fn decode<E: Entity>(descriptor: &EntityDescriptor, row: EncodedRow) -> Result<E> {
    check_shape(descriptor, &row)?;
    let key = key_index(descriptor)?;

    for (index, (column, value)) in descriptor.columns.iter().zip(row.iter()).enumerate() {
        let auto_key = descriptor.autoincrement && index == key;
        check_value(descriptor, column, auto_key, value)?;
    }

    let mut values = row.into_values();
    if descriptor.autoincrement && values[key].is_null() {
        values[key] = Value::Integer(UNSET_KEY);
    }

    E::from_fields(&Fields::new(descriptor, &values))
}

/// Writes a storage-generated key into an unset autoincrement key slot.
///
/// Returns `true` if the key was written and `false` if the descriptor is
/// not autoincrement or the slot already holds a key.
///
/// # Errors
///
/// Returns [`MappingError::RowShape`] if the row does not match the
/// descriptor.
///
/// # Examples
///
/// ```
/// use rowmap_core::*;
///
/// let d = Item::descriptor();
/// let mut row = encode(&d, &Item::created_now(UNSET_KEY, "hello")).unwrap();
/// assert!(assign_key(&d, &mut row, 42).unwrap());
///
/// let item: Item = decode(&d, row).unwrap();
/// assert_eq!(item.id, 42);
/// ```
pub fn assign_key(descriptor: &EntityDescriptor, row: &mut EncodedRow, key: i64) -> Result<bool> {
    check_shape(descriptor, row)?;
    let index = key_index(descriptor)?;
    if !descriptor.autoincrement || !row.values()[index].is_null() {
        return Ok(false);
    }
    row.set(index, Value::Integer(key));
    Ok(true)
}
