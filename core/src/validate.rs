//! Descriptor validation.
//!
//! Checks the structural rules every [`EntityDescriptor`] must satisfy
//! before it can be registered or turned into SQL: a usable entity name,
//! safe identifiers, unique column names, and exactly one non-nullable
//! primary key.
//!
//! # Examples
//!
//! ```
//! use rowmap_core::*;
//!
//! let ok = EntityDescriptor::new("Tag")
//!     .with_column(ColumnDescriptor::new("name", LogicalType::Text).primary_key());
//! assert!(validate_descriptor(&ok).is_empty());
//!
//! // No primary key
//! let bad = EntityDescriptor::new("Tag")
//!     .with_column(ColumnDescriptor::new("name", LogicalType::Text));
//! assert_eq!(validate_descriptor(&bad), vec![DescriptorError::MissingPrimaryKey]);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::error::{MappingError, Result};
use crate::types::{EntityDescriptor, LogicalType};

/// Structural problems found in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Entity name is empty or whitespace-only.
    #[error("entity name cannot be empty")]
    EmptyEntityName,
    /// The descriptor declares no columns.
    #[error("entity must declare at least one column")]
    NoColumns,
    /// A table or column name is not a plain identifier.
    #[error("invalid identifier '{0}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidIdentifier(String),
    /// Two columns share a name.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    /// No column is marked as primary key.
    #[error("no column is marked as primary key")]
    MissingPrimaryKey,
    /// More than one column is marked as primary key.
    #[error("multiple primary key columns: {}", .0.join(", "))]
    MultiplePrimaryKeys(Vec<String>),
    /// The primary key column allows `NULL`.
    #[error("primary key column '{0}' cannot be nullable")]
    NullablePrimaryKey(String),
    /// Autoincrement requested on a primary key that is not an integer.
    #[error("autoincrement requires an integer primary key, '{0}' is not")]
    NonIntegerAutoincrement(String),
    /// Another registered entity already maps to this table.
    #[error("table '{0}' is already mapped by another entity")]
    TableInUse(String),
    /// A column references a table that is not registered, or whose key
    /// type differs from the column's type.
    #[error("column '{column}' references unknown or incompatible table '{table}'")]
    InvalidReference {
        /// Referencing column.
        column: String,
        /// Referenced table.
        table: String,
    },
}

/// Returns `true` if `ident` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a descriptor, returning every rule it violates.
///
/// Stops early when the entity name is empty or no columns are declared,
/// since later checks are meaningless in those cases.
pub fn validate_descriptor(descriptor: &EntityDescriptor) -> Vec<DescriptorError> {
    let mut errors = Vec::new();

    if descriptor.name.trim().is_empty() {
        errors.push(DescriptorError::EmptyEntityName);
        return errors;
    }
    if descriptor.columns.is_empty() {
        errors.push(DescriptorError::NoColumns);
        return errors;
    }

    let table = descriptor.table_name();
    if !is_valid_identifier(table) {
        errors.push(DescriptorError::InvalidIdentifier(table.to_string()));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for column in &descriptor.columns {
        if !is_valid_identifier(&column.name) {
            errors.push(DescriptorError::InvalidIdentifier(column.name.clone()));
        }
        if !seen.insert(column.name.as_str()) {
            errors.push(DescriptorError::DuplicateColumn(column.name.clone()));
        }
        if let Some(target) = &column.references {
            if !is_valid_identifier(target) {
                errors.push(DescriptorError::InvalidIdentifier(target.clone()));
            }
        }
    }

    let keys: Vec<_> = descriptor.columns.iter().filter(|c| c.primary_key).collect();
    match keys.as_slice() {
        [] => errors.push(DescriptorError::MissingPrimaryKey),
        [key] => {
            if key.nullable {
                errors.push(DescriptorError::NullablePrimaryKey(key.name.clone()));
            }
            if descriptor.autoincrement && key.logical_type != LogicalType::Integer {
                errors.push(DescriptorError::NonIntegerAutoincrement(key.name.clone()));
            }
        }
        many => errors.push(DescriptorError::MultiplePrimaryKeys(
            many.iter().map(|c| c.name.clone()).collect(),
        )),
    }

    errors
}

/// Validates a descriptor and converts the first violation into a
/// [`MappingError::InvalidDescriptor`].
pub fn ensure_valid(descriptor: &EntityDescriptor) -> Result<()> {
    match validate_descriptor(descriptor).into_iter().next() {
        Some(reason) => Err(invalid(descriptor, reason)),
        None => Ok(()),
    }
}

/// Returns the primary key position, failing if none is marked.
pub(crate) fn key_index(descriptor: &EntityDescriptor) -> Result<usize> {
    descriptor
        .primary_key_index()
        .ok_or_else(|| invalid(descriptor, DescriptorError::MissingPrimaryKey))
}

pub(crate) fn invalid(descriptor: &EntityDescriptor, reason: DescriptorError) -> MappingError {
    MappingError::InvalidDescriptor {
        entity: descriptor.name.clone(),
        reason,
    }
}
