//! Error types for mapping operations.
//!
//! Every variant reports a mismatch between a declared schema and the data
//! handed to it. None of them are transient; callers should treat them as
//! programming or configuration defects.

use thiserror::Error;

use crate::types::LogicalType;
use crate::validate::DescriptorError;

/// Errors raised by the registry, the row codec, and the statement builders.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// No descriptor is registered under the requested name.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// A descriptor with the same entity name is already registered.
    #[error("entity already registered: {0}")]
    DuplicateEntity(String),

    /// The descriptor violates a structural rule.
    #[error("invalid descriptor for entity '{entity}': {reason}")]
    InvalidDescriptor {
        /// Entity name.
        entity: String,
        /// First rule violated.
        reason: DescriptorError,
    },

    /// A declared column has no matching field on the entity value.
    #[error("entity '{entity}' has no field for column '{column}'")]
    FieldMissing {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
    },

    /// A row's length differs from the descriptor's column count.
    #[error("row for entity '{entity}' has {found} value(s), expected {expected}")]
    RowShape {
        /// Entity name.
        entity: String,
        /// Declared column count.
        expected: usize,
        /// Actual row length.
        found: usize,
    },

    /// A value's runtime type disagrees with its column's logical type.
    #[error("column '{column}' of entity '{entity}' expects {expected}, found {found}")]
    TypeMismatch {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
        /// Declared logical type.
        expected: LogicalType,
        /// Runtime type name of the offending value.
        found: &'static str,
    },

    /// A lookup key's type disagrees with the primary key column.
    #[error("key for entity '{entity}' must be {expected}, found {found}")]
    InvalidKey {
        /// Entity name.
        entity: String,
        /// Primary key logical type.
        expected: LogicalType,
        /// Runtime type name of the offending key.
        found: &'static str,
    },

    /// A condition or assignment names a column the entity does not declare.
    #[error("entity '{entity}' has no column '{column}'")]
    UnknownColumn {
        /// Entity name.
        entity: String,
        /// Column name.
        column: String,
    },

    /// A conditional statement cannot be built as requested.
    #[error("invalid query on entity '{entity}': {reason}")]
    InvalidQuery {
        /// Entity name.
        entity: String,
        /// What was wrong with the request.
        reason: String,
    },
}

/// Convenience alias for results with [`MappingError`].
pub type Result<T> = std::result::Result<T, MappingError>;
