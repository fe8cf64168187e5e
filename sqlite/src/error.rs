//! Error types for SQLite driver operations.
//!
//! Provides a unified error type covering database access, row mapping,
//! value conversion, and migration failures.

use thiserror::Error;

/// Errors that can occur during SQLite driver operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Descriptor lookup, encoding, or decoding failure.
    #[error("mapping error: {0}")]
    Mapping(#[from] rowmap_core::MappingError),

    /// A stored value could not be converted to its column's logical type.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    Migration(String),

    /// Catalog could not be turned into a registry or fingerprinted.
    #[error("catalog error: {0}")]
    Catalog(#[from] rowmap_catalog::CatalogError),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
