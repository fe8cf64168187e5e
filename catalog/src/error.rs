//! Error types for catalog operations.
//!
//! Covers file access, YAML/JSON parsing, and descriptor validation failures
//! surfaced while building a registry.

use thiserror::Error;

/// Errors that can occur while loading or using a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A descriptor was rejected by the schema registry.
    #[error("mapping error: {0}")]
    Mapping(#[from] rowmap_core::MappingError),

    /// File extension is not one of `yaml`, `yml`, or `json`.
    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(String),

    /// Catalog version string is empty.
    #[error("catalog version cannot be empty")]
    EmptyVersion,

    /// Catalog files in one directory declare different versions.
    #[error("catalog version mismatch: expected '{expected}', found '{found}'")]
    VersionMismatch {
        /// Version of the first file loaded.
        expected: String,
        /// Conflicting version.
        found: String,
    },

    /// A directory contained no catalog files.
    #[error("no catalog files found in {0}")]
    Empty(String),
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
