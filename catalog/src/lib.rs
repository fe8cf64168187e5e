//! Catalog loading for entity descriptors.
//!
//! A catalog declares entity shapes in a YAML or JSON file instead of Rust
//! code. This crate loads catalogs (single files or whole directories),
//! checks them by building a [`SchemaRegistry`](rowmap_core::SchemaRegistry),
//! and computes a stable fingerprint that storage drivers record to detect
//! schema drift.
//!
//! # Quick start
//!
//! ```no_run
//! use rowmap_catalog::Catalog;
//!
//! let catalog = Catalog::load("entities.yaml").unwrap();
//! let fingerprint = catalog.fingerprint().unwrap();
//! let registry = catalog.into_registry().unwrap();
//!
//! for entity in registry.entities() {
//!     println!("{} -> {}", entity.name, entity.table_name());
//! }
//! println!("fingerprint {fingerprint}");
//! ```

mod catalog;
mod error;

pub use catalog::{Catalog, CatalogFormat};
pub use error::{CatalogError, Result};
