//! Catalog files: entity descriptors declared outside code.
//!
//! A catalog is a versioned list of [`EntityDescriptor`]s stored as YAML or
//! JSON. It is the file-based counterpart of [`Entity::descriptor`]
//! and is turned into a [`SchemaRegistry`] once at startup.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1"
//! entities:
//!   - name: Item
//!     autoincrement: true
//!     columns:
//!       - { name: id, type: integer, primary_key: true }
//!       - { name: content, type: text }
//!       - { name: created_time, type: timestamp }
//! ```
//!
//! [`Entity::descriptor`]: rowmap_core::Entity::descriptor

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use rowmap_core::{EntityDescriptor, SchemaRegistry};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};

/// On-disk encoding of a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    /// `.yaml` or `.yml`
    Yaml,
    /// `.json`
    Json,
}

impl CatalogFormat {
    /// Detects the format from a file extension.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(CatalogError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// A versioned list of entity descriptors.
///
/// # Examples
///
/// ```
/// use rowmap_catalog::Catalog;
/// use rowmap_core::{Entity, Item};
///
/// let catalog = Catalog::new("1").with_entity(Item::descriptor());
/// let registry = catalog.to_registry().unwrap();
/// assert!(registry.contains("Item"));
/// assert_eq!(catalog.fingerprint().unwrap().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Catalog format version chosen by the author.
    pub version: String,
    /// Entity descriptors in registration order.
    #[serde(default)]
    pub entities: Vec<EntityDescriptor>,
}

impl Catalog {
    /// Creates an empty catalog.
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            entities: Vec::new(),
        }
    }

    /// Appends an entity descriptor.
    pub fn with_entity(mut self, descriptor: EntityDescriptor) -> Self {
        self.entities.push(descriptor);
        self
    }

    /// Parses a YAML catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Yaml`] on malformed input or
    /// [`CatalogError::EmptyVersion`] if `version` is blank.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let catalog: Self = serde_yaml::from_str(raw)?;
        catalog.check_version()?;
        Ok(catalog)
    }

    /// Parses a JSON catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] on malformed input or
    /// [`CatalogError::EmptyVersion`] if `version` is blank.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(raw)?;
        catalog.check_version()?;
        Ok(catalog)
    }

    /// Loads a catalog file, choosing the parser by extension.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedFormat`] for unknown extensions,
    /// [`CatalogError::Io`] if the file cannot be read, or a parse error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = CatalogFormat::from_path(path)?;
        let reader = BufReader::new(std::fs::File::open(path)?);
        let catalog: Self = match format {
            CatalogFormat::Yaml => serde_yaml::from_reader(reader)?,
            CatalogFormat::Json => serde_json::from_reader(reader)?,
        };
        catalog.check_version()?;

        info!(
            path = %path.display(),
            entities = catalog.entities.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Loads every `*.yaml`, `*.yml`, and `*.json` file in a directory and
    /// merges their entities in file name order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Empty`] if the directory holds no catalog
    /// files, [`CatalogError::VersionMismatch`] if the files disagree on
    /// `version`, or any error from [`load`](Self::load).
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && CatalogFormat::from_path(p).is_ok())
            .collect();
        paths.sort();

        let mut merged: Option<Catalog> = None;
        for path in &paths {
            let catalog = Self::load(path)?;
            match merged.as_mut() {
                None => merged = Some(catalog),
                Some(acc) => {
                    if acc.version != catalog.version {
                        return Err(CatalogError::VersionMismatch {
                            expected: acc.version.clone(),
                            found: catalog.version,
                        });
                    }
                    acc.entities.extend(catalog.entities);
                }
            }
        }

        merged.ok_or_else(|| CatalogError::Empty(dir.display().to_string()))
    }

    /// Writes the catalog, choosing the encoding by extension.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnsupportedFormat`] for unknown extensions,
    /// [`CatalogError::Io`] if the file cannot be written, or a
    /// serialization error.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = CatalogFormat::from_path(path)?;
        let writer = BufWriter::new(std::fs::File::create(path)?);
        match format {
            CatalogFormat::Yaml => serde_yaml::to_writer(writer, self)?,
            CatalogFormat::Json => serde_json::to_writer_pretty(writer, self)?,
        }
        Ok(())
    }

    /// Builds a registry from a copy of the catalog's entities.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Mapping`] with the registry's
    /// `DuplicateEntity` or `InvalidDescriptor` error for the first
    /// offending entity.
    pub fn to_registry(&self) -> Result<SchemaRegistry> {
        Ok(SchemaRegistry::from_descriptors(self.entities.iter().cloned())?)
    }

    /// Consumes the catalog and builds a registry.
    pub fn into_registry(self) -> Result<SchemaRegistry> {
        Ok(SchemaRegistry::from_descriptors(self.entities)?)
    }

    /// Returns the lowercase hex SHA-256 of the canonical JSON encoding of
    /// the entity list.
    ///
    /// The fingerprint ignores `version` and the source format, so the same
    /// entities loaded from YAML or JSON hash identically.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&self.entities)?;
        let hash = Sha256::digest(&canonical);
        let fingerprint = format!("{:x}", hash);
        debug!(fingerprint = %fingerprint, "Computed catalog fingerprint");
        Ok(fingerprint)
    }

    /// Returns the number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the catalog declares no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn check_version(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(CatalogError::EmptyVersion);
        }
        Ok(())
    }
}
