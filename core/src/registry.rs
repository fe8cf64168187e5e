//! Write-once registry of entity descriptors.
//!
//! Descriptors are registered through `&mut self` during initialization.
//! Once setup is done the registry is shared by reference (typically behind
//! an [`Arc`](std::sync::Arc)), and the borrow checker keeps it read-only
//! from then on. Lookups are O(1) via an internal name index.

use std::collections::HashMap;

use tracing::debug;

use crate::codec::Entity;
use crate::error::{MappingError, Result};
use crate::types::EntityDescriptor;
use crate::validate::{DescriptorError, ensure_valid, invalid};

/// Holds one validated [`EntityDescriptor`] per entity type.
///
/// # Examples
///
/// ```
/// use rowmap_core::{Item, MappingError, SchemaRegistry};
///
/// let mut registry = SchemaRegistry::new();
/// registry.register_entity::<Item>().unwrap();
///
/// let item = registry.describe("Item").unwrap();
/// assert!(item.autoincrement);
///
/// assert!(matches!(
///     registry.describe("Missing"),
///     Err(MappingError::UnknownEntity(_))
/// ));
/// ```
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    entities: Vec<EntityDescriptor>,
    by_name: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a sequence of descriptors.
    ///
    /// # Errors
    ///
    /// Fails on the first descriptor that [`register`](Self::register)
    /// rejects.
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = EntityDescriptor>,
    {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Registers a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::DuplicateEntity`] if the entity name is taken,
    /// or [`MappingError::InvalidDescriptor`] if the descriptor breaks a
    /// structural rule (zero or several primary keys, bad identifiers, a
    /// table already mapped by another entity, ...).
    pub fn register(&mut self, descriptor: EntityDescriptor) -> Result<()> {
        if self.by_name.contains_key(&descriptor.name) {
            return Err(MappingError::DuplicateEntity(descriptor.name));
        }
        ensure_valid(&descriptor)?;

        let table = descriptor.table_name();
        if self.entities.iter().any(|e| e.table_name() == table) {
            return Err(invalid(
                &descriptor,
                DescriptorError::TableInUse(table.to_string()),
            ));
        }
        self.check_references(&descriptor)?;

        debug!(
            entity = %descriptor.name,
            table = %table,
            columns = descriptor.columns.len(),
            autoincrement = descriptor.autoincrement,
            "Registered entity"
        );

        self.by_name
            .insert(descriptor.name.clone(), self.entities.len());
        self.entities.push(descriptor);
        Ok(())
    }

    /// Checks that every referenced table is the descriptor's own or an
    /// already registered one, with a key of the column's type.
    fn check_references(&self, descriptor: &EntityDescriptor) -> Result<()> {
        for column in &descriptor.columns {
            let Some(target) = &column.references else {
                continue;
            };
            let parent = if target == descriptor.table_name() {
                Some(descriptor)
            } else {
                self.entities.iter().find(|e| e.table_name() == target)
            };
            let key_type = parent.and_then(|p| p.primary_key()).map(|k| k.logical_type);
            if key_type != Some(column.logical_type) {
                return Err(invalid(
                    descriptor,
                    DescriptorError::InvalidReference {
                        column: column.name.clone(),
                        table: target.clone(),
                    },
                ));
            }
        }
        Ok(())
    }

    /// Registers the descriptor declared by an [`Entity`] implementation.
    pub fn register_entity<E: Entity>(&mut self) -> Result<()> {
        self.register(E::descriptor())
    }

    /// Returns the descriptor registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::UnknownEntity`] if nothing was registered
    /// under that name.
    pub fn describe(&self, name: &str) -> Result<&EntityDescriptor> {
        self.by_name
            .get(name)
            .map(|&i| &self.entities[i])
            .ok_or_else(|| MappingError::UnknownEntity(name.to_string()))
    }

    /// Returns the descriptor registered for entity type `E`.
    pub fn describe_entity<E: Entity>(&self) -> Result<&EntityDescriptor> {
        self.describe(E::NAME)
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterates over descriptors in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.iter()
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
