//! SQLite driver for rowmap entities.
//!
//! This crate is the storage side of the mapping layer: it executes the
//! statements built by [`rowmap_core`] against a [`rusqlite::Connection`],
//! converts values between logical types and SQLite storage classes, and
//! manages the tables a catalog describes.
//!
//! # Architecture
//!
//! - **`convert`**: `Value` to SQLite value conversion (timestamps as
//!   epoch milliseconds)
//! - **`store`**: typed CRUD over registered entities
//! - **`migration`**: table lifecycle (up/down/refresh/status) with
//!   catalog fingerprint tracking
//!
//! # Quick start
//!
//! ```
//! use rowmap_catalog::Catalog;
//! use rowmap_core::{Entity, Item, UNSET_KEY};
//! use rowmap_sqlite::{EntityStore, Migration};
//! use rusqlite::Connection;
//!
//! let catalog = Catalog::new("1").with_entity(Item::descriptor());
//! let mut migration = Migration::new(Connection::open_in_memory().unwrap(), catalog).unwrap();
//! migration.up().unwrap();
//!
//! let store = EntityStore::new(migration.connection(), migration.registry());
//! let item = store.persist(&Item::created_now(UNSET_KEY, "hello")).unwrap();
//! assert!(item.is_persisted());
//! assert_eq!(store.count::<Item>().unwrap(), 1);
//! ```

mod convert;
mod error;
mod migration;
mod store;

pub use error::{Result, SqliteError};
pub use migration::{META_TABLE, Migration, MigrationStatus, TableStatus};
pub use store::EntityStore;
