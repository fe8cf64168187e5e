//! Entity-to-table mapping and statement construction.
//!
//! This crate holds the storage-agnostic core:
//!
//! - [`SchemaRegistry`]: write-once registry of [`EntityDescriptor`]s,
//!   validated on registration.
//! - [`encode`] / [`decode`]: the row codec between [`Entity`] values and
//!   [`EncodedRow`]s, with [`assign_key`] for storage-generated keys.
//! - `build_*` functions: parameterized [`Statement`]s for insert, select,
//!   update, delete, and count.
//! - [`Query`] and [`Condition`]: filtered, ordered, and paged selects plus
//!   conditional update, delete, and count.
//! - [`create_table_sql`] and friends: table definitions from descriptors.
//! - [`Item`]: the reference entity.
//!
//! Nothing here performs I/O. Statements are handed to a storage driver such
//! as `rowmap-sqlite` for execution.
//!
//! # Example
//!
//! ```
//! use rowmap_core::*;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register_entity::<Item>().unwrap();
//! let item = registry.describe("Item").unwrap();
//!
//! // Encode a fresh item: the unset id becomes Null
//! let row = encode(item, &Item::created_now(UNSET_KEY, "hello")).unwrap();
//! assert!(row.get(0).unwrap().is_null());
//!
//! // The insert names only content and created_time
//! let insert = build_insert(item, &row).unwrap();
//! assert!(!insert.sql().contains(r#""id""#));
//!
//! // Lookups must use the key's logical type
//! assert!(build_select_by_key(item, &Value::Integer(1)).is_ok());
//! assert!(build_select_by_key(item, &Value::from("one")).is_err());
//! ```

mod codec;
mod ddl;
mod error;
mod item;
mod query;
mod registry;
mod statement;
mod types;
mod validate;

pub use codec::{Entity, Fields, FromValue, UNSET_KEY, assign_key, decode, encode};
pub use ddl::{create_index_sql, create_table_sql, drop_table_sql, storage_type};
pub use error::{MappingError, Result};
pub use item::Item;
pub use query::{
    Condition, Operator, Order, Query, build_count_where, build_delete_where, build_select_where,
    build_update_where,
};
pub use registry::SchemaRegistry;
pub use statement::{
    OnConflict, Statement, build_count, build_delete_by_key, build_insert, build_insert_with,
    build_select_all, build_select_by_key, build_update_by_key, quote_identifier,
};
pub use types::*;
pub use validate::{DescriptorError, ensure_valid, is_valid_identifier, validate_descriptor};
