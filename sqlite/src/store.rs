//! Typed entity access over a SQLite connection.
//!
//! [`EntityStore`] is the storage collaborator for the core crate: it looks
//! up descriptors in a [`SchemaRegistry`], encodes entities, builds
//! statements, and executes them. Generated autoincrement keys are read
//! back with `last_insert_rowid` and written into the returned entity.
//!
//! # Example
//!
//! ```no_run
//! use rowmap_core::{Item, SchemaRegistry, UNSET_KEY};
//! use rowmap_sqlite::EntityStore;
//! use rusqlite::Connection;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register_entity::<Item>().unwrap();
//!
//! let conn = Connection::open("items.db").unwrap();
//! let store = EntityStore::new(&conn, &registry);
//!
//! let saved = store.persist(&Item::created_now(UNSET_KEY, "buy milk")).unwrap();
//! let loaded: Option<Item> = store.find(saved.id).unwrap();
//! assert_eq!(loaded, Some(saved));
//! ```

use rowmap_core::{
    Condition, Entity, EntityDescriptor, MappingError, OnConflict, Query, SchemaRegistry, Statement, Value,
    assign_key, build_count, build_count_where, build_delete_by_key, build_delete_where,
    build_insert_with, build_select_all, build_select_by_key, build_select_where,
    build_update_by_key, build_update_where, decode, encode,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use tracing::debug;

use crate::convert;
use crate::error::Result;

/// CRUD interface for registered entities.
///
/// Borrows both the connection and the registry; it holds no state of its
/// own and is cheap to construct per unit of work.
pub struct EntityStore<'a> {
    conn: &'a Connection,
    registry: &'a SchemaRegistry,
}

impl<'a> EntityStore<'a> {
    /// Creates a store over the given connection and registry.
    pub fn new(conn: &'a Connection, registry: &'a SchemaRegistry) -> Self {
        Self { conn, registry }
    }

    /// Returns the registry used for descriptor lookups.
    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    /// Inserts an entity and returns the row id SQLite assigned.
    ///
    /// For autoincrement entities inserted with an unset key this is the
    /// generated key. Otherwise it is the row id of the inserted row.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Mapping`](crate::SqliteError::Mapping) if the
    /// entity is not registered or cannot be encoded, and
    /// [`SqliteError::Database`](crate::SqliteError::Database) if the insert
    /// fails (for example on a constraint violation).
    pub fn insert<E: Entity>(&self, entity: &E) -> Result<i64> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let row = encode(descriptor, entity)?;
        let statement = build_insert_with(descriptor, &row, OnConflict::None)?;
        self.execute(&statement)?;
        let key = self.conn.last_insert_rowid();
        debug!(entity = %descriptor.name, key, "Inserted row");
        Ok(key)
    }

    /// Inserts an entity with a conflict resolution clause.
    ///
    /// Returns `None` when the conflict clause suppressed the insert
    /// (`OR IGNORE` on an existing key), otherwise the assigned row id.
    pub fn insert_with<E: Entity>(&self, entity: &E, on_conflict: OnConflict) -> Result<Option<i64>> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let row = encode(descriptor, entity)?;
        let statement = build_insert_with(descriptor, &row, on_conflict)?;
        if self.execute(&statement)? == 0 {
            debug!(entity = %descriptor.name, "Insert suppressed by conflict clause");
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    /// Inserts an entity and returns a copy carrying its stored key.
    ///
    /// Entities whose key was already set are returned unchanged.
    pub fn persist<E: Entity>(&self, entity: &E) -> Result<E> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let mut row = encode(descriptor, entity)?;
        let statement = build_insert_with(descriptor, &row, OnConflict::None)?;
        self.execute(&statement)?;
        let key = self.conn.last_insert_rowid();
        if assign_key(descriptor, &mut row, key)? {
            debug!(entity = %descriptor.name, key, "Assigned generated key");
        }
        Ok(decode(descriptor, row)?)
    }

    /// Loads the entity with the given key, or `None` if no row matches.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Mapping`](crate::SqliteError::Mapping) with
    /// `InvalidKey` if the key's type does not match the primary key column.
    pub fn find<E: Entity>(&self, key: impl Into<Value>) -> Result<Option<E>> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let statement = build_select_by_key(descriptor, &key.into())?;
        let mut rows = self.query(descriptor, &statement)?;
        match rows.pop() {
            Some(raw) => Ok(Some(self.decode_raw(descriptor, raw)?)),
            None => Ok(None),
        }
    }

    /// Loads the entity that `entity`'s association column points at.
    ///
    /// Returns `None` when the column is `NULL` or the referenced row is
    /// gone.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::Mapping`](crate::SqliteError::Mapping) with
    /// `UnknownColumn` if `E` has no such column, or `InvalidQuery` if the
    /// column does not reference `P`'s table.
    pub fn find_referenced<E: Entity, P: Entity>(&self, entity: &E, column: &str) -> Result<Option<P>> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let parent = self.registry.describe_entity::<P>()?;
        let declared = descriptor.column(column).ok_or_else(|| MappingError::UnknownColumn {
            entity: descriptor.name.clone(),
            column: column.to_string(),
        })?;
        if declared.references.as_deref() != Some(parent.table_name()) {
            return Err(MappingError::InvalidQuery {
                entity: descriptor.name.clone(),
                reason: format!("column '{column}' does not reference '{}'", parent.table_name()),
            }
            .into());
        }
        match entity.field(column) {
            Some(Value::Null) => Ok(None),
            Some(key) => self.find(key),
            None => Err(MappingError::FieldMissing {
                entity: descriptor.name.clone(),
                column: column.to_string(),
            }
            .into()),
        }
    }

    /// Loads every entity of type `E`, ordered by primary key.
    pub fn all<E: Entity>(&self) -> Result<Vec<E>> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let statement = build_select_all(descriptor)?;
        self.query(descriptor, &statement)?
            .into_iter()
            .map(|raw| self.decode_raw(descriptor, raw))
            .collect()
    }

    /// Rewrites every non-key column of the row keyed by the entity's key.
    ///
    /// Returns the number of rows changed (0 or 1).
    pub fn update<E: Entity>(&self, entity: &E) -> Result<usize> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let row = encode(descriptor, entity)?;
        let statement = build_update_by_key(descriptor, &row)?;
        let changed = self.execute(&statement)?;
        debug!(entity = %descriptor.name, changed, "Updated rows");
        Ok(changed)
    }

    /// Deletes the row with the given key and returns the number of rows
    /// removed (0 or 1).
    pub fn delete<E: Entity>(&self, key: impl Into<Value>) -> Result<usize> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let statement = build_delete_by_key(descriptor, &key.into())?;
        let removed = self.execute(&statement)?;
        debug!(entity = %descriptor.name, removed, "Deleted rows");
        Ok(removed)
    }

    /// Counts the rows in the entity's table.
    pub fn count<E: Entity>(&self) -> Result<usize> {
        let descriptor = self.registry.describe_entity::<E>()?;
        count_rows(self.conn, descriptor)
    }

    /// Loads the entities matching a [`Query`], in its order.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use rowmap_core::{Condition, Item, Order, Query};
    /// # use rowmap_sqlite::EntityStore;
    /// # fn latest(store: &EntityStore<'_>) -> rowmap_sqlite::Result<Vec<Item>> {
    /// let query = Query::new()
    ///     .filter(Condition::not_eq("content", ""))
    ///     .order_by("created_time", Order::Desc)
    ///     .limit(10);
    /// store.select::<Item>(&query)
    /// # }
    /// ```
    pub fn select<E: Entity>(&self, query: &Query) -> Result<Vec<E>> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let statement = build_select_where(descriptor, query)?;
        self.query(descriptor, &statement)?
            .into_iter()
            .map(|raw| self.decode_raw(descriptor, raw))
            .collect()
    }

    /// Loads the first entity matching a [`Query`], if any.
    pub fn first<E: Entity>(&self, query: &Query) -> Result<Option<E>> {
        Ok(self.select(&query.clone().limit(1))?.into_iter().next())
    }

    /// Counts the rows matching every condition.
    pub fn count_where<E: Entity>(&self, conditions: &[Condition]) -> Result<usize> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let statement = build_count_where(descriptor, conditions)?;
        let count: i64 = self.conn.query_row(
            statement.sql(),
            params_from_iter(convert::statement_params(&statement)),
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Sets the given columns on every matching row and returns the number
    /// of rows changed.
    pub fn update_where<E: Entity>(
        &self,
        assignments: &[(&str, Value)],
        conditions: &[Condition],
    ) -> Result<usize> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let statement = build_update_where(descriptor, assignments, conditions)?;
        let changed = self.execute(&statement)?;
        debug!(entity = %descriptor.name, changed, "Updated matching rows");
        Ok(changed)
    }

    /// Deletes every matching row and returns the number removed.
    pub fn delete_where<E: Entity>(&self, conditions: &[Condition]) -> Result<usize> {
        let descriptor = self.registry.describe_entity::<E>()?;
        let statement = build_delete_where(descriptor, conditions)?;
        let removed = self.execute(&statement)?;
        debug!(entity = %descriptor.name, removed, "Deleted matching rows");
        Ok(removed)
    }

    fn execute(&self, statement: &Statement) -> Result<usize> {
        let mut stmt = self.conn.prepare_cached(statement.sql())?;
        let changed = stmt.execute(params_from_iter(convert::statement_params(statement)))?;
        Ok(changed)
    }

    /// Runs a query and collects raw values first; conversion happens
    /// outside the rusqlite row closure.
    fn query(&self, descriptor: &EntityDescriptor, statement: &Statement) -> Result<Vec<Vec<SqlValue>>> {
        let width = descriptor.columns.len();
        let mut stmt = self.conn.prepare_cached(statement.sql())?;
        let rows = stmt
            .query_map(params_from_iter(convert::statement_params(statement)), |row| {
                (0..width)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn decode_raw<E: Entity>(&self, descriptor: &EntityDescriptor, raw: Vec<SqlValue>) -> Result<E> {
        let row = convert::read_row(descriptor, raw)?;
        Ok(decode(descriptor, row)?)
    }
}

/// Counts the rows in a descriptor's table.
pub(crate) fn count_rows(conn: &Connection, descriptor: &EntityDescriptor) -> Result<usize> {
    let statement = build_count(descriptor);
    let count: i64 = conn.query_row(statement.sql(), [], |row| row.get(0))?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rowmap_core::{Item, Order, UNSET_KEY, create_table_sql};

    use crate::error::SqliteError;

    fn setup() -> (Connection, SchemaRegistry) {
        let conn = Connection::open_in_memory().unwrap();
        let mut registry = SchemaRegistry::new();
        registry.register_entity::<Item>().unwrap();
        let sql = create_table_sql(registry.describe("Item").unwrap()).unwrap();
        conn.execute_batch(&sql).unwrap();
        (conn, registry)
    }

    #[test]
    fn test_insert_returns_generated_key() {
        let (conn, registry) = setup();
        let store = EntityStore::new(&conn, &registry);
        let first = store.insert(&Item::created_now(UNSET_KEY, "a")).unwrap();
        let second = store.insert(&Item::created_now(UNSET_KEY, "b")).unwrap();
        assert!(first > 0);
        assert_eq!(second, first + 1);
        assert_eq!(store.count::<Item>().unwrap(), 2);
    }

    #[test]
    fn test_find_missing_key() {
        let (conn, registry) = setup();
        let store = EntityStore::new(&conn, &registry);
        assert_eq!(store.find::<Item>(99).unwrap(), None);
    }

    #[test]
    fn test_find_with_wrong_key_type() {
        let (conn, registry) = setup();
        let store = EntityStore::new(&conn, &registry);
        assert!(matches!(
            store.find::<Item>("one"),
            Err(SqliteError::Mapping(MappingError::InvalidKey { .. }))
        ));
    }

    #[test]
    fn test_unregistered_entity() {
        let conn = Connection::open_in_memory().unwrap();
        let registry = SchemaRegistry::new();
        let store = EntityStore::new(&conn, &registry);
        assert!(matches!(
            store.count::<Item>(),
            Err(SqliteError::Mapping(MappingError::UnknownEntity(_)))
        ));
    }

    #[test]
    fn test_negative_key_never_stored() {
        let (conn, registry) = setup();
        let store = EntityStore::new(&conn, &registry);
        assert!(matches!(
            store.insert(&Item::created_now(-5, "a")),
            Err(SqliteError::Mapping(MappingError::InvalidKey { .. }))
        ));
        assert!(matches!(
            store.persist(&Item::created_now(-5, "a")),
            Err(SqliteError::Mapping(MappingError::InvalidKey { .. }))
        ));
        assert_eq!(store.count::<Item>().unwrap(), 0);
        assert_eq!(store.find::<Item>(-5).unwrap(), None);
    }

    #[test]
    fn test_insert_or_ignore_existing_key() {
        let (conn, registry) = setup();
        let store = EntityStore::new(&conn, &registry);
        let saved = store.persist(&Item::created_now(UNSET_KEY, "a")).unwrap();
        let again = store
            .insert_with(&Item::created_now(saved.id, "b"), OnConflict::Ignore)
            .unwrap();
        assert_eq!(again, None);
        assert_eq!(store.find::<Item>(saved.id).unwrap(), Some(saved));
    }

    /// Stores items 1..=5 with contents "a".."e" created one second apart.
    fn seeded() -> (Connection, SchemaRegistry) {
        let (conn, registry) = setup();
        {
            let store = EntityStore::new(&conn, &registry);
            for (i, content) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
                let created = Utc.timestamp_millis_opt(1_000 * (i as i64 + 1)).unwrap();
                store.insert(&Item::new(UNSET_KEY, content, created)).unwrap();
            }
        }
        (conn, registry)
    }

    fn ids(items: Vec<Item>) -> Vec<i64> {
        items.into_iter().map(|item| item.id).collect()
    }

    #[test]
    fn test_select_each_operator() {
        let (conn, registry) = seeded();
        let store = EntityStore::new(&conn, &registry);
        let run = |condition: Condition| ids(store.select(&Query::new().filter(condition)).unwrap());

        assert_eq!(run(Condition::eq("id", 3)), vec![3]);
        assert_eq!(run(Condition::not_eq("id", 3)), vec![1, 2, 4, 5]);
        assert_eq!(run(Condition::lt("id", 3)), vec![1, 2]);
        assert_eq!(run(Condition::le("id", 3)), vec![1, 2, 3]);
        assert_eq!(run(Condition::gt("id", 3)), vec![4, 5]);
        assert_eq!(run(Condition::ge("id", 3)), vec![3, 4, 5]);
        assert_eq!(run(Condition::in_list("content", ["b", "e", "z"])), vec![2, 5]);
        assert_eq!(run(Condition::not_in("content", ["b", "e"])), vec![1, 3, 4]);
        assert_eq!(run(Condition::in_list("id", Vec::<i64>::new())), Vec::<i64>::new());
        assert_eq!(
            run(Condition::between(
                "created_time",
                Utc.timestamp_millis_opt(2_000).unwrap(),
                Utc.timestamp_millis_opt(4_000).unwrap(),
            )),
            vec![2, 3, 4]
        );
        assert_eq!(run(Condition::is_not_null("content")), vec![1, 2, 3, 4, 5]);
        assert_eq!(run(Condition::is_null("content")), Vec::<i64>::new());
    }

    #[test]
    fn test_select_order_limit_offset() {
        let (conn, registry) = seeded();
        let store = EntityStore::new(&conn, &registry);
        let newest_first = Query::new().order_by("created_time", Order::Desc);
        assert_eq!(ids(store.select(&newest_first).unwrap()), vec![5, 4, 3, 2, 1]);
        assert_eq!(
            ids(store.select(&newest_first.clone().limit(2).offset(1)).unwrap()),
            vec![4, 3]
        );
        assert_eq!(ids(store.select(&Query::new().offset(3)).unwrap()), vec![4, 5]);
        let first = store.first::<Item>(&newest_first).unwrap().unwrap();
        assert_eq!(first.content, "e");
    }

    #[test]
    fn test_count_update_delete_where() {
        let (conn, registry) = seeded();
        let store = EntityStore::new(&conn, &registry);
        assert_eq!(store.count_where::<Item>(&[Condition::gt("id", 2)]).unwrap(), 3);

        let changed = store
            .update_where::<Item>(&[("content", Value::from("done"))], &[Condition::in_list("id", [1, 2])])
            .unwrap();
        assert_eq!(changed, 2);
        assert_eq!(store.count_where::<Item>(&[Condition::eq("content", "done")]).unwrap(), 2);

        let removed = store.delete_where::<Item>(&[Condition::eq("content", "done")]).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(ids(store.all().unwrap()), vec![3, 4, 5]);
        assert_eq!(store.delete_where::<Item>(&[]).unwrap(), 3);
        assert_eq!(store.count::<Item>().unwrap(), 0);
    }

    #[test]
    fn test_query_errors_touch_nothing() {
        let (conn, registry) = seeded();
        let store = EntityStore::new(&conn, &registry);
        assert!(matches!(
            store.delete_where::<Item>(&[Condition::eq("id", "one")]),
            Err(SqliteError::Mapping(MappingError::TypeMismatch { .. }))
        ));
        assert!(matches!(
            store.update_where::<Item>(&[("id", Value::Integer(9))], &[]),
            Err(SqliteError::Mapping(MappingError::InvalidQuery { .. }))
        ));
        assert_eq!(store.count::<Item>().unwrap(), 5);
    }
}
