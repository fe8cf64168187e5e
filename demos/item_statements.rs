//! Statement construction for the `Item` entity without a database.
//!
//! Registers `Item`, encodes a fresh and a persisted instance, and prints
//! the DDL and parameterized statements the builder produces.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p rowmap-demos --example item_statements
//! ```

use rowmap_core::{
    Entity, Item, OnConflict, SchemaRegistry, UNSET_KEY, Value, build_count, build_delete_by_key,
    build_insert, build_insert_with, build_select_all, build_select_by_key, build_update_by_key,
    create_index_sql, create_table_sql, decode, encode,
};

fn main() {
    let mut registry = SchemaRegistry::new();
    registry.register_entity::<Item>().unwrap();
    let descriptor = registry.describe(Item::NAME).unwrap();

    println!("=== DDL ===");
    println!("{};", create_table_sql(descriptor).unwrap());
    for index in create_index_sql(descriptor).unwrap() {
        println!("{index};");
    }

    println!("\n=== New item (key unset) ===");
    let fresh = Item::created_now(UNSET_KEY, "buy milk");
    let row = encode(descriptor, &fresh).unwrap();
    println!("encoded: {:?}", row.values());
    println!("{}", build_insert(descriptor, &row).unwrap());

    println!("\n=== Persisted item ===");
    let saved = Item::new(7, "buy bread", fresh.created_time);
    let row = encode(descriptor, &saved).unwrap();
    println!("{}", build_insert_with(descriptor, &row, OnConflict::Replace).unwrap());
    println!("{}", build_update_by_key(descriptor, &row).unwrap());
    println!("{}", build_select_by_key(descriptor, &Value::Integer(saved.id)).unwrap());
    println!("{}", build_delete_by_key(descriptor, &Value::Integer(saved.id)).unwrap());
    println!("{}", build_select_all(descriptor).unwrap());
    println!("{}", build_count(descriptor));

    let decoded: Item = decode(descriptor, row).unwrap();
    assert_eq!(decoded, saved);
    println!("\nDecoded row matches the original item.");

    println!("\n=== Errors ===");
    match build_select_by_key(descriptor, &Value::from("seven")) {
        Ok(_) => println!("unexpected success"),
        Err(err) => println!("text key rejected: {err}"),
    }
    match registry.describe("Order") {
        Ok(_) => println!("unexpected success"),
        Err(err) => println!("unknown entity rejected: {err}"),
    }
}
