//! End-to-end `Item` persistence with SQLite.
//!
//! Demonstrates the complete lifecycle: creating tables from a catalog,
//! inserting items with generated keys, querying, updating, deleting, and
//! dropping the tables again.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p rowmap-demos --example sqlite_store
//! ```

use chrono::Utc;
use rowmap_catalog::Catalog;
use rowmap_core::{Condition, Entity, Item, Order, Query, UNSET_KEY, Value};
use rowmap_sqlite::{EntityStore, Migration};
use rusqlite::Connection;

fn main() {
    // === Step 1: Create tables ===
    println!("=== Migration ===");
    let catalog = Catalog::new("1").with_entity(Item::descriptor());
    let conn = Connection::open_in_memory().unwrap();
    let mut migration = Migration::new(conn, catalog).unwrap();

    let status = migration.status().unwrap();
    println!("Before up(): tables_exist={}", status.tables_exist());
    migration.up().unwrap();
    let status = migration.status().unwrap();
    println!(
        "After up(): tables_exist={} fingerprint_matches={}",
        status.tables_exist(),
        status.fingerprint_matches()
    );

    // === Step 2: Insert ===
    println!("\n=== Insert ===");
    {
        let store = EntityStore::new(migration.connection(), migration.registry());
        for content in ["buy milk", "water plants", "call mom"] {
            let saved = store.persist(&Item::created_now(UNSET_KEY, content)).unwrap();
            println!("  saved #{} {:?} at {}", saved.id, saved.content, saved.created_time);
        }

        // === Step 3: Query ===
        println!("\n=== Query ===");
        let items: Vec<Item> = store.all().unwrap();
        println!("items stored: {}", items.len());
        if let Some(first) = store.find::<Item>(items[0].id).unwrap() {
            println!("  first: {:?}", first.content);
        }

        let recent = Query::new()
            .filter(Condition::not_eq("content", "call mom"))
            .order_by("created_time", Order::Desc)
            .limit(2);
        for item in store.select::<Item>(&recent).unwrap() {
            println!("  recent: #{} {:?}", item.id, item.content);
        }
        let marked = store
            .update_where::<Item>(
                &[("content", Value::from("done"))],
                &[Condition::in_list("content", ["buy milk"])],
            )
            .unwrap();
        println!("  rows marked done: {marked}");

        // === Step 4: Update and delete ===
        println!("\n=== Update / Delete ===");
        let edited = Item::new(items[1].id, "water all plants", Utc::now());
        println!("  rows updated: {}", store.update(&edited).unwrap());
        println!("  rows deleted: {}", store.delete::<Item>(items[2].id).unwrap());
        for item in store.all::<Item>().unwrap() {
            println!("  #{} {:?}", item.id, item.content);
        }
    }

    // === Step 5: Cleanup ===
    println!("\n=== Cleanup ===");
    let status = migration.status().unwrap();
    println!("Rows before down(): {}", status.total_rows());
    migration.down().unwrap();
    println!(
        "After down(): tables_exist={}",
        migration.status().unwrap().tables_exist()
    );
}
