//! Describing entities in catalog files.
//!
//! Writes the `Item` descriptor as YAML and JSON, loads both back, and
//! shows that they produce the same fingerprint and registry.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p rowmap-demos --example catalog_files
//! ```

use rowmap_catalog::Catalog;
use rowmap_core::{ColumnDescriptor, Entity, EntityDescriptor, Item, LogicalType};

fn main() {
    let dir = std::env::temp_dir().join("rowmap_catalog_example");
    std::fs::create_dir_all(&dir).unwrap();

    let tag = EntityDescriptor::new("Tag")
        .with_table("tags")
        .with_column(ColumnDescriptor::new("name", LogicalType::Text).primary_key())
        .with_column(ColumnDescriptor::new("color", LogicalType::Text).nullable().unique());

    let catalog = Catalog::new("1")
        .with_entity(Item::descriptor())
        .with_entity(tag);

    let yaml_path = dir.join("entities.yaml");
    let json_path = dir.join("entities.json");
    catalog.save(&yaml_path).unwrap();
    catalog.save(&json_path).unwrap();

    println!("=== {} ===", yaml_path.display());
    println!("{}", std::fs::read_to_string(&yaml_path).unwrap());

    let from_yaml = Catalog::load(&yaml_path).unwrap();
    let from_json = Catalog::load(&json_path).unwrap();
    println!("YAML fingerprint: {}", from_yaml.fingerprint().unwrap());
    println!("JSON fingerprint: {}", from_json.fingerprint().unwrap());

    let registry = from_yaml.into_registry().unwrap();
    println!("\nRegistered {} entities:", registry.len());
    for descriptor in registry.entities() {
        println!(
            "  {} -> {} ({} columns)",
            descriptor.name,
            descriptor.table_name(),
            descriptor.column_count()
        );
    }

    let _ = std::fs::remove_dir_all(&dir);
}
