use std::path::Path;

use rowmap_catalog::{Catalog, CatalogError};
use rowmap_core::{
    ColumnDescriptor, DescriptorError, Entity, EntityDescriptor, Item, LogicalType, MappingError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn todo_descriptor() -> EntityDescriptor {
    EntityDescriptor::new("Todo")
        .with_table("todos")
        .with_column(ColumnDescriptor::new("uuid", LogicalType::Text).primary_key())
        .with_column(ColumnDescriptor::new("title", LogicalType::Text).indexed())
        .with_column(ColumnDescriptor::new("done_at", LogicalType::Timestamp).nullable())
}

fn write(dir: &Path, name: &str, contents: &str) {
    std::fs::write(dir.join(name), contents).unwrap();
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

#[test]
fn test_yaml_and_json_share_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::new("1")
        .with_entity(Item::descriptor())
        .with_entity(todo_descriptor());

    let yaml = dir.path().join("entities.yaml");
    let json = dir.path().join("entities.json");
    catalog.save(&yaml).unwrap();
    catalog.save(&json).unwrap();

    let from_yaml = Catalog::load(&yaml).unwrap();
    let from_json = Catalog::load(&json).unwrap();
    assert_eq!(from_yaml, catalog);
    assert_eq!(from_json, catalog);
    assert_eq!(
        from_yaml.fingerprint().unwrap(),
        from_json.fingerprint().unwrap()
    );
}

#[test]
fn test_load_hand_written_yaml() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "item.yml",
        r#"
version: "1"
entities:
  - name: Item
    autoincrement: true
    columns:
      - name: id
        type: integer
        primary_key: true
      - name: content
        type: text
      - name: created_time
        type: timestamp
"#,
    );

    let catalog = Catalog::load(dir.path().join("item.yml")).unwrap();
    let registry = catalog.into_registry().unwrap();
    assert_eq!(registry.describe("Item").unwrap(), &Item::descriptor());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Catalog::load(dir.path().join("absent.yaml")),
        Err(CatalogError::Io(_))
    ));
}

#[test]
fn test_load_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "entities.toml", "version = '1'");
    assert!(matches!(
        Catalog::load(dir.path().join("entities.toml")),
        Err(CatalogError::UnsupportedFormat(_))
    ));
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

#[test]
fn test_from_dir_merges_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    Catalog::new("1")
        .with_entity(todo_descriptor())
        .save(dir.path().join("b_todo.json"))
        .unwrap();
    Catalog::new("1")
        .with_entity(Item::descriptor())
        .save(dir.path().join("a_item.yaml"))
        .unwrap();
    write(dir.path(), "README.md", "not a catalog");

    let catalog = Catalog::from_dir(dir.path()).unwrap();
    let names: Vec<_> = catalog.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Item", "Todo"]);
    assert_eq!(catalog.len(), 2);
}

#[test]
fn test_from_dir_version_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    Catalog::new("1")
        .with_entity(Item::descriptor())
        .save(dir.path().join("a.yaml"))
        .unwrap();
    Catalog::new("2")
        .with_entity(todo_descriptor())
        .save(dir.path().join("b.yaml"))
        .unwrap();

    match Catalog::from_dir(dir.path()) {
        Err(CatalogError::VersionMismatch { expected, found }) => {
            assert_eq!(expected, "1");
            assert_eq!(found, "2");
        }
        other => panic!("expected version mismatch, got {other:?}"),
    }
}

#[test]
fn test_from_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Catalog::from_dir(dir.path()),
        Err(CatalogError::Empty(_))
    ));
}

// ---------------------------------------------------------------------------
// Registry construction
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_descriptor_surfaces_as_mapping_error() {
    let raw = r#"{
        "version": "1",
        "entities": [{
            "name": "Broken",
            "columns": [
                {"name": "a", "type": "integer", "primary_key": true},
                {"name": "b", "type": "integer", "primary_key": true}
            ]
        }]
    }"#;
    let catalog = Catalog::from_json_str(raw).unwrap();
    match catalog.to_registry() {
        Err(CatalogError::Mapping(MappingError::InvalidDescriptor { entity, reason })) => {
            assert_eq!(entity, "Broken");
            assert!(matches!(reason, DescriptorError::MultiplePrimaryKeys(_)));
        }
        other => panic!("expected invalid descriptor, got {other:?}"),
    }
}

#[test]
fn test_empty_catalog_builds_empty_registry() {
    let catalog = Catalog::from_yaml_str("version: \"1\"\n").unwrap();
    assert!(catalog.is_empty());
    assert!(catalog.to_registry().unwrap().is_empty());
}
