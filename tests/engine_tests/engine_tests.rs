//! Tests for the Engine
//!
//! These tests verify:
//! - Collection naming and type binding
//! - list_collections / delete_collection / napalm
//! - Engine-level configuration

#[path = "../common/mod.rs"]
mod common;

use common::{setup_temp_engine, user, Car, User};
use fractalkv::{Config, Document, Engine, FractalError, JsonDocument, ReduceLeft};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Collection Naming Tests
// =============================================================================

#[test]
fn test_default_collection_name_is_type_name() {
    assert_eq!(User::collection_name(), "User");
    assert_eq!(Car::collection_name(), "Car");
    assert_eq!(JsonDocument::collection_name(), "JsonDocument");
}

#[test]
fn test_collection_names() {
    let (temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    assert_eq!(users.collection_name(), "User");
    assert_eq!(
        users.collection_full_name(),
        format!("{}/User", temp.path().display())
    );
    assert_eq!(users.root(), temp.path());
    assert_eq!(users.reduce_left(), ReduceLeft::Six);
}

#[test]
fn test_invalid_collection_names_are_rejected() {
    let (_temp, engine) = setup_temp_engine();

    for name in ["", ".", "..", "a/b", "a\\b"] {
        assert!(
            matches!(
                engine.open_collection::<User>(name),
                Err(FractalError::InvalidArgument(_))
            ),
            "{:?}",
            name
        );
    }
}

// =============================================================================
// Type Binding Tests
// =============================================================================

#[test]
fn test_same_type_can_reopen_collection() {
    let (_temp, engine) = setup_temp_engine();

    let first = engine.collection::<User>().unwrap();
    first.add_doc(&user(1)).unwrap();

    let second = engine.collection::<User>().unwrap();
    assert_eq!(second.get_doc("user-1").unwrap(), user(1));
}

#[test]
fn test_other_type_under_same_name_is_a_type_mismatch() {
    let (_temp, engine) = setup_temp_engine();

    engine.open_collection::<User>("Garage").unwrap();
    let result = engine.open_collection::<Car>("Garage");

    match result {
        Err(FractalError::TypeMismatch {
            collection,
            expected,
            found,
        }) => {
            assert_eq!(collection, "Garage");
            assert!(expected.ends_with("User"));
            assert!(found.ends_with("Car"));
        }
        Err(other) => panic!("expected TypeMismatch, got {:?}", other),
        Ok(_) => panic!("expected TypeMismatch"),
    }
}

#[test]
fn test_delete_collection_releases_binding() {
    let (_temp, engine) = setup_temp_engine();

    engine.open_collection::<User>("Garage").unwrap();
    engine.delete_collection("Garage").unwrap();

    let cars = engine.open_collection::<Car>("Garage").unwrap();
    assert_eq!(cars.estimated_document_count().unwrap(), 0);
}

// =============================================================================
// Collection Management Tests
// =============================================================================

#[test]
fn test_list_collections_is_sorted() {
    let (_temp, engine) = setup_temp_engine();
    assert!(engine.list_collections().unwrap().is_empty());

    engine.collection::<User>().unwrap();
    engine.collection::<Car>().unwrap();
    engine.open_collection::<JsonDocument>("Archive").unwrap();

    assert_eq!(engine.list_collections().unwrap(), vec!["Archive", "Car", "User"]);
}

#[test]
fn test_delete_collection_removes_documents() {
    let (temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();
    users.add_doc(&user(1)).unwrap();

    engine.delete_collection("User").unwrap();

    assert!(!temp.path().join("User").exists());
    assert!(engine.list_collections().unwrap().is_empty());

    let users = engine.collection::<User>().unwrap();
    assert!(!users.has_key("user-1").unwrap());
    assert_eq!(users.estimated_document_count().unwrap(), 0);
}

#[test]
fn test_delete_missing_collection_fails() {
    let (_temp, engine) = setup_temp_engine();

    assert!(matches!(
        engine.delete_collection("Nothing"),
        Err(FractalError::InvalidArgument(_))
    ));
}

#[test]
fn test_napalm_removes_root() {
    let (temp, engine) = setup_temp_engine();
    let docs = engine.open_collection::<JsonDocument>("Docs").unwrap();
    docs.add_doc(&JsonDocument(json!({"key": "a"}))).unwrap();

    engine.napalm().unwrap();

    assert!(!temp.path().exists());
    assert!(engine.list_collections().unwrap().is_empty());

    // Absent root is fine
    engine.napalm().unwrap();
}

#[test]
fn test_napalm_then_reopen() {
    let (_temp, engine) = setup_temp_engine();
    engine.collection::<User>().unwrap().add_doc(&user(1)).unwrap();

    engine.napalm().unwrap();

    let users = engine.collection::<User>().unwrap();
    assert_eq!(users.estimated_document_count().unwrap(), 0);
    users.add_doc(&user(1)).unwrap();
    assert_eq!(users.get_doc("user-1").unwrap(), user(1));
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_open_creates_root() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested/store");

    let engine = Engine::open_path(&root).unwrap();

    assert!(root.is_dir());
    assert_eq!(engine.root(), root.as_path());
    assert_eq!(engine.config().reduce_left, ReduceLeft::Six);
}

#[test]
fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.root, std::path::PathBuf::from("./FractalDB"));
    assert_eq!(config.reduce_left, ReduceLeft::Six);
    assert!(config.worker_count() >= 1);
    assert!(config.task_timeout().is_none());
}

#[test]
fn test_collections_follow_engine_fan_out() {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open(
        Config::builder()
            .root(temp.path())
            .reduce_left(ReduceLeft::Two)
            .max_workers(2)
            .build(),
    )
    .unwrap();

    let users = engine.collection::<User>().unwrap();
    users.add_doc(&user(3)).unwrap();

    let (path, _) = users.leaf_path("user-3").unwrap();
    let depth = path
        .strip_prefix(temp.path().join("User"))
        .unwrap()
        .components()
        .count();
    assert_eq!(depth, 7); // six digits + leaf.json
    assert_eq!(users.metadata().unwrap().max_branches, 16_777_216);
}
