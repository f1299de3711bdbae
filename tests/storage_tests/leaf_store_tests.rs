//! Tests for the Leaf Store
//!
//! These tests verify:
//! - add/get/has/update/delete round trips
//! - KeyAlreadyExists / KeyNotFound semantics
//! - Normalized keys in leaf files and colliding keys sharing a leaf
//! - Document counter bookkeeping
//! - Leaf file format and corruption handling

#[path = "../common/mod.rs"]
mod common;

use std::fs;

use common::{setup_temp_engine, user, User};
use fractalkv::storage::Leaf;
use fractalkv::{FractalError, JsonDocument};
use serde_json::json;

// =============================================================================
// CRUD Tests
// =============================================================================

#[test]
fn test_add_then_get() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    users.add_doc(&user(1)).unwrap();

    assert_eq!(users.get_doc("user-1").unwrap(), user(1));
}

#[test]
fn test_has_key_before_add_and_after_delete() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    assert!(!users.has_key("user-1").unwrap());
    users.add_doc(&user(1)).unwrap();
    assert!(users.has_key("user-1").unwrap());
    users.delete_doc("user-1").unwrap();
    assert!(!users.has_key("user-1").unwrap());
}

#[test]
fn test_get_after_delete_is_not_found() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    users.add_doc(&user(1)).unwrap();
    users.delete_doc("user-1").unwrap();

    assert!(matches!(users.get_doc("user-1"), Err(FractalError::KeyNotFound(_))));
}

#[test]
fn test_add_twice_fails() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    users.add_doc(&user(1)).unwrap();
    let result = users.add_doc(&user(1));

    assert!(matches!(result, Err(FractalError::KeyAlreadyExists(key)) if key == "user-1"));
    assert_eq!(users.estimated_document_count().unwrap(), 1);
}

#[test]
fn test_add_detects_existing_key_after_normalization() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    users.add_doc(&user(1)).unwrap();
    let mut shouty = user(1);
    shouty.key = "  USER-1 ".to_string();

    assert!(matches!(users.add_doc(&shouty), Err(FractalError::KeyAlreadyExists(_))));
    assert!(users.has_key("User-1").unwrap());
}

#[test]
fn test_update_existing_document() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    users.add_doc(&user(1)).unwrap();
    let mut changed = user(1);
    changed.first_name = "Georg".to_string();
    users.update_doc(&changed).unwrap();

    assert_eq!(users.get_doc("user-1").unwrap().first_name, "Georg");
    assert_eq!(users.estimated_document_count().unwrap(), 1);
}

#[test]
fn test_update_missing_key_fails() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    assert!(matches!(users.update_doc(&user(1)), Err(FractalError::KeyNotFound(_))));

    // Same leaf exists, key does not (user-72 collides with user-8 at 256 branches)
    users.add_doc(&user(8)).unwrap();
    assert!(matches!(users.update_doc(&user(72)), Err(FractalError::KeyNotFound(_))));
}

#[test]
fn test_delete_missing_key_fails() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    assert!(matches!(users.delete_doc("key missing"), Err(FractalError::KeyNotFound(_))));
    assert_eq!(users.estimated_document_count().unwrap(), 0);
}

#[test]
fn test_empty_key_is_rejected() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    let mut blank = user(1);
    blank.key = "  ".to_string();

    assert!(matches!(users.add_doc(&blank), Err(FractalError::EmptyKey)));
    assert!(matches!(users.get_doc(""), Err(FractalError::EmptyKey)));
    assert!(matches!(users.has_key(" "), Err(FractalError::EmptyKey)));
    assert!(matches!(users.delete_doc("\t"), Err(FractalError::EmptyKey)));
}

// =============================================================================
// Collision Tests
// =============================================================================

#[test]
fn test_colliding_keys_share_one_leaf() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    users.add_doc(&user(8)).unwrap();
    users.add_doc(&user(72)).unwrap();

    let (path_8, _) = users.leaf_path("user-8").unwrap();
    let (path_72, _) = users.leaf_path("user-72").unwrap();
    assert_eq!(path_8, path_72);

    let leaf = Leaf::load(&path_8).unwrap().unwrap();
    assert_eq!(leaf.len(), 2);

    users.delete_doc("user-8").unwrap();
    assert_eq!(users.get_doc("user-72").unwrap(), user(72));
}

#[test]
fn test_emptied_leaf_is_kept_as_empty_object() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    users.add_doc(&user(1)).unwrap();
    let (path, _) = users.leaf_path("user-1").unwrap();
    users.delete_doc("user-1").unwrap();

    assert!(path.exists());
    assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
}

// =============================================================================
// File Format Tests
// =============================================================================

#[test]
fn test_leaf_file_maps_normalized_key_to_document_string() {
    let (_temp, engine) = setup_temp_engine();
    let docs = engine.open_collection::<JsonDocument>("Docs").unwrap();

    docs.add_doc(&JsonDocument(json!({"key": "Key  Name", "n": 1}))).unwrap();

    let (path, prepared_key) = docs.leaf_path("key name").unwrap();
    assert_eq!(prepared_key, "key name");
    assert!(path.ends_with("Docs/d/1/leaf.json"));

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let stored = raw.get("key name").and_then(|v| v.as_str()).unwrap();
    let doc: serde_json::Value = serde_json::from_str(stored).unwrap();
    assert_eq!(doc, json!({"key": "Key  Name", "n": 1}));
}

#[test]
fn test_corrupt_leaf_is_reported() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    users.add_doc(&user(1)).unwrap();
    let (path, _) = users.leaf_path("user-1").unwrap();
    fs::write(&path, "{not json").unwrap();

    let err = users.get_doc("user-1").unwrap_err();
    assert!(matches!(err, FractalError::CorruptFile { .. }));
    assert!(err.is_io_failure());
}

#[test]
fn test_leaf_load_absent_and_blank() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("leaf.json");

    assert!(Leaf::load(&path).unwrap().is_none());

    fs::write(&path, "  \n").unwrap();
    assert!(Leaf::load(&path).unwrap().unwrap().is_empty());

    fs::write(&path, "null").unwrap();
    assert!(Leaf::load(&path).unwrap().unwrap().is_empty());
}

#[test]
fn test_leaf_persist_leaves_no_temp_files() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("leaf.json");

    let mut leaf = Leaf::new();
    leaf.insert("a".to_string(), "\"1\"".to_string());
    leaf.persist(&path).unwrap();
    leaf.insert("b".to_string(), "\"2\"".to_string());
    leaf.persist(&path).unwrap();

    let names: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["leaf.json".to_string()]);
    assert_eq!(Leaf::load(&path).unwrap().unwrap(), leaf);
}

// =============================================================================
// Document Key Tests
// =============================================================================

#[test]
fn test_json_document_key_must_be_a_string() {
    let (_temp, engine) = setup_temp_engine();
    let docs = engine.open_collection::<JsonDocument>("Docs").unwrap();

    let numeric = JsonDocument(json!({"key": 42}));
    let missing = JsonDocument(json!({"name": "x"}));

    assert!(matches!(docs.add_doc(&numeric), Err(FractalError::InvalidKeyType(_))));
    assert!(matches!(docs.add_doc(&missing), Err(FractalError::InvalidKeyType(_))));
}

// =============================================================================
// Counter Tests
// =============================================================================

#[test]
fn test_counter_tracks_single_document_operations() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    assert_eq!(users.estimated_document_count().unwrap(), 0);
    for num in 1..=5 {
        users.add_doc(&user(num)).unwrap();
    }
    assert_eq!(users.estimated_document_count().unwrap(), 5);

    users.delete_doc("user-2").unwrap();
    users.delete_doc("user-4").unwrap();
    assert_eq!(users.estimated_document_count().unwrap(), 3);
    assert_eq!(users.count_documents(|_| true).unwrap(), 3);
}

#[test]
fn test_concurrent_adds_to_distinct_branches() {
    let (_temp, engine) = setup_temp_engine();
    let users = engine.collection::<User>().unwrap();

    // user-1..9 land in nine different leaves
    std::thread::scope(|s| {
        for num in 1..10 {
            let users = &users;
            s.spawn(move || users.add_doc(&user(num)).unwrap());
        }
    });

    for num in 1..10 {
        assert_eq!(users.get_doc(&format!("user-{}", num)).unwrap(), user(num));
    }
    assert_eq!(users.count_documents(|_| true).unwrap(), 9);
}
