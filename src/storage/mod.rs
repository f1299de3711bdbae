//! Storage Module
//!
//! Persistent document storage, one JSON leaf file per branch.
//!
//! ## Responsibilities
//! - Load and persist leaf files
//! - Single-document add/get/has/update/delete
//! - Branch-level load/persist for full scans
//!
//! ## Leaf File Format
//! ```text
//! {root}/{collection}/d/1/leaf.json
//! ┌────────────────────────────────────────────────┐
//! │ {                                              │
//! │   "key name":    "{\"key\":\"key name\",...}",   │
//! │   "other key":   "{\"key\":\"other key\",...}"   │
//! │ }                                              │
//! └────────────────────────────────────────────────┘
//! ```
//! Keys are normalized keys; values are serialized documents. Several keys
//! share a leaf whenever their hashes collide after truncation.

mod leaf;
mod leaf_store;

pub use leaf::Leaf;
pub(crate) use leaf::write_atomic;
pub use leaf_store::LeafStore;
