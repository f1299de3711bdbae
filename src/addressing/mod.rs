//! Addressing Module
//!
//! Maps keys and branch indices to filesystem paths ("fractal-tree addressing").
//!
//! ## Responsibilities
//! - Normalize caller keys before hashing
//! - Hash normalized keys with CRC32
//! - Turn a branch index into a nested directory path
//!
//! ## Layout
//! ```text
//! crc32("key name") = a3a6d2d1
//!
//!   reduce_left = 0   {root}/{collection}/a/3/a/6/d/2/d/1/leaf.json
//!   reduce_left = 2   {root}/{collection}/a/6/d/2/d/1/leaf.json
//!   reduce_left = 4   {root}/{collection}/d/2/d/1/leaf.json
//!   reduce_left = 6   {root}/{collection}/d/1/leaf.json
//! ```
//!
//! Nothing in this module touches the filesystem.

mod branch;
mod key;

pub use branch::{branch_hex, branch_path, key_branch_index, key_branch_path, ReduceLeft};
pub use key::{key_hash, normalize_key};

/// Name of the document file inside a branch directory
pub const LEAF_FILENAME: &str = "leaf.json";

/// Name of the metadata file inside the branch-0 directory
pub const META_FILENAME: &str = "meta.json";
