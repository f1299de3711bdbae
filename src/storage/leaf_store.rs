//! Leaf Store
//!
//! Single-document CRUD against the leaf a key hashes into.
//!
//! ## Concurrency:
//! - Every operation runs inline on the caller's thread with blocking I/O
//! - Load → mutate → persist of one leaf is one logical step, but nothing is
//!   locked: two writers touching the same leaf (same or colliding keys) race
//!   and the last rename wins
//! - Operations on keys in different branches touch disjoint files

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::addressing::{branch_path, key_branch_path, ReduceLeft, LEAF_FILENAME};
use crate::error::{FractalError, Result};
use crate::meta::MetaManager;

use super::Leaf;

/// CRUD on the leaves of one collection
#[derive(Debug, Clone)]
pub struct LeafStore {
    root: PathBuf,
    collection: String,
    reduce_left: ReduceLeft,
    meta: MetaManager,
}

impl LeafStore {
    pub fn new(root: &Path, collection: &str, reduce_left: ReduceLeft, meta: MetaManager) -> Self {
        Self {
            root: root.to_path_buf(),
            collection: collection.to_string(),
            reduce_left,
            meta,
        }
    }

    /// Insert a new document
    ///
    /// Fails with `KeyAlreadyExists` if the normalized key is present.
    /// Bumps the document counter by one.
    pub fn add(&self, key: &str, doc: String) -> Result<()> {
        let (leaf_path, prepared_key) = self.leaf_path(key)?;

        // Branch directories are created lazily on first write
        if let Some(dir) = leaf_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let mut leaf = Leaf::load(&leaf_path)?.unwrap_or_default();
        if leaf.contains(&prepared_key) {
            return Err(FractalError::KeyAlreadyExists(prepared_key));
        }

        leaf.insert(prepared_key, doc);
        leaf.persist(&leaf_path)?;
        self.meta.bump(1)?;

        debug!(collection = %self.collection, key, "added document");
        Ok(())
    }

    /// Serialized document stored under `key`
    pub fn get(&self, key: &str) -> Result<String> {
        let (leaf_path, prepared_key) = self.leaf_path(key)?;

        Leaf::load(&leaf_path)?
            .and_then(|leaf| leaf.get(&prepared_key).map(str::to_string))
            .ok_or(FractalError::KeyNotFound(prepared_key))
    }

    /// Whether `key` is present; only I/O failures are errors
    pub fn has(&self, key: &str) -> Result<bool> {
        let (leaf_path, prepared_key) = self.leaf_path(key)?;

        Ok(Leaf::load(&leaf_path)?.is_some_and(|leaf| leaf.contains(&prepared_key)))
    }

    /// Overwrite an existing document
    pub fn update(&self, key: &str, doc: String) -> Result<()> {
        let (leaf_path, prepared_key) = self.leaf_path(key)?;

        let mut leaf = match Leaf::load(&leaf_path)? {
            Some(leaf) if leaf.contains(&prepared_key) => leaf,
            _ => return Err(FractalError::KeyNotFound(prepared_key)),
        };

        leaf.insert(prepared_key, doc);
        leaf.persist(&leaf_path)
    }

    /// Remove a document
    ///
    /// The leaf is rewritten even when it becomes empty (`{}`).
    /// Decrements the document counter by one.
    pub fn delete(&self, key: &str) -> Result<()> {
        let (leaf_path, prepared_key) = self.leaf_path(key)?;

        let mut leaf = Leaf::load(&leaf_path)?
            .ok_or_else(|| FractalError::KeyNotFound(prepared_key.clone()))?;
        if leaf.remove(&prepared_key).is_none() {
            return Err(FractalError::KeyNotFound(prepared_key));
        }

        leaf.persist(&leaf_path)?;
        self.meta.bump(-1)?;

        debug!(collection = %self.collection, key, "deleted document");
        Ok(())
    }

    // =========================================================================
    // Branch Access (used by the query engine)
    // =========================================================================

    /// Load the leaf of a branch, `None` if the branch was never written
    pub fn load_branch(&self, branch_index: u64) -> Result<Option<Leaf>> {
        Leaf::load(&self.branch_leaf_path(branch_index))
    }

    /// Rewrite the leaf of a branch
    pub fn persist_branch(&self, branch_index: u64, leaf: &Leaf) -> Result<()> {
        leaf.persist(&self.branch_leaf_path(branch_index))
    }

    /// Leaf file of a branch index
    pub fn branch_leaf_path(&self, branch_index: u64) -> PathBuf {
        branch_path(&self.root, &self.collection, branch_index, self.reduce_left).join(LEAF_FILENAME)
    }

    /// Leaf file a key resolves to, plus the normalized key
    pub fn leaf_path(&self, key: &str) -> Result<(PathBuf, String)> {
        let (dir, prepared_key) = key_branch_path(&self.root, &self.collection, key, self.reduce_left)?;
        Ok((dir.join(LEAF_FILENAME), prepared_key))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &MetaManager {
        &self.meta
    }

    pub fn reduce_left(&self) -> ReduceLeft {
        self.reduce_left
    }
}
