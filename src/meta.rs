//! Metadata Module
//!
//! One `meta.json` per collection, stored in the branch-0 directory.
//!
//! ```text
//! {"root":"./FractalDB","collectionName":"User","reduceLeft":6,"maxBranches":256,"documentCount":9}
//! ```
//!
//! `documentCount` is advisory. `bump` is a plain read-modify-write with no
//! locking, so concurrent writers can lose updates; a full
//! `count_documents` scan is the authoritative count.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::addressing::{branch_path, ReduceLeft, META_FILENAME};
use crate::error::{FractalError, Result};
use crate::storage::write_atomic;

/// Metadata record of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub root: String,
    pub collection_name: String,
    pub reduce_left: u8,
    pub max_branches: u64,
    pub document_count: u64,
}

/// Reads and writes a collection's metadata file
#[derive(Debug, Clone)]
pub struct MetaManager {
    /// `{root}/{collection}/{branch 0}/meta.json`
    path: PathBuf,
}

impl MetaManager {
    /// Open the metadata of a collection, creating it on first access
    ///
    /// Fails with `Config` if the collection already exists with another
    /// fan-out: every stored address would resolve to the wrong branch.
    /// The branch-0 directory is as deep as the fan-out, so the metadata of
    /// every fan-out is looked for before anything is created. A collection
    /// directory without any metadata file is refused as well.
    pub fn open_or_create(root: &Path, collection: &str, reduce_left: ReduceLeft) -> Result<Self> {
        let dir = branch_path(root, collection, 0, reduce_left);
        let manager = Self {
            path: dir.join(META_FILENAME),
        };

        if manager.path.exists() {
            let meta = manager.get()?;
            if meta.reduce_left != u8::from(reduce_left) {
                return Err(Self::fan_out_mismatch(collection, meta.reduce_left, reduce_left));
            }
            return Ok(manager);
        }

        for other in ReduceLeft::ALL.into_iter().filter(|r| *r != reduce_left) {
            let found = Self {
                path: branch_path(root, collection, 0, other).join(META_FILENAME),
            };
            if found.path.exists() {
                let meta = found.get()?;
                return Err(Self::fan_out_mismatch(collection, meta.reduce_left, reduce_left));
            }
        }

        let collection_dir = root.join(collection);
        if collection_dir.exists() {
            return Err(FractalError::Config(format!(
                "collection directory {} exists but holds no {}",
                collection_dir.display(),
                META_FILENAME
            )));
        }

        fs::create_dir_all(&dir)?;
        let meta = Metadata {
            root: root.to_string_lossy().into_owned(),
            collection_name: collection.to_string(),
            reduce_left: reduce_left.into(),
            max_branches: reduce_left.max_branches(),
            document_count: 0,
        };
        manager.set(&meta)?;
        debug!(collection, path = %manager.path.display(), "created collection metadata");

        Ok(manager)
    }

    fn fan_out_mismatch(collection: &str, stored: u8, requested: ReduceLeft) -> FractalError {
        FractalError::Config(format!(
            "collection `{}` was created with reduce_left={}, opened with {}",
            collection,
            stored,
            requested.digits()
        ))
    }

    /// Read the current metadata
    pub fn get(&self) -> Result<Metadata> {
        let contents = fs::read_to_string(&self.path)?;
        serde_json::from_str(&contents).map_err(|e| FractalError::CorruptFile {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Overwrite the metadata (atomically replaced, like leaves)
    pub fn set(&self, meta: &Metadata) -> Result<()> {
        let json = serde_json::to_vec(meta)?;
        write_atomic(&self.path, &json)
    }

    /// Apply a delta to the document counter
    ///
    /// The counter never goes below zero.
    pub fn bump(&self, delta: i64) -> Result<u64> {
        let mut meta = self.get()?;
        let updated = meta.document_count.saturating_add_signed(delta);
        if delta < 0 && meta.document_count < delta.unsigned_abs() {
            warn!(
                collection = %meta.collection_name,
                count = meta.document_count,
                delta,
                "document counter would underflow, clamping at zero"
            );
        }
        meta.document_count = updated;
        self.set(&meta)?;
        Ok(updated)
    }

    /// Path of the metadata file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
