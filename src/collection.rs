//! Collection handle
//!
//! One flat API over the components of a collection:
//!
//! ```text
//!                    Collection<T>
//!        ┌─────────────────┼─────────────────┐
//!        ▼                 ▼                 ▼
//!   ┌──────────┐     ┌───────────┐     ┌─────────────┐
//!   │LeafStore │     │MetaManager│     │ QueryEngine │
//!   │ (CRUD)   │────►│ (counter) │◄────│(quantum loop)│
//!   └──────────┘     └───────────┘     └─────────────┘
//! ```
//!
//! Single-document operations run inline on the caller's thread. Predicate
//! operations fan out over the worker pool and block until done.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::addressing::ReduceLeft;
use crate::config::Config;
use crate::document::{decode_stored, encode_document, Document, FieldPatch};
use crate::error::{FractalError, Result};
use crate::meta::{MetaManager, Metadata};
use crate::query::{QuantumLoop, QueryEngine, TaskContext, DEFAULT_LIMIT};
use crate::storage::LeafStore;

/// A collection name must be a single directory name
pub(crate) fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(FractalError::InvalidArgument(format!(
            "invalid collection name `{}`",
            name
        )));
    }
    Ok(())
}

/// A collection of documents of type `T`
pub struct Collection<T> {
    name: String,
    root: PathBuf,
    reduce_left: ReduceLeft,
    leaves: LeafStore,
    meta: MetaManager,
    query: QueryEngine<T>,
}

impl<T: Document> Collection<T> {
    /// Open (or create) a collection under `config.root`
    ///
    /// Fan-out and scan settings are captured from `config` and fixed for the
    /// lifetime of the handle.
    pub fn open(config: &Config, name: &str) -> Result<Self> {
        validate_collection_name(name)?;

        let meta = MetaManager::open_or_create(&config.root, name, config.reduce_left)?;
        let leaves = LeafStore::new(&config.root, name, config.reduce_left, meta.clone());
        let query = QueryEngine::new(leaves.clone(), QuantumLoop::from_config(config));

        debug!(
            collection = name,
            reduce_left = config.reduce_left.digits(),
            workers = config.worker_count(),
            "opened collection"
        );

        Ok(Self {
            name: name.to_string(),
            root: config.root.clone(),
            reduce_left: config.reduce_left,
            leaves,
            meta,
            query,
        })
    }

    // =========================================================================
    // Single-Document Operations
    // =========================================================================

    /// Insert a document under its own key
    pub fn add_doc(&self, doc: &T) -> Result<()> {
        self.leaves.add(&doc.key()?, encode_document(doc)?)
    }

    /// Replace the stored document with the same key
    pub fn update_doc(&self, doc: &T) -> Result<()> {
        self.leaves.update(&doc.key()?, encode_document(doc)?)
    }

    pub fn get_doc(&self, key: &str) -> Result<T> {
        let raw = self.leaves.get(key)?;
        let (path, _) = self.leaves.leaf_path(key)?;
        decode_stored(&raw, &path)
    }

    pub fn has_key(&self, key: &str) -> Result<bool> {
        self.leaves.has(key)
    }

    pub fn delete_doc(&self, key: &str) -> Result<()> {
        self.leaves.delete(key)
    }

    // =========================================================================
    // Scan Operations
    // =========================================================================

    pub fn find_one<P>(&self, predicate: P) -> Result<Option<T>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        self.query.find_one(predicate)
    }

    /// Page `page` (1-based) of at most `limit` matching documents
    pub fn find_many<P>(&self, predicate: P, limit: usize, page: usize) -> Result<Option<Vec<T>>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        self.query.find_many(predicate, limit, page)
    }

    /// First page of up to 1000 matching documents
    pub fn find_many_default<P>(&self, predicate: P) -> Result<Option<Vec<T>>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        self.query.find_many(predicate, DEFAULT_LIMIT, 1)
    }

    /// Exact count by full scan
    pub fn count_documents<P>(&self, predicate: P) -> Result<u64>
    where
        P: Fn(&T) -> bool + Sync,
    {
        self.query.count_documents(predicate)
    }

    pub fn delete_many<P>(&self, predicate: P) -> Result<u64>
    where
        P: Fn(&T) -> bool + Sync,
    {
        self.query.delete_many(predicate)
    }

    pub fn update_many<P>(&self, predicate: P, fields: &FieldPatch) -> Result<u64>
    where
        P: Fn(&T) -> bool + Sync,
    {
        self.query.update_many(predicate, fields)
    }

    pub fn run_custom_task<R, F>(&self, task: F, limit: usize) -> Result<R>
    where
        F: FnOnce(&TaskContext<'_, T>) -> Result<R>,
    {
        self.query.run_custom_task(task, limit)
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Counter kept in the metadata file (O(1), may drift under concurrency)
    pub fn estimated_document_count(&self) -> Result<u64> {
        Ok(self.meta.get()?.document_count)
    }

    pub fn metadata(&self) -> Result<Metadata> {
        self.meta.get()
    }

    /// Overwrite the metadata record
    pub fn set_metadata(&self, meta: &Metadata) -> Result<()> {
        self.meta.set(meta)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn collection_name(&self) -> &str {
        &self.name
    }

    /// `{root}/{name}`
    pub fn collection_full_name(&self) -> String {
        format!("{}/{}", self.root.display(), self.name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reduce_left(&self) -> ReduceLeft {
        self.reduce_left
    }

    /// Leaf file a key resolves to, plus the normalized key
    pub fn leaf_path(&self, key: &str) -> Result<(PathBuf, String)> {
        self.leaves.leaf_path(key)
    }
}
