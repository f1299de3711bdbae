//! Scatter-gather queries
//!
//! Every query visits the whole branch address space through the quantum
//! loop. There is no index: an absent leaf is the fast path, a present leaf
//! is loaded, decoded and filtered on a worker thread.

use std::marker::PhantomData;
use std::ops::Range;

use tracing::{debug, info};

use crate::addressing::{normalize_key, ReduceLeft};
use crate::document::{apply_patch, decode_stored, encode_document, Document, FieldPatch};
use crate::error::{FractalError, Result};
use crate::storage::LeafStore;

use super::pool::{Flow, QuantumLoop};
use super::task::TaskContext;

/// Default page size of `find_many` and default limit of custom tasks
pub const DEFAULT_LIMIT: usize = 1000;

/// Full-scan query engine for one collection
pub struct QueryEngine<T> {
    store: LeafStore,
    quantum: QuantumLoop,
    _doc: PhantomData<fn() -> T>,
}

impl<T: Document> QueryEngine<T> {
    pub fn new(store: LeafStore, quantum: QuantumLoop) -> Self {
        Self {
            store,
            quantum,
            _doc: PhantomData,
        }
    }

    /// Every branch index of the collection, ascending
    ///
    /// Index 0 is included: it holds `meta.json`, but keys whose hash
    /// truncates to zero keep their `leaf.json` there too.
    pub fn branch_range(&self) -> Range<u64> {
        0..self.store.reduce_left().max_branches()
    }

    /// Decoded documents of one branch, `None` if the leaf is absent or empty
    pub fn load_branch_docs(&self, branch_index: u64) -> Result<Option<Vec<T>>> {
        let Some(leaf) = self.store.load_branch(branch_index)? else {
            return Ok(None);
        };
        if leaf.is_empty() {
            return Ok(None);
        }

        let path = self.store.branch_leaf_path(branch_index);
        let docs = leaf
            .iter()
            .map(|(_, raw)| decode_stored::<T>(raw, &path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(docs))
    }

    /// Matching documents of one branch, `None` if nothing matches
    fn matching_docs<P>(&self, branch_index: u64, predicate: &P) -> Result<Option<Vec<T>>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        let docs = self.load_branch_docs(branch_index)?.map(|docs| {
            docs.into_iter()
                .filter(|doc| predicate(doc))
                .collect::<Vec<_>>()
        });
        Ok(docs.filter(|docs| !docs.is_empty()))
    }

    /// First matching document in branch order
    pub fn find_one<P>(&self, predicate: P) -> Result<Option<T>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        let mut found = None;
        self.quantum.run(
            self.branch_range(),
            |index| self.matching_docs(index, &predicate),
            |_, docs| {
                found = docs.into_iter().next();
                Ok(Flow::Break)
            },
        )?;
        Ok(found)
    }

    /// One page of matching documents
    ///
    /// Skips `limit * (page - 1)` matches, then collects up to `limit`.
    /// Returns `None` when the page is empty.
    pub fn find_many<P>(&self, predicate: P, limit: usize, page: usize) -> Result<Option<Vec<T>>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        if page < 1 {
            return Err(FractalError::InvalidArgument(format!(
                "page must be at least 1, got {}",
                page
            )));
        }
        if limit < 1 {
            return Err(FractalError::InvalidArgument(
                "limit must be at least 1".to_string(),
            ));
        }
        let mut skip = limit.checked_mul(page - 1).ok_or_else(|| {
            FractalError::InvalidArgument(format!("page {} of size {} overflows", page, limit))
        })?;

        let mut result = Vec::new();
        self.quantum.run(
            self.branch_range(),
            |index| self.matching_docs(index, &predicate),
            |_, docs| {
                for doc in docs {
                    if skip > 0 {
                        skip -= 1;
                        continue;
                    }
                    result.push(doc);
                    if result.len() >= limit {
                        return Ok(Flow::Break);
                    }
                }
                Ok(Flow::Continue)
            },
        )?;

        Ok(if result.is_empty() { None } else { Some(result) })
    }

    /// Number of matching documents (full pass)
    pub fn count_documents<P>(&self, predicate: P) -> Result<u64>
    where
        P: Fn(&T) -> bool + Sync,
    {
        let mut total = 0u64;
        self.quantum.run(
            self.branch_range(),
            |index| {
                let count = self
                    .load_branch_docs(index)?
                    .map(|docs| docs.iter().filter(|&doc| predicate(doc)).count() as u64);
                Ok(count.filter(|n| *n > 0))
            },
            |_, count| {
                total += count;
                Ok(Flow::Continue)
            },
        )?;
        Ok(total)
    }

    /// Delete every matching document; returns how many were removed
    ///
    /// Only leaves with at least one match are rewritten. The document
    /// counter is decreased by every removal written to disk, including
    /// leaves rewritten ahead of a branch that made the scan fail.
    pub fn delete_many<P>(&self, predicate: P) -> Result<u64>
    where
        P: Fn(&T) -> bool + Sync,
    {
        let mut total = 0u64;
        let (outcome, undelivered) = self.quantum.run_mutating(
            self.branch_range(),
            |index| self.delete_in_branch(index, &predicate),
            |_, removed| {
                total += removed;
                Ok(Flow::Continue)
            },
        );
        total += undelivered.iter().sum::<u64>();

        if total > 0 {
            self.store.meta().bump(-(total as i64))?;
        }
        outcome?;

        info!(collection = %self.store.collection(), removed = total, "delete_many finished");
        Ok(total)
    }

    fn delete_in_branch<P>(&self, branch_index: u64, predicate: &P) -> Result<Option<u64>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        let Some(mut leaf) = self.store.load_branch(branch_index)? else {
            return Ok(None);
        };

        let path = self.store.branch_leaf_path(branch_index);
        let mut doomed = Vec::new();
        for (key, raw) in leaf.iter() {
            if predicate(&decode_stored::<T>(raw, &path)?) {
                doomed.push(key.to_string());
            }
        }
        if doomed.is_empty() {
            return Ok(None);
        }

        for key in &doomed {
            leaf.remove(key);
        }
        self.store.persist_branch(branch_index, &leaf)?;
        debug!(branch = branch_index, removed = doomed.len(), "rewrote leaf");

        Ok(Some(doomed.len() as u64))
    }

    /// Apply `fields` to every matching document; returns how many changed
    ///
    /// A patch may not change a document's key: the document would no longer
    /// live in the leaf its key addresses.
    pub fn update_many<P>(&self, predicate: P, fields: &FieldPatch) -> Result<u64>
    where
        P: Fn(&T) -> bool + Sync,
    {
        let mut total = 0u64;
        self.quantum.run(
            self.branch_range(),
            |index| self.update_in_branch(index, &predicate, fields),
            |_, updated| {
                total += updated;
                Ok(Flow::Continue)
            },
        )?;

        info!(collection = %self.store.collection(), updated = total, "update_many finished");
        Ok(total)
    }

    fn update_in_branch<P>(&self, branch_index: u64, predicate: &P, fields: &FieldPatch) -> Result<Option<u64>>
    where
        P: Fn(&T) -> bool + Sync,
    {
        let Some(mut leaf) = self.store.load_branch(branch_index)? else {
            return Ok(None);
        };

        let path = self.store.branch_leaf_path(branch_index);
        let mut updated = 0u64;
        for (key, raw) in leaf.iter_mut() {
            let doc = decode_stored::<T>(raw, &path)?;
            if !predicate(&doc) {
                continue;
            }

            let patched = apply_patch(&doc, fields)?;
            if normalize_key(&patched.key()?)? != key {
                return Err(FractalError::InvalidArgument(format!(
                    "update would change the key of `{}`",
                    key
                )));
            }
            *raw = encode_document(&patched)?;
            updated += 1;
        }
        if updated == 0 {
            return Ok(None);
        }

        self.store.persist_branch(branch_index, &leaf)?;
        Ok(Some(updated))
    }

    /// Hand the scan primitives to a caller-defined task
    pub fn run_custom_task<R, F>(&self, task: F, limit: usize) -> Result<R>
    where
        F: FnOnce(&TaskContext<'_, T>) -> Result<R>,
    {
        task(&TaskContext::new(self, limit))
    }

    pub(crate) fn quantum(&self) -> &QuantumLoop {
        &self.quantum
    }

    pub fn reduce_left(&self) -> ReduceLeft {
        self.store.reduce_left()
    }

    pub fn collection_name(&self) -> &str {
        self.store.collection()
    }
}
