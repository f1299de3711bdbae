//! Engine Module
//!
//! Entry point of a store: one root directory holding many collections.
//!
//! ## Responsibilities
//! - Open collections with the store's configuration
//! - Bind each collection name to one document type
//! - List, delete and wipe collections

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use parking_lot::RwLock;
use tracing::info;

use crate::collection::{validate_collection_name, Collection};
use crate::config::Config;
use crate::document::Document;
use crate::error::{FractalError, Result};

/// Document type a collection name is bound to
#[derive(Debug, Clone, Copy)]
struct BoundType {
    id: TypeId,
    name: &'static str,
}

/// A store rooted at `config.root`
///
/// ## Concurrency:
/// - `bindings`: RwLock (many readers opening known collections, one writer
///   registering a new one)
/// - Collections opened from the same engine share nothing else; each handle
///   owns its own components
pub struct Engine {
    config: Config,

    /// Collection name → document type opened under it
    bindings: RwLock<HashMap<String, BoundType>>,
}

impl Engine {
    /// Open a store (the root directory is created on demand)
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.root)?;
        Ok(Self {
            config,
            bindings: RwLock::new(HashMap::new()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified root directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().root(path).build())
    }

    /// Collection named after `T` (see [`Document::collection_name`])
    pub fn collection<T: Document>(&self) -> Result<Collection<T>> {
        self.open_collection(&T::collection_name())
    }

    /// Collection `name` holding documents of type `T`
    ///
    /// Fails with `TypeMismatch` if `name` was already opened with another
    /// document type through this engine.
    pub fn open_collection<T: Document>(&self, name: &str) -> Result<Collection<T>> {
        validate_collection_name(name)?;
        self.bind::<T>(name)?;
        Collection::open(&self.config, name)
    }

    fn bind<T: Document>(&self, name: &str) -> Result<()> {
        let wanted = BoundType {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        };

        if let Some(bound) = self.bindings.read().get(name) {
            return Self::check_binding(name, bound, &wanted);
        }

        let mut bindings = self.bindings.write();
        let bound = bindings.entry(name.to_string()).or_insert(wanted);
        Self::check_binding(name, bound, &wanted)
    }

    fn check_binding(name: &str, bound: &BoundType, wanted: &BoundType) -> Result<()> {
        if bound.id == wanted.id {
            Ok(())
        } else {
            Err(FractalError::TypeMismatch {
                collection: name.to_string(),
                expected: bound.name.to_string(),
                found: wanted.name.to_string(),
            })
        }
    }

    /// Names of all collections, sorted
    ///
    /// An absent root means no collections.
    pub fn list_collections(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.config.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a collection and all of its documents
    pub fn delete_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;

        let path = self.config.root.join(name);
        match fs::remove_dir_all(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FractalError::InvalidArgument(format!(
                    "collection `{}` does not exist",
                    name
                )))
            }
            Err(e) => return Err(e.into()),
        }
        self.bindings.write().remove(name);

        info!(collection = name, "deleted collection");
        Ok(())
    }

    /// Remove the whole store ("napalm")
    ///
    /// An absent root is not an error. Open collection handles keep pointing
    /// at the removed tree.
    pub fn napalm(&self) -> Result<()> {
        match fs::remove_dir_all(&self.config.root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.bindings.write().clear();

        info!(root = %self.config.root.display(), "wiped store");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
