//! Leaf file
//!
//! The single `leaf.json` inside a branch directory: a JSON object mapping
//! normalized key → serialized document.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{FractalError, Result};

/// Monotonic suffix for temp files (unique per process)
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Documents stored in one branch
///
/// Entries are kept sorted by normalized key, which fixes the in-leaf order
/// seen by scans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leaf {
    entries: BTreeMap<String, String>,
}

impl Leaf {
    /// Create an empty leaf
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a leaf file
    ///
    /// Returns:
    /// - `Ok(None)` : the file does not exist (branch never written)
    /// - `Ok(Some(leaf))` : parsed leaf (possibly empty)
    /// - `Err(CorruptFile)` : the file exists but is not a JSON object of strings
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Some(Self::new()));
        }

        serde_json::from_slice::<Option<Leaf>>(&bytes)
            .map(|leaf| Some(leaf.unwrap_or_default()))
            .map_err(|e| FractalError::CorruptFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Write the whole leaf to `path` (see [`write_atomic`])
    pub fn persist(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        write_atomic(path, &json)
    }

    /// Serialized document stored under a normalized key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or overwrite; returns the previous value
    pub fn insert(&mut self, key: String, doc: String) -> Option<String> {
        self.entries.insert(key, doc)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Keep only the entries for which `keep` returns true
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.entries.retain(|k, v| keep(k, v));
    }

    /// Entries in leaf order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Mutable access to the serialized documents, in leaf order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace the contents of `path`
///
/// The bytes go to a uniquely named sibling first, which is then renamed over
/// the target: a concurrent reader sees either the old or the new file, never
/// a truncated one.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        seq
    ));

    fs::write(&tmp, bytes)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
