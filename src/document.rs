//! Document Model
//!
//! The boundary between the engine and the caller's schema. The engine only
//! needs three things from a document type: its collection name, its key and
//! a JSON codec. Schema validation itself is whatever `Deserialize` enforces.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FractalError, Result};

/// A document type bound to one collection
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection this type is stored in
    ///
    /// Defaults to the bare type name, e.g. `User` for `my_app::models::User`.
    fn collection_name() -> String {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }

    /// Key under which the document is stored (before normalization)
    fn key(&self) -> Result<String>;
}

/// Fields applied to matching documents by `update_many`
pub type FieldPatch = Map<String, Value>;

/// Serialize a document to the string stored in its leaf
pub fn encode_document<T: Serialize>(doc: &T) -> Result<String> {
    Ok(serde_json::to_string(doc)?)
}

/// Deserialize a leaf entry back into a document
pub fn decode_document<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

/// Decode a document read back from the leaf at `path`
///
/// Stored documents were written by `encode_document`, so one that no
/// longer decodes means the leaf is corrupt.
pub(crate) fn decode_stored<T: DeserializeOwned>(raw: &str, path: &Path) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| FractalError::CorruptFile {
        path: path.to_path_buf(),
        reason: format!("undecodable document: {}", e),
    })
}

/// Overwrite top-level fields of a document
///
/// The patched value is decoded back into `T`, so a patch that breaks the
/// schema fails instead of being written.
pub fn apply_patch<T: Document>(doc: &T, fields: &FieldPatch) -> Result<T> {
    let mut value = serde_json::to_value(doc)?;
    let object = value.as_object_mut().ok_or_else(|| {
        FractalError::InvalidArgument(format!(
            "cannot patch fields of a non-object document in `{}`",
            T::collection_name()
        ))
    })?;

    for (field, new_value) in fields {
        object.insert(field.clone(), new_value.clone());
    }

    Ok(serde_json::from_value(value)?)
}

// =============================================================================
// Schemaless Documents
// =============================================================================

/// Field a `JsonDocument` reads its key from
pub const JSON_KEY_FIELD: &str = "key";

/// Schemaless JSON object document
///
/// The key is taken from its `"key"` field, which must be a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonDocument(pub Value);

impl JsonDocument {
    /// Parse a document from JSON text
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_object() {
            return Err(FractalError::InvalidArgument(
                "document must be a JSON object".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Top-level field lookup
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

impl Document for JsonDocument {
    fn key(&self) -> Result<String> {
        match self.0.get(JSON_KEY_FIELD) {
            Some(Value::String(key)) => Ok(key.clone()),
            Some(other) => Err(FractalError::InvalidKeyType(format!(
                "the `{}` field must be a string, got {}",
                JSON_KEY_FIELD, other
            ))),
            None => Err(FractalError::InvalidKeyType(format!(
                "the `{}` field is missing",
                JSON_KEY_FIELD
            ))),
        }
    }
}
