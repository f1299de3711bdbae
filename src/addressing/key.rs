//! Key normalization and hashing

use crate::error::{FractalError, Result};

/// Normalize a caller-supplied key
///
/// Whitespace runs collapse to a single space, the ends are trimmed and the
/// result is lowercased. `"  Key \t NAME "` → `"key name"`.
pub fn normalize_key(key: &str) -> Result<String> {
    let normalized = key
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if normalized.is_empty() {
        return Err(FractalError::EmptyKey);
    }

    Ok(normalized)
}

/// CRC32 of an already normalized key
pub fn key_hash(normalized: &str) -> u32 {
    crc32fast::hash(normalized.as_bytes())
}
