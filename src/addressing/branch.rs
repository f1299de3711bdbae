//! Branch index → path mapping

use std::path::{Path, PathBuf};

use crate::error::{FractalError, Result};

use super::key::{key_hash, normalize_key};

/// Number of hex digits in a rendered CRC32
const HASH_DIGITS: usize = 8;

/// Leading hash digits discarded when building a path
///
/// Fewer surviving digits means fewer, wider branches (more key collisions
/// per leaf, faster full scans).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReduceLeft {
    /// 4294967296 branches, depth 8
    Zero,
    /// 16777216 branches, depth 6
    Two,
    /// 65536 branches, depth 4
    Four,
    /// 256 branches, depth 2
    #[default]
    Six,
}

impl ReduceLeft {
    /// Every supported fan-out, widest first
    pub const ALL: [ReduceLeft; 4] = [
        ReduceLeft::Zero,
        ReduceLeft::Two,
        ReduceLeft::Four,
        ReduceLeft::Six,
    ];

    /// Number of discarded digits
    pub fn digits(self) -> usize {
        match self {
            ReduceLeft::Zero => 0,
            ReduceLeft::Two => 2,
            ReduceLeft::Four => 4,
            ReduceLeft::Six => 6,
        }
    }

    /// Directory depth of a branch below the collection directory
    pub fn depth(self) -> usize {
        HASH_DIGITS - self.digits()
    }

    /// Size of the branch address space
    pub fn max_branches(self) -> u64 {
        1u64 << (4 * self.depth())
    }
}

impl TryFrom<u8> for ReduceLeft {
    type Error = FractalError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ReduceLeft::Zero),
            2 => Ok(ReduceLeft::Two),
            4 => Ok(ReduceLeft::Four),
            6 => Ok(ReduceLeft::Six),
            other => Err(FractalError::Config(format!(
                "{} - unacceptable value for reduce_left (expected 0, 2, 4 or 6)",
                other
            ))),
        }
    }
}

impl From<ReduceLeft> for u8 {
    fn from(value: ReduceLeft) -> Self {
        value.digits() as u8
    }
}

/// Surviving hex digits of a branch index
///
/// The index is rendered as 8 zero-padded hex digits before truncation, so
/// branch 0 is always all zeros.
pub fn branch_hex(branch_index: u64, reduce_left: ReduceLeft) -> String {
    let full = format!("{:08x}", branch_index);
    full[reduce_left.digits()..].to_string()
}

/// Directory of a branch: one path segment per surviving hex digit
pub fn branch_path(
    root: &Path,
    collection: &str,
    branch_index: u64,
    reduce_left: ReduceLeft,
) -> PathBuf {
    let mut path = root.join(collection);
    for digit in branch_hex(branch_index, reduce_left).chars() {
        let mut segment = [0u8; 4];
        path.push(digit.encode_utf8(&mut segment));
    }
    path
}

/// Branch index a key lands in
pub fn key_branch_index(key: &str, reduce_left: ReduceLeft) -> Result<u64> {
    let normalized = normalize_key(key)?;
    Ok(u64::from(key_hash(&normalized)) % reduce_left.max_branches())
}

/// Branch directory of a key plus its normalized form
pub fn key_branch_path(
    root: &Path,
    collection: &str,
    key: &str,
    reduce_left: ReduceLeft,
) -> Result<(PathBuf, String)> {
    let normalized = normalize_key(key)?;
    let index = u64::from(key_hash(&normalized)) % reduce_left.max_branches();
    Ok((branch_path(root, collection, index, reduce_left), normalized))
}
