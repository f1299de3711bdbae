//! # FractalKV
//!
//! An embedded key-value document store with:
//! - Fractal-tree addressing: the CRC32 of a key, as hex digits, is the
//!   directory path of the leaf holding it
//! - Single-document CRUD with one leaf read/write per operation
//! - Concurrent full-address-space scans ("quantum loop") for predicate queries
//! - A per-collection metadata record with an advisory document counter
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                               │
//! │          (collections, type binding, napalm)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Collection<T>                             │
//! └──────┬──────────────────────┬───────────────────────┬───────┘
//!        │ key ops              │ predicate ops         │ counter
//!        ▼                      ▼                       ▼
//!  ┌─────────────┐      ┌───────────────┐       ┌─────────────┐
//!  │  LeafStore  │◄─────│  QueryEngine  │       │ MetaManager │
//!  │ (leaf.json) │      │ (worker pool) │       │ (meta.json) │
//!  └──────┬──────┘      └───────┬───────┘       └─────────────┘
//!         │                     │
//!         ▼                     ▼
//!  ┌─────────────────────────────────────┐
//!  │            Addressing               │
//!  │  key → crc32 → a/6/d/2/d/1 (no I/O) │
//!  └─────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod addressing;
pub mod storage;
pub mod meta;
pub mod query;
pub mod aggregation;
pub mod document;
pub mod collection;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FractalError, Result};
pub use config::{Config, ScanFailurePolicy};
pub use addressing::ReduceLeft;
pub use collection::Collection;
pub use document::{Document, FieldPatch, JsonDocument};
pub use engine::Engine;
pub use meta::Metadata;
pub use query::{Flow, TaskContext, DEFAULT_LIMIT};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FractalKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
