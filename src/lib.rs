//! # tablekv
//!
//! A client-side layer over a partitioned, schemaless key-value table store:
//! - Typed records and untyped property maps over one row model
//! - Pluggable key sanitization, optionally preserving original keys
//! - Per-partition batching within the store's transaction limit
//! - Paginated queries driven to completion via continuation tokens
//! - Delete-by-key and point lookup built from the above
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Table                                │
//! │        (writes, queries, delete-by-key, lookups)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Mutation   │          │    Query    │
//!   │  Executor   │          │  Executor   │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!   ┌──────▼──────┐                 │
//!   │   Batch     │                 │
//!   │ Partitioner │                 │
//!   └──────┬──────┘                 │
//!          └────────────┬───────────┘
//!                       ▼
//!               ┌──────────────┐
//!               │ TableClient  │
//!               │   (store)    │
//!               └──────────────┘
//! ```
//!
//! Rows reach the executors through the entity adapter and, when asked
//! for, the sanitization pipeline.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod entity;
pub mod sanitize;
pub mod batch;
pub mod filter;
pub mod client;
pub mod executor;
pub mod table;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TableError, Result};
pub use config::{Config, MAX_BATCH_SIZE};
pub use entity::{KeyCapability, PropertyMap, PropertyValue, Row, TableEntity, TypedProperty};
pub use sanitize::{KeySanitizer, ReplaceDisallowed};
pub use filter::Filter;
pub use client::{MemoryTableClient, OperationResult, StoreError, TableClient};
pub use table::Table;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tablekv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
