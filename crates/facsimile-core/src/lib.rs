//! # facsimile-core
//!
//! The deep-copy engine for Facsimile - THE LOGIC.
//!
//! This crate copies arbitrary host value graphs into independent graphs with
//! the same structure, without recursing forever on self-referential data.
//!
//! ## Modules
//!
//! - `types`: the value model (`Value`, containers, records, failures, patterns, deferreds)
//! - `options`: per-invocation clone options
//! - `visited`: the identity map of originals to copies
//! - `cloner`: the depth-bounded, cycle-safe walk
//! - `audit`: structural equality and alias detection for copies
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Holds no state between invocations
//! - Is total: under the default depth policy cloning never fails
//! - Defines no wire format (the snapshot document lives in the app)
//! - Has NO async, NO network, NO file I/O (pure Rust)
//!
//! ## Example
//!
//! ```
//! use facsimile_core::{CloneOptions, PropertyHolder, Record, Value, deep_clone};
//!
//! let record = Record::new();
//! let value = Value::from(record.clone());
//! record.set("me", value.clone());
//!
//! let copy = deep_clone(&value, &CloneOptions::default()).expect("clone");
//! let me = copy.as_record().and_then(|r| r.get("me")).expect("field");
//! assert!(me.ptr_eq(&copy));
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod audit;
pub mod cloner;
pub mod options;
pub mod types;
pub mod visited;

// =============================================================================
// RE-EXPORTS: Value Model (from types module)
// =============================================================================

pub use types::{
    Accessor, AssocMap, Bytes, Deferred, FacsimileError, Failure, Identity, Instant, Pattern,
    PatternFlags, Primitive, Property, PropertyAttributes, PropertyHolder, PropertyKey, Record,
    Sequence, Settlement, Shape, Slot, Symbol, UniqueSet, Value, ValueKind,
};

// =============================================================================
// RE-EXPORTS: Cloner
// =============================================================================

pub use audit::{Alias, deep_equal, deep_equal_with_shape, find_aliases};
pub use cloner::{CloneOutcome, CloneStats, Cloner, deep_clone};
pub use options::{CloneOptions, DepthPolicy};
pub use visited::VisitedSet;
