//! # Core Type Definitions
//!
//! This module contains the value model the cloner operates on:
//! - The polymorphic `Value` and its `Primitive` leaves
//! - Shared container handles (`Sequence`, `AssocMap`, `UniqueSet`, `Bytes`, `Instant`)
//! - Special kinds (`Deferred`, `Pattern`, `Failure`)
//! - Keyed records (`Record`, `Property`, `Accessor`, `Shape`)
//! - Error types (`FacsimileError`)
//!
//! ## Identity
//!
//! Every non-primitive value is an `Rc` handle. Cloning a handle (`Value::clone`)
//! shares the same node; it is the [`crate::Cloner`] that produces independent
//! copies. Two handles denote the same node iff their [`Identity`] is equal.

mod collections;
mod deferred;
mod failure;
mod pattern;
mod record;

pub use collections::{AssocMap, Bytes, Instant, Sequence, UniqueSet};
pub use deferred::{Deferred, Settlement};
pub use failure::Failure;
pub use pattern::{Pattern, PatternFlags};
pub use record::{
    Accessor, Property, PropertyAttributes, PropertyHolder, PropertyKey, Record, Shape, Slot,
};

use chrono::{DateTime, Utc};
use deferred::DeferredState;
use failure::FailureData;
use indexmap::{IndexMap, IndexSet};
use pattern::PatternData;
use record::RecordData;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};
use thiserror::Error;

// =============================================================================
// IDENTITY
// =============================================================================

/// Stable identity token of a shared node: the address of its allocation.
///
/// Valid for as long as some handle keeps the node alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub usize);

impl Identity {
    pub(crate) fn of<T: ?Sized>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc).cast::<()>() as usize)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// =============================================================================
// SYMBOL
// =============================================================================

/// A unique atom with an optional description.
///
/// Two symbols are equal only if they are the same symbol; equal descriptions
/// do not make them equal.
#[derive(Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// Create a fresh symbol.
    #[must_use]
    pub fn new(description: &str) -> Self {
        Self(Rc::from(description))
    }

    /// The description given at creation.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.0
    }

    /// Identity of this symbol.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description())
    }
}

// =============================================================================
// PRIMITIVES
// =============================================================================

/// Immutable leaf values. Cloning returns them unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Boolean.
    Bool(bool),
    /// Integer number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text. Shared, never copied.
    Str(Rc<str>),
    /// Unique atom.
    Symbol(Symbol),
}

impl Primitive {
    /// SameValueZero: NaN equals NaN, `-0.0` equals `0.0`, symbols by identity.
    #[must_use]
    pub fn same_value_zero(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            _ => false,
        }
    }
}

/// Bit pattern under which SameValueZero-equal floats hash identically.
pub(crate) fn canonical_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

// =============================================================================
// VALUE KIND
// =============================================================================

/// The structural category of a value.
///
/// Variant order after `Primitive` is the classification precedence of the
/// cloner: Map, Set, Deferred, Sequence, Pattern, Instant, Bytes, Failure,
/// Record. `Record` is the fallback for every host object without a more
/// specific kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Null,
    Primitive,
    Map,
    Set,
    Deferred,
    Sequence,
    Pattern,
    Instant,
    Bytes,
    Failure,
    Record,
}

impl ValueKind {
    /// Lowercase name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Primitive => "primitive",
            Self::Map => "map",
            Self::Set => "set",
            Self::Deferred => "deferred",
            Self::Sequence => "sequence",
            Self::Pattern => "pattern",
            Self::Instant => "instant",
            Self::Bytes => "bytes",
            Self::Failure => "failure",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A node of a host value graph.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Primitive(Primitive),
    Map(AssocMap),
    Set(UniqueSet),
    Deferred(Deferred),
    Sequence(Sequence),
    Pattern(Pattern),
    Instant(Instant),
    Bytes(Bytes),
    Failure(Failure),
    Record(Record),
}

impl Value {
    /// Integer primitive.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Primitive(Primitive::Int(value))
    }

    /// Float primitive.
    #[must_use]
    pub fn float(value: f64) -> Self {
        Self::Primitive(Primitive::Float(value))
    }

    /// Boolean primitive.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::Primitive(Primitive::Bool(value))
    }

    /// String primitive.
    #[must_use]
    pub fn str(value: &str) -> Self {
        Self::Primitive(Primitive::Str(Rc::from(value)))
    }

    /// Symbol primitive.
    #[must_use]
    pub fn symbol(symbol: Symbol) -> Self {
        Self::Primitive(Primitive::Symbol(symbol))
    }

    /// The kind this value is classified as.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Primitive(_) => ValueKind::Primitive,
            Self::Map(_) => ValueKind::Map,
            Self::Set(_) => ValueKind::Set,
            Self::Deferred(_) => ValueKind::Deferred,
            Self::Sequence(_) => ValueKind::Sequence,
            Self::Pattern(_) => ValueKind::Pattern,
            Self::Instant(_) => ValueKind::Instant,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::Failure(_) => ValueKind::Failure,
            Self::Record(_) => ValueKind::Record,
        }
    }

    /// Identity of the shared node, `None` for `Null` and primitives.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        match self {
            Self::Null | Self::Primitive(_) => None,
            Self::Map(m) => Some(m.identity()),
            Self::Set(s) => Some(s.identity()),
            Self::Deferred(d) => Some(d.identity()),
            Self::Sequence(s) => Some(s.identity()),
            Self::Pattern(p) => Some(p.identity()),
            Self::Instant(i) => Some(i.identity()),
            Self::Bytes(b) => Some(b.identity()),
            Self::Failure(f) => Some(f.identity()),
            Self::Record(r) => Some(r.identity()),
        }
    }

    /// Whether this is `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether both values are handles to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// SameValueZero over the whole value: primitives by value, nodes by identity.
    #[must_use]
    pub fn same_value_zero(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Primitive(a), Self::Primitive(b)) => a.same_value_zero(b),
            _ => self.ptr_eq(other),
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Primitive(Primitive::Int(i)) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Primitive(Primitive::Float(f)) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Primitive(Primitive::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Primitive(Primitive::Str(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Self::Primitive(Primitive::Symbol(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&AssocMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<&UniqueSet> {
        match self {
            Self::Set(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Self::Deferred(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Self::Pattern(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_instant(&self) -> Option<&Instant> {
        match self {
            Self::Instant(i) => Some(i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_failure(&self) -> Option<&Failure> {
        match self {
            Self::Failure(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::str(value)
    }
}

impl From<Symbol> for Value {
    fn from(value: Symbol) -> Self {
        Self::symbol(value)
    }
}

macro_rules! value_from_handle {
    ($($handle:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$handle> for Value {
                fn from(handle: $handle) -> Self {
                    Self::$variant(handle)
                }
            }
        )*
    };
}

value_from_handle! {
    AssocMap => Map,
    UniqueSet => Set,
    Deferred => Deferred,
    Sequence => Sequence,
    Pattern => Pattern,
    Instant => Instant,
    Bytes => Bytes,
    Failure => Failure,
    Record => Record,
}

// =============================================================================
// WEAK HANDLES
// =============================================================================

/// A non-owning handle to a node.
///
/// It does not keep the node alive, but it does keep the allocation, so the
/// node's [`Identity`] is not handed to another node while the handle exists.
#[derive(Debug, Clone)]
pub(crate) enum WeakValue {
    Map(Weak<RefCell<IndexMap<MapKey, Value>>>),
    Set(Weak<RefCell<IndexSet<MapKey>>>),
    Deferred(Weak<RefCell<DeferredState>>),
    Sequence(Weak<RefCell<Vec<Value>>>),
    Pattern(Weak<PatternData>),
    Instant(Weak<Cell<DateTime<Utc>>>),
    Bytes(Weak<RefCell<Vec<u8>>>),
    Failure(Weak<FailureData>),
    Record(Weak<RecordData>),
}

impl WeakValue {
    /// The node, if some strong handle still holds it.
    pub(crate) fn upgrade(&self) -> Option<Value> {
        Some(match self {
            Self::Map(w) => Value::Map(AssocMap(w.upgrade()?)),
            Self::Set(w) => Value::Set(UniqueSet(w.upgrade()?)),
            Self::Deferred(w) => Value::Deferred(Deferred(w.upgrade()?)),
            Self::Sequence(w) => Value::Sequence(Sequence(w.upgrade()?)),
            Self::Pattern(w) => Value::Pattern(Pattern(w.upgrade()?)),
            Self::Instant(w) => Value::Instant(Instant(w.upgrade()?)),
            Self::Bytes(w) => Value::Bytes(Bytes(w.upgrade()?)),
            Self::Failure(w) => Value::Failure(Failure(w.upgrade()?)),
            Self::Record(w) => Value::Record(Record(w.upgrade()?)),
        })
    }

    pub(crate) fn is_live(&self) -> bool {
        let strong = match self {
            Self::Map(w) => w.strong_count(),
            Self::Set(w) => w.strong_count(),
            Self::Deferred(w) => w.strong_count(),
            Self::Sequence(w) => w.strong_count(),
            Self::Pattern(w) => w.strong_count(),
            Self::Instant(w) => w.strong_count(),
            Self::Bytes(w) => w.strong_count(),
            Self::Failure(w) => w.strong_count(),
            Self::Record(w) => w.strong_count(),
        };
        strong > 0
    }
}

impl Value {
    /// Non-owning handle, `None` for `Null` and primitives.
    pub(crate) fn downgrade(&self) -> Option<WeakValue> {
        Some(match self {
            Self::Null | Self::Primitive(_) => return None,
            Self::Map(m) => WeakValue::Map(Rc::downgrade(&m.0)),
            Self::Set(s) => WeakValue::Set(Rc::downgrade(&s.0)),
            Self::Deferred(d) => WeakValue::Deferred(Rc::downgrade(&d.0)),
            Self::Sequence(s) => WeakValue::Sequence(Rc::downgrade(&s.0)),
            Self::Pattern(p) => WeakValue::Pattern(Rc::downgrade(&p.0)),
            Self::Instant(i) => WeakValue::Instant(Rc::downgrade(&i.0)),
            Self::Bytes(b) => WeakValue::Bytes(Rc::downgrade(&b.0)),
            Self::Failure(f) => WeakValue::Failure(Rc::downgrade(&f.0)),
            Self::Record(r) => WeakValue::Record(Rc::downgrade(&r.0)),
        })
    }
}

// =============================================================================
// MAP KEYS
// =============================================================================

/// A value used as a map key or set member, compared by SameValueZero.
#[derive(Debug, Clone)]
pub(crate) struct MapKey(pub(crate) Value);

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.same_value_zero(&other.0)
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Null => 0u8.hash(state),
            Value::Primitive(Primitive::Bool(b)) => (1u8, b).hash(state),
            Value::Primitive(Primitive::Int(i)) => (2u8, i).hash(state),
            Value::Primitive(Primitive::Float(f)) => (3u8, canonical_bits(*f)).hash(state),
            Value::Primitive(Primitive::Str(s)) => (4u8, &**s).hash(state),
            Value::Primitive(Primitive::Symbol(s)) => (5u8, s.identity()).hash(state),
            node => (6u8, node.identity()).hash(state),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in Facsimile.
///
/// - Cloning is total under the default depth policy
/// - Use `Result<T, FacsimileError>` for fallible operations
/// - The core never panics
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FacsimileError {
    /// Strict depth policy reached a container with no budget left.
    #[error("Depth limit {limit} exhausted before the graph was fully copied")]
    DepthExceeded { limit: usize },

    /// Pattern source failed to compile.
    #[error("Invalid pattern /{pattern}/: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Pattern flag outside `gimsuy`.
    #[error("Unknown pattern flag: {0:?}")]
    UnknownPatternFlag(char),

    /// A snapshot document could not be decoded.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Configuration is malformed or out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// A copy failed its independence audit.
    #[error("Verification failed: {0}")]
    Verification(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn primitives_have_no_identity() {
        assert!(Value::Null.identity().is_none());
        assert!(Value::int(1).identity().is_none());
        assert!(Value::str("a").identity().is_none());
    }

    #[test]
    fn handles_share_identity() {
        let seq = Value::from(Sequence::new());
        let alias = seq.clone();
        assert!(seq.ptr_eq(&alias));
        assert!(!seq.ptr_eq(&Value::from(Sequence::new())));
    }

    #[test]
    fn same_value_zero_floats() {
        assert!(Value::float(f64::NAN).same_value_zero(&Value::float(f64::NAN)));
        assert!(Value::float(-0.0).same_value_zero(&Value::float(0.0)));
        assert!(!Value::float(1.0).same_value_zero(&Value::int(1)));
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = Symbol::new("tag");
        let b = Symbol::new("tag");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn map_keys_hash_consistently() {
        let mut keys = HashSet::new();
        keys.insert(MapKey(Value::float(0.0)));
        keys.insert(MapKey(Value::float(-0.0)));
        keys.insert(MapKey(Value::str("x")));
        keys.insert(MapKey(Value::str("x")));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn weak_handles_do_not_keep_nodes_alive() {
        let value = Value::from(Record::new());
        let weak = value.downgrade().expect("node");
        assert!(weak.upgrade().is_some_and(|v| v.ptr_eq(&value)));

        drop(value);
        assert!(!weak.is_live());
        assert!(weak.upgrade().is_none());
        assert!(Value::int(1).downgrade().is_none());
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::Null.kind().name(), "null");
        assert_eq!(Value::from(Record::new()).kind(), ValueKind::Record);
        assert_eq!(ValueKind::Deferred.to_string(), "deferred");
    }
}
