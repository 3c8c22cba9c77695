//! # Container Handles
//!
//! Shared, interior-mutable containers: sequences, associative maps, unique
//! sets, byte buffers, and instants. Accessors that expose members return
//! snapshots (`Vec` of handles) so no borrow is held while callers recurse.

use super::{Identity, MapKey, Value};
use chrono::{DateTime, TimeZone, Utc};
use indexmap::{IndexMap, IndexSet};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

// =============================================================================
// SEQUENCE
// =============================================================================

/// Ordered list of values.
#[derive(Clone, Default)]
pub struct Sequence(pub(crate) Rc<RefCell<Vec<Value>>>);

impl Sequence {
    /// Create an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sequence holding the given values in order.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self(Rc::new(RefCell::new(values.into_iter().collect())))
    }

    /// Append a value.
    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    /// Element at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Replace the element at `index`. Returns false if out of bounds.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.0.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Snapshot of the elements.
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sequence(len={}, @{})", self.len(), self.identity())
    }
}

// =============================================================================
// ASSOCIATIVE MAP
// =============================================================================

/// Key→value map in insertion order. Keys compare by SameValueZero.
#[derive(Clone, Default)]
pub struct AssocMap(pub(crate) Rc<RefCell<IndexMap<MapKey, Value>>>);

impl AssocMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, returning the previous value.
    ///
    /// Replacing keeps the entry's original position.
    pub fn insert(&self, key: Value, value: Value) -> Option<Value> {
        self.0.borrow_mut().insert(MapKey(key), value)
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.borrow().get(&MapKey(key.clone())).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &Value) -> bool {
        self.0.borrow().contains_key(&MapKey(key.clone()))
    }

    /// Remove an entry, preserving the order of the rest.
    pub fn remove(&self, key: &Value) -> Option<Value> {
        self.0.borrow_mut().shift_remove(&MapKey(key.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Snapshot of the entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.0.clone(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Debug for AssocMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssocMap(len={}, @{})", self.len(), self.identity())
    }
}

// =============================================================================
// UNIQUE SET
// =============================================================================

/// Membership collection in insertion order. Members compare by SameValueZero.
#[derive(Clone, Default)]
pub struct UniqueSet(pub(crate) Rc<RefCell<IndexSet<MapKey>>>);

impl UniqueSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Returns false if it was already present.
    pub fn add(&self, member: Value) -> bool {
        self.0.borrow_mut().insert(MapKey(member))
    }

    #[must_use]
    pub fn contains(&self, member: &Value) -> bool {
        self.0.borrow().contains(&MapKey(member.clone()))
    }

    pub fn remove(&self, member: &Value) -> bool {
        self.0.borrow_mut().shift_remove(&MapKey(member.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Snapshot of the members in insertion order.
    #[must_use]
    pub fn members(&self) -> Vec<Value> {
        self.0.borrow().iter().map(|k| k.0.clone()).collect()
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Debug for UniqueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UniqueSet(len={}, @{})", self.len(), self.identity())
    }
}

// =============================================================================
// BYTES
// =============================================================================

/// Contiguous byte buffer.
#[derive(Clone, Default)]
pub struct Bytes(pub(crate) Rc<RefCell<Vec<u8>>>);

impl Bytes {
    /// Wrap an owned buffer.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(Rc::new(RefCell::new(bytes)))
    }

    /// A new buffer with the same content.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self::from_vec(self.to_vec())
    }

    /// Overwrite one byte. Returns false if `offset` is out of bounds.
    pub fn write(&self, offset: usize, byte: u8) -> bool {
        match self.0.borrow_mut().get_mut(offset) {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes(len={}, @{})", self.len(), self.identity())
    }
}

// =============================================================================
// INSTANT
// =============================================================================

/// Mutable point in time.
#[derive(Clone)]
pub struct Instant(pub(crate) Rc<Cell<DateTime<Utc>>>);

impl Instant {
    #[must_use]
    pub fn at(time: DateTime<Utc>) -> Self {
        Self(Rc::new(Cell::new(time)))
    }

    /// Instant from milliseconds since the Unix epoch.
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self::at)
    }

    #[must_use]
    pub fn time(&self) -> DateTime<Utc> {
        self.0.get()
    }

    #[must_use]
    pub fn millis(&self) -> i64 {
        self.time().timestamp_millis()
    }

    pub fn set_time(&self, time: DateTime<Utc>) {
        self.0.set(time);
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Debug for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instant({}, @{})", self.time().to_rfc3339(), self.identity())
    }
}

// =============================================================================
// TESTS
// =============================================================================
