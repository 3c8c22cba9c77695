//! # Cloner
//!
//! Depth-bounded, cycle-safe deep copy of a value graph.
//!
//! The walk is depth-first with pre-order registration:
//! 1. `Null` is returned as is, before the depth check.
//! 2. With no depth budget left the original is returned (or the call fails
//!    under [`DepthPolicy::Fail`]).
//! 3. Primitives are returned as is.
//! 4. Byte buffers are duplicated and returned without registration.
//! 5. A node already visited resolves to its existing copy.
//! 6. Otherwise an empty counterpart is allocated and registered, and only then
//!    populated by cloning each member with one less level of budget.
//!
//! Allocation always precedes population; a cycle back to a node in progress
//! finds the partially populated copy in the visited set.
//!
//! Deferred results do not block: the copy is returned pending, and a reaction
//! on the original clones its outcome and settles the copy. The reaction shares
//! the invocation's visited set, so an outcome that refers back into the graph
//! resolves to the copies already made while they are alive. The set holds
//! weak handles only, so an unsettled reaction does not keep either graph
//! alive.

use crate::options::{CloneOptions, DepthPolicy};
use crate::visited::VisitedSet;
use crate::{
    AssocMap, Deferred, FacsimileError, Failure, Instant, Property, PropertyAttributes,
    PropertyHolder, PropertyKey, Record, Sequence, Settlement, Slot, UniqueSet, Value,
};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

// =============================================================================
// STATS
// =============================================================================

/// Counters of one synchronous clone walk.
///
/// Work done later by deferred reactions is not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CloneStats {
    /// Nodes copied, byte buffers included.
    pub copied: usize,
    /// Visits resolved to an existing copy.
    pub cycles_resolved: usize,
    /// Originals returned because the depth budget ran out.
    pub truncated: usize,
    /// Byte buffers duplicated.
    pub buffers: usize,
    /// Deferred reactions scheduled.
    pub deferred: usize,
    /// Computed accessors copied as definitions.
    pub accessors_preserved: usize,
    /// Plain accessors read and stored as values.
    pub accessors_snapshotted: usize,
}

/// Result of [`Cloner::run`].
#[derive(Debug)]
pub struct CloneOutcome {
    pub value: Value,
    pub stats: CloneStats,
}

// =============================================================================
// CLONER
// =============================================================================

/// One clone invocation: options, visited set, and stats.
pub struct Cloner {
    options: CloneOptions,
    visited: Rc<RefCell<VisitedSet>>,
    stats: CloneStats,
}

impl Cloner {
    #[must_use]
    pub fn new(options: CloneOptions) -> Self {
        Self {
            options,
            visited: Rc::new(RefCell::new(VisitedSet::new())),
            stats: CloneStats::default(),
        }
    }

    /// Copy `value`, consuming the invocation state.
    pub fn run(mut self, value: &Value) -> Result<CloneOutcome, FacsimileError> {
        let copy = self.clone_node(value, self.options.depth)?;
        debug!(
            kind = %value.kind(),
            copied = self.stats.copied,
            cycles = self.stats.cycles_resolved,
            truncated = self.stats.truncated,
            "clone complete"
        );
        Ok(CloneOutcome {
            value: copy,
            stats: self.stats,
        })
    }

    fn clone_node(&mut self, value: &Value, depth: Option<usize>) -> Result<Value, FacsimileError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        if depth == Some(0) {
            return self.truncate(value);
        }
        let Some(identity) = value.identity() else {
            return Ok(value.clone());
        };
        let next = depth.map(|d| d.saturating_sub(1));

        if let Value::Bytes(bytes) = value {
            self.stats.copied += 1;
            self.stats.buffers += 1;
            return Ok(Value::Bytes(bytes.duplicate()));
        }

        if self.options.circular {
            let existing = self.visited.borrow().get(identity);
            if let Some(copy) = existing {
                self.stats.cycles_resolved += 1;
                trace!(%identity, kind = %value.kind(), "visited node resolved to its copy");
                return Ok(copy);
            }
        }

        let copy = self.allocate(value);
        if self.options.circular {
            self.visited.borrow_mut().register(identity, value, &copy);
        }
        self.stats.copied += 1;

        self.populate(value, &copy, next)?;
        Ok(copy)
    }

    fn truncate(&mut self, value: &Value) -> Result<Value, FacsimileError> {
        if value.identity().is_none() {
            return Ok(value.clone());
        }
        match self.options.on_depth_exhausted {
            DepthPolicy::Alias => {
                self.stats.truncated += 1;
                trace!(kind = %value.kind(), "depth budget exhausted, keeping original");
                Ok(value.clone())
            }
            DepthPolicy::Fail => Err(FacsimileError::DepthExceeded {
                limit: self.options.depth.unwrap_or(0),
            }),
        }
    }

    /// Empty counterpart of the same kind.
    fn allocate(&self, value: &Value) -> Value {
        match value {
            Value::Map(_) => Value::Map(AssocMap::new()),
            Value::Set(_) => Value::Set(UniqueSet::new()),
            Value::Deferred(_) => Value::Deferred(Deferred::pending()),
            Value::Sequence(_) => Value::Sequence(Sequence::new()),
            Value::Pattern(pattern) => Value::Pattern(pattern.recompiled()),
            Value::Instant(instant) => Value::Instant(Instant::at(instant.time())),
            Value::Bytes(bytes) => Value::Bytes(bytes.duplicate()),
            Value::Failure(failure) => Value::Failure(failure.derive()),
            Value::Record(record) => Value::Record(Record::with_shape(
                self.options
                    .shape_override
                    .clone()
                    .or_else(|| record.shape()),
            )),
            Value::Null | Value::Primitive(_) => value.clone(),
        }
    }

    fn populate(
        &mut self,
        original: &Value,
        copy: &Value,
        depth: Option<usize>,
    ) -> Result<(), FacsimileError> {
        match (original, copy) {
            (Value::Map(from), Value::Map(to)) => {
                for (key, value) in from.entries() {
                    let key = self.clone_node(&key, depth)?;
                    let value = self.clone_node(&value, depth)?;
                    to.insert(key, value);
                }
            }
            (Value::Set(from), Value::Set(to)) => {
                for member in from.members() {
                    to.add(self.clone_node(&member, depth)?);
                }
            }
            (Value::Deferred(from), Value::Deferred(to)) => {
                self.schedule_settlement(from, to, depth);
            }
            (Value::Sequence(from), Value::Sequence(to)) => {
                for item in from.values() {
                    to.push(self.clone_node(&item, depth)?);
                }
            }
            (Value::Failure(from), Value::Failure(to)) => {
                self.copy_properties(from, to, depth)?;
            }
            (Value::Record(from), Value::Record(to)) => {
                self.copy_properties(from, to, depth)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Settle `copy` with a clone of `original`'s outcome once it is known.
    fn schedule_settlement(&mut self, original: &Deferred, copy: &Deferred, depth: Option<usize>) {
        self.stats.deferred += 1;
        let mut reaction = Cloner {
            options: self.options.clone(),
            visited: Rc::clone(&self.visited),
            stats: CloneStats::default(),
        };
        let target = copy.clone();
        original.on_settled(move |outcome| {
            let cloned = match outcome {
                Settlement::Fulfilled(value) => {
                    reaction.clone_node(value, depth).map(Settlement::Fulfilled)
                }
                Settlement::Rejected(reason) => {
                    reaction.clone_node(reason, depth).map(Settlement::Rejected)
                }
            };
            let settlement = cloned.unwrap_or_else(|error| {
                debug!(%error, "deferred outcome could not be copied");
                Settlement::Rejected(Value::Failure(Failure::new(
                    "DepthExceeded",
                    &error.to_string(),
                )))
            });
            trace!(fulfilled = settlement.is_fulfilled(), "deferred copy settled");
            target.settle(settlement);
        });
    }

    /// Copy properties in three passes: enumerable names, symbols, then
    /// (with `include_hidden`) non-enumerable names.
    fn copy_properties<H: PropertyHolder>(
        &mut self,
        from: &H,
        to: &H,
        depth: Option<usize>,
    ) -> Result<(), FacsimileError> {
        let properties = from.own_properties();
        let include_hidden = self.options.include_hidden;

        for (key, property) in &properties {
            if !key.is_symbol() && property.is_enumerable() {
                self.copy_property(to, key, property, depth)?;
            }
        }
        for (key, property) in &properties {
            if key.is_symbol() && (property.is_enumerable() || include_hidden) {
                self.copy_property(to, key, property, depth)?;
            }
        }
        if include_hidden {
            for (key, property) in &properties {
                if !key.is_symbol() && !property.is_enumerable() {
                    self.copy_property(to, key, property, depth)?;
                }
            }
        }
        Ok(())
    }

    fn copy_property<H: PropertyHolder>(
        &mut self,
        to: &H,
        key: &PropertyKey,
        property: &Property,
        depth: Option<usize>,
    ) -> Result<(), FacsimileError> {
        let copied = match &property.slot {
            Slot::Accessor(accessor) if accessor.is_computed() => {
                self.stats.accessors_preserved += 1;
                property.clone()
            }
            Slot::Accessor(accessor) => {
                self.stats.accessors_snapshotted += 1;
                let current = accessor.get();
                Property {
                    slot: Slot::Data(self.clone_node(&current, depth)?),
                    attributes: PropertyAttributes {
                        writable: true,
                        ..property.attributes
                    },
                }
            }
            Slot::Data(value) => Property {
                slot: Slot::Data(self.clone_node(value, depth)?),
                attributes: property.attributes,
            },
        };
        to.define_property(key.clone(), copied);
        Ok(())
    }
}

/// Deep copy `value` with a fresh visited set and depth budget.
pub fn deep_clone(value: &Value, options: &CloneOptions) -> Result<Value, FacsimileError> {
    Cloner::new(options.clone())
        .run(value)
        .map(|outcome| outcome.value)
}

// =============================================================================
// TESTS
// =============================================================================
