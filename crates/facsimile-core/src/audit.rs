//! # Audit Module
//!
//! Inspection of a copy against its original:
//! - [`deep_equal`]: structural equality that tolerates cycles
//! - [`deep_equal_with_shape`]: the same, for copies made with a shape override
//! - [`find_aliases`]: every node of the copy still shared with the original
//!
//! Neither function invokes accessors.

use crate::{
    Identity, Property, PropertyHolder, PropertyKey, Settlement, Shape, Slot, Value, ValueKind,
};
use serde::Serialize;
use std::collections::HashSet;

// =============================================================================
// STRUCTURAL EQUALITY
// =============================================================================

/// Whether `a` and `b` have the same structure and contents.
///
/// Primitives compare by SameValueZero, nodes by kind and members. A pair of
/// nodes already under comparison is assumed equal, so cyclic graphs
/// terminate. Record properties compare by key, ignoring definition order;
/// accessors compare by definition and marker. Record shapes compare by
/// identity. A failure's base link is not compared.
#[must_use]
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    Comparison::default().equal(a, b)
}

/// [`deep_equal`] for a copy made with `shape` as its shape override.
///
/// Every record of `copy` that is not the original node itself must carry
/// `shape`; the original's record shapes are not compared.
#[must_use]
pub fn deep_equal_with_shape(original: &Value, copy: &Value, shape: &Shape) -> bool {
    Comparison {
        shape_override: Some(shape.clone()),
        ..Comparison::default()
    }
    .equal(original, copy)
}

#[derive(Default)]
struct Comparison {
    assumed: HashSet<(Identity, Identity)>,
    /// Shape every record on the right-hand side is expected to carry.
    shape_override: Option<Shape>,
}

impl Comparison {
    fn equal(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Primitive(x), Value::Primitive(y)) => x.same_value_zero(y),
            _ if a.kind() != b.kind() => false,
            _ => match (a.identity(), b.identity()) {
                (Some(left), Some(right)) => {
                    if left == right || !self.assumed.insert((left, right)) {
                        return true;
                    }
                    self.nodes_equal(a, b)
                }
                _ => false,
            },
        }
    }

    fn nodes_equal(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Sequence(x), Value::Sequence(y)) => {
                self.all_equal(&x.values(), &y.values())
            }
            (Value::Map(x), Value::Map(y)) => {
                let (left, right) = (x.entries(), y.entries());
                left.len() == right.len()
                    && left
                        .iter()
                        .zip(&right)
                        .all(|((lk, lv), (rk, rv))| self.equal(lk, rk) && self.equal(lv, rv))
            }
            (Value::Set(x), Value::Set(y)) => self.all_equal(&x.members(), &y.members()),
            (Value::Deferred(x), Value::Deferred(y)) => {
                match (x.settlement(), y.settlement()) {
                    (None, None) => true,
                    (Some(Settlement::Fulfilled(l)), Some(Settlement::Fulfilled(r)))
                    | (Some(Settlement::Rejected(l)), Some(Settlement::Rejected(r))) => {
                        self.equal(&l, &r)
                    }
                    _ => false,
                }
            }
            (Value::Pattern(x), Value::Pattern(y)) => {
                x.source() == y.source()
                    && x.flags() == y.flags()
                    && x.last_index() == y.last_index()
            }
            (Value::Instant(x), Value::Instant(y)) => x.time() == y.time(),
            (Value::Bytes(x), Value::Bytes(y)) => x.to_vec() == y.to_vec(),
            (Value::Failure(x), Value::Failure(y)) => {
                x.name() == y.name()
                    && x.message() == y.message()
                    && x.trace() == y.trace()
                    && self.properties_equal(x, y)
            }
            (Value::Record(x), Value::Record(y)) => {
                let same_shape = match &self.shape_override {
                    Some(expected) => y.shape().is_some_and(|s| s.ptr_eq(expected)),
                    None => match (x.shape(), y.shape()) {
                        (None, None) => true,
                        (Some(l), Some(r)) => l.ptr_eq(&r),
                        _ => false,
                    },
                };
                same_shape && self.properties_equal(x, y)
            }
            _ => false,
        }
    }

    fn all_equal(&mut self, left: &[Value], right: &[Value]) -> bool {
        left.len() == right.len() && left.iter().zip(right).all(|(l, r)| self.equal(l, r))
    }

    fn properties_equal<H: PropertyHolder>(&mut self, a: &H, b: &H) -> bool {
        let left = a.own_properties();
        if left.len() != b.own_properties().len() {
            return false;
        }
        left.iter().all(|(key, property)| match b.property(key) {
            Some(other) => self.property_equal(property, &other),
            None => false,
        })
    }

    fn property_equal(&mut self, a: &Property, b: &Property) -> bool {
        if a.attributes != b.attributes {
            return false;
        }
        match (&a.slot, &b.slot) {
            (Slot::Data(l), Slot::Data(r)) => self.equal(l, r),
            (Slot::Accessor(l), Slot::Accessor(r)) => {
                l.ptr_eq(r) && l.is_computed() == r.is_computed()
            }
            _ => false,
        }
    }
}

// =============================================================================
// ALIAS DETECTION
// =============================================================================

/// A node of a copy that is shared with the original graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alias {
    /// Location in the copy, e.g. `$.b[1]` or `$<value 0>`.
    pub path: String,
    pub kind: ValueKind,
}

/// List every node reachable from `copy` that is also reachable from
/// `original`, in depth-first order.
///
/// Each shared node is reported once, at the first path it is found on, and
/// the walk does not descend into it. An empty result means the copy is fully
/// independent.
#[must_use]
pub fn find_aliases(original: &Value, copy: &Value) -> Vec<Alias> {
    let reachable = reachable_identities(original);
    let mut seen = HashSet::new();
    let mut aliases = Vec::new();
    let mut stack = vec![(String::from("$"), copy.clone())];

    while let Some((path, value)) = stack.pop() {
        let Some(identity) = value.identity() else {
            continue;
        };
        if !seen.insert(identity) {
            continue;
        }
        if reachable.contains(&identity) {
            aliases.push(Alias {
                path,
                kind: value.kind(),
            });
            continue;
        }
        for (segment, child) in members(&value).into_iter().rev() {
            stack.push((format!("{path}{segment}"), child));
        }
    }
    aliases
}

fn reachable_identities(root: &Value) -> HashSet<Identity> {
    let mut reachable = HashSet::new();
    let mut stack = vec![root.clone()];
    while let Some(value) = stack.pop() {
        let Some(identity) = value.identity() else {
            continue;
        };
        if reachable.insert(identity) {
            stack.extend(members(&value).into_iter().map(|(_, child)| child));
        }
    }
    reachable
}

/// Direct members of a node with their path segments. Accessors are skipped.
fn members(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Sequence(sequence) => sequence
            .values()
            .into_iter()
            .enumerate()
            .map(|(i, item)| (format!("[{i}]"), item))
            .collect(),
        Value::Map(map) => map
            .entries()
            .into_iter()
            .enumerate()
            .flat_map(|(i, (key, value))| {
                [(format!("<key {i}>"), key), (format!("<value {i}>"), value)]
            })
            .collect(),
        Value::Set(set) => set
            .members()
            .into_iter()
            .enumerate()
            .map(|(i, member)| (format!("<member {i}>"), member))
            .collect(),
        Value::Deferred(deferred) => match deferred.settlement() {
            Some(Settlement::Fulfilled(value)) => vec![("<fulfilled>".to_string(), value)],
            Some(Settlement::Rejected(reason)) => vec![("<rejected>".to_string(), reason)],
            None => Vec::new(),
        },
        Value::Failure(failure) => data_properties(failure),
        Value::Record(record) => data_properties(record),
        _ => Vec::new(),
    }
}

fn data_properties<H: PropertyHolder>(holder: &H) -> Vec<(String, Value)> {
    holder
        .own_properties()
        .into_iter()
        .filter_map(|(key, property)| match property.slot {
            Slot::Data(value) => Some((property_segment(&key), value)),
            Slot::Accessor(_) => None,
        })
        .collect()
}

fn property_segment(key: &PropertyKey) -> String {
    format!(".{key}")
}

// =============================================================================
// TESTS
// =============================================================================
