//! # Visited Set
//!
//! Per-invocation map from original nodes to their copies.
//!
//! An entry is registered as soon as the empty copy exists, before any member
//! is cloned, so a cycle back to a node in progress resolves to its copy.
//!
//! Entries hold weak handles only. A deferred reaction keeps the set alive
//! after the synchronous walk returns, and the set must not keep either graph
//! alive in turn. A weak handle still pins its allocation, so an identity in
//! the set is never reused by a different node.

use crate::types::WeakValue;
use crate::{Identity, Value};
use std::collections::HashMap;

#[derive(Debug)]
struct Entry {
    original: WeakValue,
    copy: WeakValue,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.original.is_live() && self.copy.is_live()
    }
}

/// Identity map of originals to copies for one clone invocation.
#[derive(Debug, Default)]
pub struct VisitedSet {
    entries: HashMap<Identity, Entry>,
}

impl VisitedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy already made for `identity`, if it is still alive.
    #[must_use]
    pub fn get(&self, identity: Identity) -> Option<Value> {
        self.entries.get(&identity)?.copy.upgrade()
    }

    /// Record `copy` as the copy of `original`.
    ///
    /// A live identity is registered at most once; a second registration keeps
    /// the first copy and returns false. An entry whose original or copy has
    /// been dropped is replaced. `Null` and primitives are never registered.
    pub fn register(&mut self, identity: Identity, original: &Value, copy: &Value) -> bool {
        if self.entries.get(&identity).is_some_and(Entry::is_live) {
            return false;
        }
        let (Some(original), Some(copy)) = (original.downgrade(), copy.downgrade()) else {
            return false;
        };
        self.entries.insert(identity, Entry { original, copy });
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sequence;

    #[test]
    fn registers_once() {
        let original = Value::from(Sequence::new());
        let first = Value::from(Sequence::new());
        let second = Value::from(Sequence::new());
        let identity = original.identity().expect("node");

        let mut visited = VisitedSet::new();
        assert!(visited.register(identity, &original, &first));
        assert!(!visited.register(identity, &original, &second));

        assert_eq!(visited.len(), 1);
        assert!(visited.get(identity).is_some_and(|copy| copy.ptr_eq(&first)));
    }

    #[test]
    fn lookups_use_identity() {
        let a = Value::from(Sequence::new());
        let b = Value::from(Sequence::new());
        let mut visited = VisitedSet::new();
        visited.register(a.identity().expect("node"), &a, &a);
        assert!(visited.get(b.identity().expect("node")).is_none());
    }

    #[test]
    fn entries_do_not_own_nodes() {
        let original = Value::from(Sequence::new());
        let copy = Value::from(Sequence::new());
        let identity = original.identity().expect("node");
        let mut visited = VisitedSet::new();
        visited.register(identity, &original, &copy);

        drop(copy);
        assert!(visited.get(identity).is_none());

        let replacement = Value::from(Sequence::new());
        assert!(visited.register(identity, &original, &replacement));
        assert!(visited.get(identity).is_some_and(|c| c.ptr_eq(&replacement)));
    }
}
