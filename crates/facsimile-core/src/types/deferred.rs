//! # Deferred Results
//!
//! A single-assignment asynchronous container. It starts pending and settles
//! exactly once, either fulfilled with a value or rejected with a reason.
//! Reactions registered with [`Deferred::on_settled`] run when it settles, or
//! immediately if it already has.

use super::{Identity, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Outcome of a settled deferred.
#[derive(Debug, Clone)]
pub enum Settlement {
    Fulfilled(Value),
    Rejected(Value),
}

impl Settlement {
    /// The fulfillment value or rejection reason.
    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            Self::Fulfilled(value) | Self::Rejected(value) => value,
        }
    }

    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }
}

type Reaction = Box<dyn FnOnce(&Settlement)>;

pub(crate) enum DeferredState {
    Pending(Vec<Reaction>),
    Settled(Settlement),
}

/// Asynchronous single-value container.
#[derive(Clone)]
pub struct Deferred(pub(crate) Rc<RefCell<DeferredState>>);

impl Deferred {
    /// A pending deferred.
    #[must_use]
    pub fn pending() -> Self {
        Self(Rc::new(RefCell::new(DeferredState::Pending(Vec::new()))))
    }

    /// An already fulfilled deferred.
    #[must_use]
    pub fn fulfilled(value: Value) -> Self {
        Self(Rc::new(RefCell::new(DeferredState::Settled(
            Settlement::Fulfilled(value),
        ))))
    }

    /// An already rejected deferred.
    #[must_use]
    pub fn rejected(reason: Value) -> Self {
        Self(Rc::new(RefCell::new(DeferredState::Settled(
            Settlement::Rejected(reason),
        ))))
    }

    /// Fulfill. Returns false if already settled.
    pub fn resolve(&self, value: Value) -> bool {
        self.settle(Settlement::Fulfilled(value))
    }

    /// Reject. Returns false if already settled.
    pub fn reject(&self, reason: Value) -> bool {
        self.settle(Settlement::Rejected(reason))
    }

    /// Settle with an outcome and run pending reactions in registration order.
    pub fn settle(&self, outcome: Settlement) -> bool {
        let reactions = {
            let mut state = self.0.borrow_mut();
            if matches!(*state, DeferredState::Settled(_)) {
                return false;
            }
            match std::mem::replace(&mut *state, DeferredState::Settled(outcome.clone())) {
                DeferredState::Pending(reactions) => reactions,
                DeferredState::Settled(_) => Vec::new(),
            }
        };
        for reaction in reactions {
            reaction(&outcome);
        }
        true
    }

    /// Register a reaction to run once settled.
    pub fn on_settled(&self, reaction: impl FnOnce(&Settlement) + 'static) {
        let settled = {
            let mut state = self.0.borrow_mut();
            match &mut *state {
                DeferredState::Pending(reactions) => {
                    reactions.push(Box::new(reaction));
                    return;
                }
                DeferredState::Settled(outcome) => outcome.clone(),
            }
        };
        reaction(&settled);
    }

    /// The outcome, if settled.
    #[must_use]
    pub fn settlement(&self) -> Option<Settlement> {
        match &*self.0.borrow() {
            DeferredState::Pending(_) => None,
            DeferredState::Settled(outcome) => Some(outcome.clone()),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(*self.0.borrow(), DeferredState::Pending(_))
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.settlement() {
            None => write!(f, "Deferred(<pending>, @{})", self.identity()),
            Some(Settlement::Fulfilled(v)) => {
                write!(f, "Deferred(<fulfilled>: {:?}, @{})", v, self.identity())
            }
            Some(Settlement::Rejected(v)) => {
                write!(f, "Deferred(<rejected>: {:?}, @{})", v, self.identity())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn settles_once() {
        let deferred = Deferred::pending();
        assert!(deferred.is_pending());
        assert!(deferred.resolve(Value::int(1)));
        assert!(!deferred.reject(Value::int(2)));
        let outcome = deferred.settlement().expect("settled");
        assert!(outcome.is_fulfilled());
        assert_eq!(outcome.value().as_int(), Some(1));
    }

    #[test]
    fn reactions_run_on_settlement() {
        let deferred = Deferred::pending();
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        deferred.on_settled(move |outcome| sink.set(outcome.value().as_int().unwrap_or(-1)));
        assert_eq!(seen.get(), 0);

        deferred.reject(Value::int(9));
        assert_eq!(seen.get(), 9);
    }

    #[test]
    fn late_reaction_runs_immediately() {
        let deferred = Deferred::fulfilled(Value::int(5));
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        deferred.on_settled(move |outcome| sink.set(outcome.value().as_int().unwrap_or(-1)));
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn reaction_may_register_on_same_deferred() {
        let deferred = Deferred::pending();
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        let inner = deferred.clone();
        deferred.on_settled(move |_| {
            inner.on_settled(move |outcome| sink.set(outcome.value().as_int().unwrap_or(-1)));
        });
        deferred.resolve(Value::int(3));
        assert_eq!(seen.get(), 3);
    }
}
