//! # Failure Values
//!
//! Error-carrying values. A failure may be *derived* from another: the derived
//! failure reports the same name, message, and trace, and keeps a `base` link to
//! the failure it was derived from, so checks against the original still hold
//! on the copy.

use super::record::{PropertyHolder, PropertyKey, PropertyTable, table_snapshot};
use super::{Identity, Property};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub(crate) struct FailureData {
    name: Rc<str>,
    message: Rc<str>,
    trace: Option<Rc<str>>,
    base: Option<Failure>,
    properties: PropertyTable,
}

/// An error/exception value.
#[derive(Clone)]
pub struct Failure(pub(crate) Rc<FailureData>);

impl Failure {
    /// A root failure without trace.
    #[must_use]
    pub fn new(name: &str, message: &str) -> Self {
        Self::build(Rc::from(name), Rc::from(message), None, None)
    }

    /// A root failure carrying a captured trace.
    #[must_use]
    pub fn with_trace(name: &str, message: &str, trace: &str) -> Self {
        Self::build(Rc::from(name), Rc::from(message), Some(Rc::from(trace)), None)
    }

    fn build(
        name: Rc<str>,
        message: Rc<str>,
        trace: Option<Rc<str>>,
        base: Option<Failure>,
    ) -> Self {
        Self(Rc::new(FailureData {
            name,
            message,
            trace,
            base,
            properties: RefCell::new(IndexMap::new()),
        }))
    }

    /// A new failure based on this one, with no own properties.
    #[must_use]
    pub fn derive(&self) -> Self {
        Self::build(
            self.0.name.clone(),
            self.0.message.clone(),
            self.0.trace.clone(),
            Some(self.clone()),
        )
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.0.message
    }

    #[must_use]
    pub fn trace(&self) -> Option<&str> {
        self.0.trace.as_deref()
    }

    /// The failure this one was derived from.
    #[must_use]
    pub fn base(&self) -> Option<&Failure> {
        self.0.base.as_ref()
    }

    /// Whether `ancestor` appears in this failure's base chain.
    #[must_use]
    pub fn is_derived_from(&self, ancestor: &Failure) -> bool {
        let mut current = self.base();
        while let Some(failure) = current {
            if failure.ptr_eq(ancestor) {
                return true;
            }
            current = failure.base();
        }
        false
    }

    /// The first failure of the base chain.
    #[must_use]
    pub fn root(&self) -> Failure {
        let mut current = self.clone();
        while let Some(base) = current.base().cloned() {
            current = base;
        }
        current
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl PropertyHolder for Failure {
    fn own_properties(&self) -> Vec<(PropertyKey, Property)> {
        table_snapshot(&self.0.properties)
    }

    fn define_property(&self, key: PropertyKey, property: Property) {
        self.0.properties.borrow_mut().insert(key, property);
    }

    fn property(&self, key: &PropertyKey) -> Option<Property> {
        self.0.properties.borrow().get(key).cloned()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.message())
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failure({}, @{})", self, self.identity())
    }
}
