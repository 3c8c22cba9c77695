//! # Keyed Records
//!
//! Generic keyed structures: the fallback kind for every host object the
//! cloner has no dedicated variant for.
//!
//! A record owns an ordered property table. Each property has attributes and a
//! slot that is either a stored value or an accessor. Accessors carry an
//! explicit `computed` marker; the cloner copies computed accessors as
//! definitions and snapshots every other accessor into a stored value.

use super::{Identity, Symbol, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// SHAPE
// =============================================================================

struct ShapeData {
    name: Rc<str>,
    parent: Option<Shape>,
}

/// Type descriptor of a record, compared by identity.
#[derive(Clone)]
pub struct Shape(Rc<ShapeData>);

impl Shape {
    /// A root shape.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(Rc::new(ShapeData {
            name: Rc::from(name),
            parent: None,
        }))
    }

    /// A shape that specializes `parent`.
    #[must_use]
    pub fn extending(name: &str, parent: &Shape) -> Self {
        Self(Rc::new(ShapeData {
            name: Rc::from(name),
            parent: Some(parent.clone()),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Shape> {
        self.0.parent.as_ref()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Shape) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Whether `other` is this shape or one of its ancestors.
    #[must_use]
    pub fn is_a(&self, other: &Shape) -> bool {
        let mut current = Some(self);
        while let Some(shape) = current {
            if shape.ptr_eq(other) {
                return true;
            }
            current = shape.parent();
        }
        false
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({})", self.name())
    }
}

// =============================================================================
// PROPERTY KEY
// =============================================================================

/// Property key: a name or a symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Name(Rc<str>),
    Symbol(Symbol),
}

impl PropertyKey {
    #[must_use]
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol(symbol) => write!(f, "@@{}", symbol.description()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        Self::Name(Rc::from(name))
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

// =============================================================================
// PROPERTY ATTRIBUTES
// =============================================================================

/// Property attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyAttributes {
    /// Property is writable
    pub writable: bool,
    /// Property is enumerable
    pub enumerable: bool,
    /// Property is configurable
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Default attributes of an assigned property.
    pub const fn data() -> Self {
        Self {
            writable: true,
            enumerable: true,
            configurable: true,
        }
    }

    /// Writable and configurable, but skipped by enumeration.
    pub const fn hidden() -> Self {
        Self {
            writable: true,
            enumerable: false,
            configurable: true,
        }
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self {
            writable: false,
            enumerable: false,
            configurable: false,
        }
    }
}

impl Default for PropertyAttributes {
    fn default() -> Self {
        Self::data()
    }
}

// =============================================================================
// ACCESSOR
// =============================================================================

type Getter = Rc<dyn Fn() -> Value>;
type Setter = Rc<dyn Fn(Value)>;

/// A derived property: a getter, an optional setter, and the computed marker.
#[derive(Clone)]
pub struct Accessor {
    getter: Getter,
    setter: Option<Setter>,
    computed: bool,
}

impl Accessor {
    /// A plain accessor. Cloning invokes it and stores the result.
    #[must_use]
    pub fn new(getter: impl Fn() -> Value + 'static) -> Self {
        Self {
            getter: Rc::new(getter),
            setter: None,
            computed: false,
        }
    }

    /// A computed accessor. Cloning copies the definition, never the result.
    #[must_use]
    pub fn computed(getter: impl Fn() -> Value + 'static) -> Self {
        Self {
            getter: Rc::new(getter),
            setter: None,
            computed: true,
        }
    }

    #[must_use]
    pub fn with_setter(mut self, setter: impl Fn(Value) + 'static) -> Self {
        self.setter = Some(Rc::new(setter));
        self
    }

    #[must_use]
    pub fn is_computed(&self) -> bool {
        self.computed
    }

    #[must_use]
    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }

    /// Invoke the getter.
    #[must_use]
    pub fn get(&self) -> Value {
        (self.getter)()
    }

    /// Invoke the setter. Returns false if there is none.
    pub fn set(&self, value: Value) -> bool {
        match &self.setter {
            Some(setter) => {
                setter(value);
                true
            }
            None => false,
        }
    }

    /// Whether both accessors share the same getter definition.
    #[must_use]
    pub fn ptr_eq(&self, other: &Accessor) -> bool {
        Rc::ptr_eq(&self.getter, &other.getter)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("computed", &self.computed)
            .field("setter", &self.setter.is_some())
            .finish()
    }
}

// =============================================================================
// PROPERTY
// =============================================================================

/// Storage of a property.
#[derive(Clone, Debug)]
pub enum Slot {
    Data(Value),
    Accessor(Accessor),
}

/// A property: slot plus attributes.
#[derive(Clone, Debug)]
pub struct Property {
    pub slot: Slot,
    pub attributes: PropertyAttributes,
}

impl Property {
    /// Enumerable, writable, configurable stored value.
    #[must_use]
    pub fn data(value: Value) -> Self {
        Self {
            slot: Slot::Data(value),
            attributes: PropertyAttributes::data(),
        }
    }

    /// Stored value skipped by enumeration.
    #[must_use]
    pub fn hidden(value: Value) -> Self {
        Self {
            slot: Slot::Data(value),
            attributes: PropertyAttributes::hidden(),
        }
    }

    /// Enumerable accessor.
    #[must_use]
    pub fn accessor(accessor: Accessor) -> Self {
        Self {
            slot: Slot::Accessor(accessor),
            attributes: PropertyAttributes::data(),
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: PropertyAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn is_enumerable(&self) -> bool {
        self.attributes.enumerable
    }

    /// Current value: the stored value, or the getter's result.
    #[must_use]
    pub fn read(&self) -> Value {
        match &self.slot {
            Slot::Data(value) => value.clone(),
            Slot::Accessor(accessor) => accessor.get(),
        }
    }
}

// =============================================================================
// PROPERTY HOLDER
// =============================================================================

/// Anything owning a keyed property table (records and failures).
pub trait PropertyHolder {
    /// Snapshot of own properties in definition order.
    fn own_properties(&self) -> Vec<(PropertyKey, Property)>;

    /// Define or replace an own property.
    fn define_property(&self, key: PropertyKey, property: Property);

    /// Own property by key.
    fn property(&self, key: &PropertyKey) -> Option<Property>;

    /// Current value of a property; accessors are invoked.
    fn get(&self, key: &str) -> Option<Value> {
        self.property(&PropertyKey::from(key)).map(|p| p.read())
    }

    /// Assign a stored enumerable value.
    fn set(&self, key: &str, value: Value) {
        self.define_property(PropertyKey::from(key), Property::data(value));
    }
}

/// Property table shared by records and failures.
pub(crate) type PropertyTable = RefCell<IndexMap<PropertyKey, Property>>;

pub(crate) fn table_snapshot(table: &PropertyTable) -> Vec<(PropertyKey, Property)> {
    table
        .borrow()
        .iter()
        .map(|(k, p)| (k.clone(), p.clone()))
        .collect()
}

// =============================================================================
// RECORD
// =============================================================================

pub(crate) struct RecordData {
    shape: Option<Shape>,
    properties: PropertyTable,
}

/// Plain keyed structure with an optional shape.
#[derive(Clone)]
pub struct Record(pub(crate) Rc<RecordData>);

impl Record {
    /// Shapeless empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shape(None)
    }

    /// Empty record of the given shape.
    #[must_use]
    pub fn shaped(shape: &Shape) -> Self {
        Self::with_shape(Some(shape.clone()))
    }

    #[must_use]
    pub fn with_shape(shape: Option<Shape>) -> Self {
        Self(Rc::new(RecordData {
            shape,
            properties: RefCell::new(IndexMap::new()),
        }))
    }

    /// Build a record from enumerable stored fields.
    #[must_use]
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let record = Self::new();
        for (name, value) in fields {
            record.set(name, value);
        }
        record
    }

    #[must_use]
    pub fn shape(&self) -> Option<Shape> {
        self.0.shape.clone()
    }

    /// Remove an own property, preserving the order of the rest.
    pub fn remove(&self, key: &PropertyKey) -> Option<Property> {
        self.0.properties.borrow_mut().shift_remove(key)
    }

    /// Own keys in definition order.
    #[must_use]
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.0.properties.borrow().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.properties.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.properties.borrow().is_empty()
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::of(&self.0)
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyHolder for Record {
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

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = self.0.shape.as_ref().map_or("-", |s| s.name());
        write!(f, "Record({}, len={}, @{})", shape, self.len(), self.identity())
    }
}

// =============================================================================
// TESTS
// =============================================================================
