//! # Clone Scenario Tests (S0-S4)
//!
//! End-to-end behavior of `deep_clone` on representative graphs.
//!
//! ## Tiers
//! - S0: Leaves (null, primitives)
//! - S1: Plain structures
//! - S2: Cycles and sharing
//! - S3: Depth budget
//! - S4: Special kinds (bytes, failures, patterns, instants, deferreds, accessors)

use facsimile_core::{
    Accessor, AssocMap, Bytes, CloneOptions, Cloner, Deferred, DepthPolicy, FacsimileError,
    Failure, Instant, Pattern, Property, PropertyAttributes, PropertyHolder, PropertyKey, Record,
    Sequence, Shape, Slot, Symbol, UniqueSet, Value, deep_clone, deep_equal, find_aliases,
};
use std::cell::Cell;
use std::rc::Rc;

fn clone(value: &Value) -> Value {
    deep_clone(value, &CloneOptions::default()).expect("clone")
}

fn field(value: &Value, name: &str) -> Value {
    value
        .as_record()
        .and_then(|record| record.get(name))
        .expect("field present")
}

// =============================================================================
// TIER S0: LEAVES
// =============================================================================

mod s0_leaves {
    use super::*;

    /// S0.1: Null clones to null.
    #[test]
    fn null_clones_to_null() {
        assert!(clone(&Value::Null).is_null());
    }

    /// S0.2: An integer clones to the same integer.
    #[test]
    fn integer_clones_to_itself() {
        assert_eq!(clone(&Value::int(42)).as_int(), Some(42));
    }

    /// S0.3: Symbols keep their identity.
    #[test]
    fn symbol_keeps_identity() {
        let symbol = Symbol::new("token");
        let copy = clone(&Value::symbol(symbol.clone()));
        assert_eq!(copy.as_symbol(), Some(&symbol));
    }

    /// S0.4: NaN survives as NaN.
    #[test]
    fn nan_survives() {
        let copy = clone(&Value::float(f64::NAN));
        assert!(copy.as_float().is_some_and(f64::is_nan));
    }
}

// =============================================================================
// TIER S1: PLAIN STRUCTURES
// =============================================================================

mod s1_structures {
    use super::*;

    fn scenario() -> Value {
        Value::from(Record::from_fields([
            ("a", Value::int(1)),
            (
                "b",
                Value::from(Sequence::from_values([
                    Value::int(1),
                    Value::int(2),
                    Value::int(3),
                ])),
            ),
            ("c", Value::from(Record::from_fields([("d", Value::int(1))]))),
        ]))
    }

    /// S1.1: `{a:1, b:[1,2,3], c:{d:1}}` is equal but shares no node.
    #[test]
    fn nested_record_is_independent() {
        let original = scenario();
        let copy = clone(&original);

        assert!(deep_equal(&original, &copy));
        assert!(!copy.ptr_eq(&original));
        assert!(!field(&copy, "b").ptr_eq(&field(&original, "b")));
        assert!(!field(&copy, "c").ptr_eq(&field(&original, "c")));
        assert!(find_aliases(&original, &copy).is_empty());
    }

    /// S1.2: Mutating the copy leaves the original untouched.
    #[test]
    fn mutation_does_not_leak() {
        let original = scenario();
        let copy = clone(&original);

        field(&copy, "b").as_sequence().expect("b").push(Value::int(4));
        if let Some(record) = copy.as_record() {
            record.set("a", Value::int(9));
        }

        assert_eq!(field(&original, "a").as_int(), Some(1));
        assert_eq!(field(&original, "b").as_sequence().map(Sequence::len), Some(3));
    }

    /// S1.3: Map keys and values are both copied; order is kept.
    #[test]
    fn map_entries_copied_in_order() {
        let key = Value::from(Sequence::from_values([Value::int(1)]));
        let map = AssocMap::new();
        map.insert(Value::str("z"), Value::int(26));
        map.insert(key.clone(), Value::str("list"));
        map.insert(Value::str("a"), Value::int(1));

        let copy = clone(&Value::from(map));
        let entries = copy.as_map().expect("map").entries();
        assert_eq!(entries[0].0.as_str(), Some("z"));
        assert!(entries[1].0.as_sequence().is_some());
        assert!(!entries[1].0.ptr_eq(&key));
        assert_eq!(entries[2].0.as_str(), Some("a"));
    }

    /// S1.4: Set members are copied.
    #[test]
    fn set_members_copied() {
        let member = Value::from(Record::new());
        let set = UniqueSet::new();
        set.add(member.clone());
        set.add(Value::int(5));

        let copy = clone(&Value::from(set));
        let members = copy.as_set().expect("set").members();
        assert_eq!(members.len(), 2);
        assert!(!members[0].ptr_eq(&member));
        assert_eq!(members[1].as_int(), Some(5));
    }
}

// =============================================================================
// TIER S2: CYCLES AND SHARING
// =============================================================================

mod s2_cycles {
    use super::*;

    /// S2.1: `x.self = x` clones to `y.self == y`.
    #[test]
    fn self_reference() {
        let record = Record::new();
        let value = Value::from(record.clone());
        record.set("self", value.clone());

        let copy = clone(&value);
        assert!(field(&copy, "self").ptr_eq(&copy));
        assert!(!copy.ptr_eq(&value));
    }

    /// S2.2: A → B → C → A clones to A' → B' → C' → A'.
    #[test]
    fn three_cycle() {
        let (a, b, c) = (Record::new(), Record::new(), Record::new());
        a.set("next", Value::from(b.clone()));
        b.set("next", Value::from(c.clone()));
        c.set("next", Value::from(a.clone()));
        let original = Value::from(a);

        let a2 = clone(&original);
        let b2 = field(&a2, "next");
        let c2 = field(&b2, "next");
        assert!(field(&c2, "next").ptr_eq(&a2));
        for copy in [&a2, &b2, &c2] {
            assert!(find_aliases(&original, copy).is_empty());
        }
    }

    /// S2.3: A node shared by two parents is copied once.
    #[test]
    fn diamond_is_preserved() {
        let shared = Value::from(Record::from_fields([("x", Value::int(1))]));
        let root = Value::from(Record::from_fields([
            ("left", shared.clone()),
            ("right", shared),
        ]));

        let copy = clone(&root);
        assert!(field(&copy, "left").ptr_eq(&field(&copy, "right")));
    }

    /// S2.4: A map that contains itself as a key and a value.
    #[test]
    fn map_containing_itself() {
        let map = AssocMap::new();
        let value = Value::from(map.clone());
        map.insert(value.clone(), value.clone());

        let copy = clone(&value);
        let entries = copy.as_map().expect("map").entries();
        assert!(entries[0].0.ptr_eq(&copy));
        assert!(entries[0].1.ptr_eq(&copy));
    }

    /// S2.5: Stats count copies and resolved cycles.
    #[test]
    fn stats_count_cycles() {
        let record = Record::new();
        let value = Value::from(record.clone());
        record.set("a", value.clone());
        record.set("b", value.clone());

        let outcome = Cloner::new(CloneOptions::default()).run(&value).expect("clone");
        assert_eq!(outcome.stats.copied, 1);
        assert_eq!(outcome.stats.cycles_resolved, 2);
    }
}

// =============================================================================
// TIER S3: DEPTH BUDGET
// =============================================================================

mod s3_depth {
    use super::*;

    /// S3.1: Depth 0 returns the original handle.
    #[test]
    fn depth_zero_aliases_root() {
        let value = Value::from(Sequence::new());
        let copy = deep_clone(&value, &CloneOptions::new().with_depth(0)).expect("clone");
        assert!(copy.ptr_eq(&value));
    }

    /// S3.2: Depth 1 copies the root only.
    #[test]
    fn depth_one_copies_root() {
        let child = Value::from(Record::new());
        let root = Value::from(Record::from_fields([("child", child.clone())]));

        let outcome = Cloner::new(CloneOptions::new().with_depth(1))
            .run(&root)
            .expect("clone");
        assert!(!outcome.value.ptr_eq(&root));
        assert!(field(&outcome.value, "child").ptr_eq(&child));
        assert_eq!(outcome.stats.truncated, 1);

        let aliases = find_aliases(&root, &outcome.value);
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].path, "$.child");
    }

    /// S3.3: The strict policy reports the configured limit.
    #[test]
    fn strict_policy_fails() {
        let root = Value::from(Sequence::from_values([Value::from(Sequence::from_values([
            Value::from(Sequence::new()),
        ]))]));
        let options = CloneOptions::new()
            .with_depth(2)
            .with_depth_policy(DepthPolicy::Fail);

        let error = deep_clone(&root, &options).expect_err("depth exceeded");
        assert_eq!(error, FacsimileError::DepthExceeded { limit: 2 });
        assert_eq!(
            error.to_string(),
            "Depth limit 2 exhausted before the graph was fully copied"
        );
    }

    /// S3.4: A cycle inside the budget is still resolved.
    #[test]
    fn cycle_within_budget() {
        let record = Record::new();
        let value = Value::from(record.clone());
        record.set("self", value.clone());

        let copy = deep_clone(&value, &CloneOptions::new().with_depth(5)).expect("clone");
        assert!(field(&copy, "self").ptr_eq(&copy));
    }
}

// =============================================================================
// TIER S4: SPECIAL KINDS
// =============================================================================

mod s4_special_kinds {
    use super::*;

    /// S4.1: Two references to one buffer yield two distinct buffers.
    #[test]
    fn shared_buffer_copied_twice() {
        let buffer = Value::from(Bytes::from_vec(b"abc".to_vec()));
        let root = Value::from(Sequence::from_values([buffer.clone(), buffer]));

        let copy = clone(&root);
        let items = copy.as_sequence().expect("sequence").values();
        assert!(!items[0].ptr_eq(&items[1]));
        assert_eq!(items[0].as_bytes().map(Bytes::to_vec), Some(b"abc".to_vec()));
    }

    /// S4.2: A failure copy is derived from the original.
    #[test]
    fn failure_derivation() {
        let failure = Failure::with_trace("RangeError", "out of range", "at check (lib.rs:10)");
        failure.set("index", Value::int(12));
        let original = Value::from(failure.clone());

        let copy = clone(&original);
        let copied = copy.as_failure().expect("failure");
        assert!(copied.is_derived_from(&failure));
        assert_eq!(copied.to_string(), "RangeError: out of range");
        assert_eq!(copied.get("index").and_then(|v| v.as_int()), Some(12));
        assert!(deep_equal(&original, &copy));
    }

    /// S4.3: Patterns keep source, flags, and matching position.
    #[test]
    fn pattern_state() {
        let pattern = Pattern::new("[0-9]+", "gmy").expect("pattern");
        assert_eq!(pattern.find_next("42 apples"), Some((0, 2)));

        let copy = clone(&Value::from(pattern.clone()));
        let copied = copy.as_pattern().expect("pattern");
        assert_eq!(copied.to_string(), "/[0-9]+/gmy");
        assert_eq!(copied.last_index(), 2);

        copied.set_last_index(0);
        assert_eq!(pattern.last_index(), 2);
    }

    /// S4.4: Instants hold the same time and are independent.
    #[test]
    fn instant_independence() {
        let instant = Instant::from_millis(1_600_000_000_000).expect("instant");
        let copy = clone(&Value::from(instant.clone()));
        let copied = copy.as_instant().expect("instant");

        assert_eq!(copied.time(), instant.time());
        copied.set_time(Instant::from_millis(0).expect("epoch").time());
        assert_eq!(instant.millis(), 1_600_000_000_000);
    }

    /// S4.5: A pending deferred settles its copy when it settles.
    #[test]
    fn deferred_settles_later() {
        let original = Deferred::pending();
        let payload = Value::from(Record::from_fields([("ok", Value::bool(true))]));
        let copy = clone(&Value::from(original.clone()));
        let copied = copy.as_deferred().expect("deferred");

        assert!(copied.is_pending());
        original.resolve(payload.clone());

        let outcome = copied.settlement().expect("settled");
        assert!(outcome.is_fulfilled());
        assert!(!outcome.value().ptr_eq(&payload));
        assert!(deep_equal(outcome.value(), &payload));
    }

    /// S4.6: Computed accessors are preserved and never invoked.
    #[test]
    fn computed_accessor_preserved() {
        let calls = Rc::new(Cell::new(0u32));
        let counter = calls.clone();
        let record = Record::new();
        record.set("base", Value::int(2));
        record.define_property(
            PropertyKey::from("doubled"),
            Property::accessor(Accessor::computed(move || {
                counter.set(counter.get() + 1);
                Value::int(4)
            })),
        );

        let copy = clone(&Value::from(record));
        assert_eq!(calls.get(), 0);

        let property = copy
            .as_record()
            .and_then(|r| r.property(&PropertyKey::from("doubled")))
            .expect("doubled");
        assert!(matches!(property.slot, Slot::Accessor(ref a) if a.is_computed()));
        assert_eq!(property.read().as_int(), Some(4));
        assert_eq!(calls.get(), 1);
    }

    /// S4.7: Plain accessors are read once and stored.
    #[test]
    fn plain_accessor_snapshot() {
        let state = Rc::new(Cell::new(1i64));
        let source = state.clone();
        let record = Record::new();
        record.define_property(
            PropertyKey::from("current"),
            Property::accessor(Accessor::new(move || Value::int(source.get()))),
        );

        let copy = clone(&Value::from(record));
        state.set(2);
        assert_eq!(field(&copy, "current").as_int(), Some(1));
    }

    /// S4.8: Hidden properties are copied only on request, attributes intact.
    #[test]
    fn hidden_properties() {
        let record = Record::new();
        record.set("visible", Value::int(1));
        record.define_property(
            PropertyKey::from("locked"),
            Property::data(Value::int(2)).with_attributes(PropertyAttributes::frozen()),
        );
        let value = Value::from(record);

        let plain = clone(&value);
        assert!(plain.as_record().is_some_and(|r| r.len() == 1));

        let full = deep_clone(&value, &CloneOptions::new().including_hidden()).expect("clone");
        let locked = full
            .as_record()
            .and_then(|r| r.property(&PropertyKey::from("locked")))
            .expect("locked");
        assert_eq!(locked.attributes, PropertyAttributes::frozen());
        assert!(deep_equal(&value, &full));
    }

    /// S4.9: The shape override applies to every record copy.
    #[test]
    fn shape_override_everywhere() {
        let original_shape = Shape::named("Widget");
        let inner = Record::shaped(&original_shape);
        let outer = Record::shaped(&original_shape);
        outer.set("inner", Value::from(inner));

        let plain = Shape::named("PlainObject");
        let options = CloneOptions::new().with_shape_override(plain.clone());
        let copy = deep_clone(&Value::from(outer), &options).expect("clone");

        for node in [copy.clone(), field(&copy, "inner")] {
            let shape = node.as_record().and_then(Record::shape).expect("shape");
            assert!(shape.ptr_eq(&plain));
        }
    }

    /// S4.10: With cycle detection off, shared nodes become separate copies.
    #[test]
    fn circular_off_duplicates_shared() {
        let shared = Value::from(Record::new());
        let root = Value::from(Sequence::from_values([shared.clone(), shared]));
        let copy = deep_clone(&root, &CloneOptions::new().with_circular(false)).expect("clone");
        let items = copy.as_sequence().expect("sequence").values();
        assert!(!items[0].ptr_eq(&items[1]));
    }
}
