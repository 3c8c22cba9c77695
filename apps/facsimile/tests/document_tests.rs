//! Integration tests for the snapshot document codec.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use facsimile::document::{decode, encode, from_str, to_string};
use facsimile_core::{
    Bytes, CloneOptions, Deferred, Failure, Instant, Pattern, PropertyHolder, PropertyKey, Record,
    Sequence, Shape, Value, deep_clone, deep_equal,
};
use serde_json::json;

// =============================================================================
// DECODING
// =============================================================================

#[test]
fn test_decode_tagged_kinds() {
    let value = from_str(
        r#"{
            "when": {"$date": "2024-05-01T12:00:00.250Z"},
            "blob": {"$bytes": "AQID"},
            "re": {"$pattern": {"source": "a+", "flags": "gi", "lastIndex": 3}},
            "err": {"$failure": {"name": "TypeError", "message": "bad", "fields": {"code": 7}}},
            "later": {"$deferred": {"state": "fulfilled", "value": 5}},
            "lookup": {"$map": [["k", 1], [{"$symbol": "s"}, 2]]},
            "tags": {"$set": ["a", "b", "a"]},
            "nan": {"$float": "NaN"}
        }"#,
    )
    .unwrap();
    let record = value.as_record().unwrap();

    let when = record.get("when").unwrap();
    assert_eq!(when.as_instant().unwrap().millis(), 1_714_564_800_250);

    let blob = record.get("blob").unwrap();
    assert_eq!(blob.as_bytes().unwrap().to_vec(), vec![1, 2, 3]);

    let re = record.get("re").unwrap();
    let pattern = re.as_pattern().unwrap();
    assert_eq!(pattern.to_string(), "/a+/gi");
    assert_eq!(pattern.last_index(), 3);

    let err = record.get("err").unwrap();
    let failure = err.as_failure().unwrap();
    assert_eq!(failure.name(), "TypeError");
    assert_eq!(failure.get("code").unwrap().as_int(), Some(7));

    let later = record.get("later").unwrap();
    let settled = later.as_deferred().unwrap().settlement().unwrap();
    assert!(settled.is_fulfilled());
    assert_eq!(settled.value().as_int(), Some(5));

    assert_eq!(record.get("lookup").unwrap().as_map().unwrap().len(), 2);
    assert_eq!(record.get("tags").unwrap().as_set().unwrap().len(), 2);
    assert!(record.get("nan").unwrap().as_float().unwrap().is_nan());
}

#[test]
fn test_decode_record_annotations() {
    let value = from_str(
        r#"[
            {"$shape": "Point", "x": 1, "$hidden": {"secret": 2}, "$symbols": {"meta": 3}},
            {"$shape": "Point"}
        ]"#,
    )
    .unwrap();
    let items = value.as_sequence().unwrap().values();
    let first = items[0].as_record().unwrap();
    let second = items[1].as_record().unwrap();

    assert!(first.shape().unwrap().ptr_eq(&second.shape().unwrap()));
    let secret = first.property(&PropertyKey::from("secret")).unwrap();
    assert!(!secret.attributes.enumerable);
    assert_eq!(first.len(), 3);
    assert!(first.keys().iter().any(PropertyKey::is_symbol));
}

#[test]
fn test_decode_cycle_through_sequence() {
    let value = from_str(r#"{"$seq": [1, {"$ref": "root"}], "$id": "root"}"#).unwrap();
    let sequence = value.as_sequence().unwrap();
    assert!(sequence.get(1).unwrap().ptr_eq(&value));
}

#[test]
fn test_decode_errors() {
    for text in [
        "{",
        r#"{"$ref": 1}"#,
        r#"{"$map": [[1]]}"#,
        r#"{"$set": 1}"#,
        r#"{"$date": "yesterday"}"#,
        r#"{"$bytes": "***"}"#,
        r#"{"$pattern": {"source": "("}}"#,
        r#"{"$pattern": {"source": "a", "flags": "q"}}"#,
        r#"{"$deferred": {"state": "lost"}}"#,
        r#"{"$float": "big"}"#,
        r#"{"$map": [], "extra": 1}"#,
        r#"{"$accessor": "computed"}"#,
    ] {
        assert!(from_str(text).is_err(), "accepted {text}");
    }
}

// =============================================================================
// ENCODING
// =============================================================================

#[test]
fn test_encode_plain_structures() {
    let value = Value::from(Record::from_fields([
        ("a", Value::int(1)),
        (
            "b",
            Value::from(Sequence::from_values([Value::int(1), Value::str("two")])),
        ),
    ]));
    assert_eq!(encode(&value), json!({"a": 1, "b": [1, "two"]}));
}

#[test]
fn test_encode_self_reference() {
    let record = Record::new();
    let value = Value::from(record.clone());
    record.set("me", value.clone());

    assert_eq!(encode(&value), json!({"me": {"$ref": 0}, "$id": 0}));
}

#[test]
fn test_encode_special_kinds() {
    let instant = Instant::from_millis(0).unwrap();
    let failure = Failure::with_trace("Error", "boom", "at main");
    let value = Value::from(Sequence::from_values([
        Value::from(instant),
        Value::from(Bytes::from_vec(vec![255])),
        Value::from(Pattern::new("x", "y").unwrap()),
        Value::from(failure),
        Value::from(Deferred::pending()),
    ]));

    assert_eq!(
        encode(&value),
        json!([
            {"$date": "1970-01-01T00:00:00.000Z"},
            {"$bytes": "/w=="},
            {"$pattern": {"source": "x", "flags": "y", "lastIndex": 0}},
            {"$failure": {"name": "Error", "message": "boom", "trace": "at main"}},
            {"$deferred": {"state": "pending"}}
        ])
    );
}

#[test]
fn test_encode_shape_and_hidden() {
    let record = Record::shaped(&Shape::named("Config"));
    record.set("visible", Value::bool(true));
    record.define_property(
        PropertyKey::from("internal"),
        facsimile_core::Property::hidden(Value::int(1)),
    );
    assert_eq!(
        encode(&Value::from(record)),
        json!({"$shape": "Config", "visible": true, "$hidden": {"internal": 1}})
    );
}

// =============================================================================
// ROUND TRIPS
// =============================================================================

#[test]
fn test_round_trip_preserves_structure() {
    let text = r#"{
        "$id": 0,
        "name": "root",
        "children": {"$seq": [{"$id": 2, "parent": {"$ref": 0}}, {"$ref": 2}], "$id": 1},
        "index": {"$map": [[{"$ref": 2}, {"$set": [1, 2]}]]}
    }"#;
    let value = from_str(text).unwrap();
    let again = decode(&encode(&value)).unwrap();
    assert!(deep_equal(&value, &again));

    let children = again.as_record().unwrap().get("children").unwrap();
    let items = children.as_sequence().unwrap().values();
    assert!(items[0].ptr_eq(&items[1]));
    let parent = items[0].as_record().unwrap().get("parent").unwrap();
    assert!(parent.ptr_eq(&again));
}

#[test]
fn test_cloned_document_renders_identically() {
    let text = r#"{"a": 1, "b": [1, 2, 3], "c": {"d": 1}, "loop": {"$seq": [{"$ref": "l"}], "$id": "l"}}"#;
    let value = from_str(text).unwrap();
    let copy = deep_clone(&value, &CloneOptions::default()).unwrap();

    assert_eq!(to_string(&value, false).unwrap(), to_string(&copy, false).unwrap());
}
