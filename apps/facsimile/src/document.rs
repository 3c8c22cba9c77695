//! # Snapshot Documents
//!
//! JSON encoding of value graphs.
//!
//! Plain JSON maps onto the value model directly: scalars are primitives,
//! arrays are sequences, objects are records. Everything else is a tagged
//! object:
//!
//! | Form | Value |
//! |------|-------|
//! | `{"$map": [[k, v], ...]}` | associative map |
//! | `{"$set": [...]}` | unique set |
//! | `{"$seq": [...]}` | sequence (used when it carries an `$id`) |
//! | `{"$date": "<rfc3339>"}` | instant |
//! | `{"$bytes": "<base64>"}` | byte buffer |
//! | `{"$pattern": {"source", "flags", "lastIndex"}}` | pattern |
//! | `{"$failure": {"name", "message", "trace", "fields"}}` | failure |
//! | `{"$symbol": "desc"}` | symbol, one per description per document |
//! | `{"$deferred": {"state", "value"}}` | deferred result |
//! | `{"$float": "NaN" \| "inf" \| "-inf"}` | non-finite float |
//! | `{"$ref": id}` | the node tagged `"$id": id` earlier in the document |
//!
//! Records may carry `"$id"`, `"$shape"` (name, one shape per name per
//! document), `"$hidden"` (non-enumerable fields) and `"$symbols"`
//! (symbol-keyed fields by description). A `$ref` may only point at a node
//! whose `$id` was already seen, which includes every enclosing node, so
//! cycles are expressible.
//!
//! The encoder tags a node with `$id` only if it is reached more than once.
//! Accessors are written as `{"$accessor": "computed" | "plain"}` without
//! invoking them; such documents are not decodable.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use facsimile_core::{
    AssocMap, Bytes, Deferred, FacsimileError, Failure, Identity, Instant, Pattern, Primitive,
    Property, PropertyHolder, PropertyKey, Record, Sequence, Settlement, Shape, Slot, Symbol,
    UniqueSet, Value,
};
use serde_json::{Map, Number, Value as Json, json};
use std::collections::{HashMap, HashSet};

/// Keys with a meaning of their own inside an object.
const TAGS: &[&str] = &[
    "$ref", "$map", "$set", "$seq", "$date", "$bytes", "$pattern", "$failure", "$symbol",
    "$deferred", "$float", "$accessor",
];

/// Record keys that annotate rather than hold fields.
const RECORD_META: &[&str] = &["$id", "$shape", "$hidden", "$symbols"];

fn invalid(reason: impl Into<String>) -> FacsimileError {
    FacsimileError::InvalidDocument(reason.into())
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Parse a document from text.
pub fn from_str(text: &str) -> Result<Value, FacsimileError> {
    let json: Json =
        serde_json::from_str(text).map_err(|e| invalid(format!("malformed JSON: {e}")))?;
    decode(&json)
}

/// Render a document as text.
pub fn to_string(value: &Value, pretty: bool) -> Result<String, FacsimileError> {
    let json = encode(value);
    let rendered = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    rendered.map_err(|e| invalid(format!("cannot render document: {e}")))
}

/// Build a value graph from a parsed document.
pub fn decode(json: &Json) -> Result<Value, FacsimileError> {
    Decoder::default().value(json)
}

/// Encode a value graph as a document.
#[must_use]
pub fn encode(value: &Value) -> Json {
    let mut encoder = Encoder::default();
    encoder.count(value);
    encoder.value(value)
}

// =============================================================================
// DECODER
// =============================================================================

#[derive(Default)]
struct Decoder {
    ids: HashMap<String, Value>,
    symbols: HashMap<String, Symbol>,
    shapes: HashMap<String, Shape>,
}

impl Decoder {
    fn value(&mut self, json: &Json) -> Result<Value, FacsimileError> {
        match json {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::bool(*b)),
            Json::Number(n) => Ok(number(n)),
            Json::String(s) => Ok(Value::str(s)),
            Json::Array(items) => {
                let sequence = Sequence::new();
                for item in items {
                    sequence.push(self.value(item)?);
                }
                Ok(Value::from(sequence))
            }
            Json::Object(object) => self.object(object),
        }
    }

    fn object(&mut self, object: &Map<String, Json>) -> Result<Value, FacsimileError> {
        let Some((tag, body)) = TAGS
            .iter()
            .find_map(|tag| object.get(*tag).map(|body| (*tag, body)))
        else {
            return self.record(object);
        };
        let id = object.get("$id");

        if let Some(extra) = object.keys().find(|k| *k != tag && *k != "$id") {
            return Err(invalid(format!("unexpected key {extra:?} beside {tag}")));
        }

        match tag {
            "$ref" => {
                if id.is_some() {
                    return Err(invalid("$ref cannot carry an $id"));
                }
                let key = id_key(body)?;
                self.ids
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| invalid(format!("$ref {key} does not refer to an earlier $id")))
            }
            "$symbol" => {
                let description = body
                    .as_str()
                    .ok_or_else(|| invalid("$symbol must be a string"))?;
                let symbol = self
                    .symbols
                    .entry(description.to_string())
                    .or_insert_with(|| Symbol::new(description))
                    .clone();
                Ok(Value::symbol(symbol))
            }
            "$float" => match body.as_str() {
                Some("NaN") => Ok(Value::float(f64::NAN)),
                Some("inf") => Ok(Value::float(f64::INFINITY)),
                Some("-inf") => Ok(Value::float(f64::NEG_INFINITY)),
                _ => Err(invalid("$float must be \"NaN\", \"inf\" or \"-inf\"")),
            },
            "$accessor" => Err(invalid("accessors cannot be decoded")),
            "$map" => {
                let map = AssocMap::new();
                self.register(id, Value::from(map.clone()))?;
                for entry in array(body, tag)? {
                    match entry.as_array().map(Vec::as_slice) {
                        Some([key, value]) => {
                            let key = self.value(key)?;
                            let value = self.value(value)?;
                            map.insert(key, value);
                        }
                        _ => return Err(invalid("$map entries must be [key, value] pairs")),
                    }
                }
                Ok(Value::from(map))
            }
            "$set" => {
                let set = UniqueSet::new();
                self.register(id, Value::from(set.clone()))?;
                for member in array(body, tag)? {
                    set.add(self.value(member)?);
                }
                Ok(Value::from(set))
            }
            "$seq" => {
                let sequence = Sequence::new();
                self.register(id, Value::from(sequence.clone()))?;
                for item in array(body, tag)? {
                    sequence.push(self.value(item)?);
                }
                Ok(Value::from(sequence))
            }
            "$date" => {
                let text = body.as_str().ok_or_else(|| invalid("$date must be a string"))?;
                let time = DateTime::parse_from_rfc3339(text)
                    .map_err(|e| invalid(format!("bad $date {text:?}: {e}")))?
                    .with_timezone(&Utc);
                let value = Value::from(Instant::at(time));
                self.register(id, value.clone())?;
                Ok(value)
            }
            "$bytes" => {
                let text = body.as_str().ok_or_else(|| invalid("$bytes must be a string"))?;
                let bytes = STANDARD
                    .decode(text)
                    .map_err(|e| invalid(format!("bad $bytes: {e}")))?;
                let value = Value::from(Bytes::from_vec(bytes));
                self.register(id, value.clone())?;
                Ok(value)
            }
            "$pattern" => {
                let source = str_field(body, "source", tag)?;
                let flags = optional_str_field(body, "flags", tag)?.unwrap_or("");
                let pattern = Pattern::new(source, flags)?;
                if let Some(index) = body.get("lastIndex") {
                    let index = index
                        .as_u64()
                        .ok_or_else(|| invalid("$pattern.lastIndex must be a non-negative integer"))?;
                    pattern.set_last_index(index as usize);
                }
                let value = Value::from(pattern);
                self.register(id, value.clone())?;
                Ok(value)
            }
            "$failure" => {
                let name = optional_str_field(body, "name", tag)?.unwrap_or("Error");
                let message = optional_str_field(body, "message", tag)?.unwrap_or("");
                let failure = match optional_str_field(body, "trace", tag)? {
                    Some(trace) => Failure::with_trace(name, message, trace),
                    None => Failure::new(name, message),
                };
                self.register(id, Value::from(failure.clone()))?;
                if let Some(fields) = body.get("fields") {
                    let fields = fields
                        .as_object()
                        .ok_or_else(|| invalid("$failure.fields must be an object"))?;
                    for (name, field) in fields {
                        let value = self.value(field)?;
                        failure.set(name, value);
                    }
                }
                Ok(Value::from(failure))
            }
            "$deferred" => {
                let deferred = Deferred::pending();
                self.register(id, Value::from(deferred.clone()))?;
                let state = optional_str_field(body, "state", tag)?.unwrap_or("pending");
                let settled = body.get("value").map(|v| self.value(v)).transpose()?;
                match (state, settled) {
                    ("pending", _) => {}
                    ("fulfilled", value) => {
                        deferred.resolve(value.unwrap_or(Value::Null));
                    }
                    ("rejected", reason) => {
                        deferred.reject(reason.unwrap_or(Value::Null));
                    }
                    (other, _) => return Err(invalid(format!("unknown $deferred state {other:?}"))),
                }
                Ok(Value::from(deferred))
            }
            other => Err(invalid(format!("unsupported tag {other}"))),
        }
    }

    fn record(&mut self, object: &Map<String, Json>) -> Result<Value, FacsimileError> {
        let shape = match object.get("$shape") {
            None => None,
            Some(Json::String(name)) => Some(
                self.shapes
                    .entry(name.clone())
                    .or_insert_with(|| Shape::named(name))
                    .clone(),
            ),
            Some(_) => return Err(invalid("$shape must be a string")),
        };
        let record = Record::with_shape(shape);
        self.register(object.get("$id"), Value::from(record.clone()))?;

        for (name, field) in object {
            if RECORD_META.contains(&name.as_str()) {
                continue;
            }
            let value = self.value(field)?;
            record.set(name, value);
        }
        if let Some(symbols) = object.get("$symbols") {
            let symbols = symbols
                .as_object()
                .ok_or_else(|| invalid("$symbols must be an object"))?;
            for (description, field) in symbols {
                let symbol = self
                    .symbols
                    .entry(description.clone())
                    .or_insert_with(|| Symbol::new(description))
                    .clone();
                let value = self.value(field)?;
                record.define_property(PropertyKey::from(symbol), Property::data(value));
            }
        }
        if let Some(hidden) = object.get("$hidden") {
            let hidden = hidden
                .as_object()
                .ok_or_else(|| invalid("$hidden must be an object"))?;
            for (name, field) in hidden {
                let value = self.value(field)?;
                record.define_property(PropertyKey::from(name.as_str()), Property::hidden(value));
            }
        }
        Ok(Value::from(record))
    }

    fn register(&mut self, id: Option<&Json>, value: Value) -> Result<(), FacsimileError> {
        let Some(id) = id else {
            return Ok(());
        };
        let key = id_key(id)?;
        if self.ids.insert(key.clone(), value).is_some() {
            return Err(invalid(format!("duplicate $id {key}")));
        }
        Ok(())
    }
}

fn number(n: &Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::int(i),
        None => Value::float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn id_key(id: &Json) -> Result<String, FacsimileError> {
    match id {
        Json::Number(n) => Ok(n.to_string()),
        Json::String(s) => Ok(s.clone()),
        _ => Err(invalid("$id and $ref must be a number or a string")),
    }
}

fn array<'a>(body: &'a Json, tag: &str) -> Result<&'a Vec<Json>, FacsimileError> {
    body.as_array()
        .ok_or_else(|| invalid(format!("{tag} must be an array")))
}

fn str_field<'a>(body: &'a Json, field: &str, tag: &str) -> Result<&'a str, FacsimileError> {
    optional_str_field(body, field, tag)?
        .ok_or_else(|| invalid(format!("{tag}.{field} is required")))
}

fn optional_str_field<'a>(
    body: &'a Json,
    field: &str,
    tag: &str,
) -> Result<Option<&'a str>, FacsimileError> {
    if !body.is_object() {
        return Err(invalid(format!("{tag} must be an object")));
    }
    match body.get(field) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(format!("{tag}.{field} must be a string"))),
    }
}

// =============================================================================
// ENCODER
// =============================================================================

#[derive(Default)]
struct Encoder {
    /// Nodes reached more than once.
    shared: HashSet<Identity>,
    /// Ids handed out so far.
    ids: HashMap<Identity, u64>,
}

impl Encoder {
    /// First pass: find nodes reached more than once.
    fn count(&mut self, root: &Value) {
        let mut seen = HashSet::new();
        let mut stack = vec![root.clone()];
        while let Some(value) = stack.pop() {
            let Some(identity) = value.identity() else {
                continue;
            };
            if !seen.insert(identity) {
                self.shared.insert(identity);
                continue;
            }
            stack.extend(children(&value));
        }
    }

    fn value(&mut self, value: &Value) -> Json {
        let identity = match value {
            Value::Null => return Json::Null,
            Value::Primitive(primitive) => return primitive_json(primitive),
            node => node.identity(),
        };
        let mut id = None;
        if let Some(identity) = identity.filter(|i| self.shared.contains(i)) {
            if let Some(existing) = self.ids.get(&identity) {
                return json!({ "$ref": existing });
            }
            let next = self.ids.len() as u64;
            self.ids.insert(identity, next);
            id = Some(next);
        }

        let mut object = Map::new();
        match value {
            Value::Sequence(sequence) => {
                let items: Vec<Json> = sequence.values().iter().map(|v| self.value(v)).collect();
                if id.is_none() {
                    return Json::Array(items);
                }
                object.insert("$seq".into(), Json::Array(items));
            }
            Value::Map(map) => {
                let entries: Vec<Json> = map
                    .entries()
                    .iter()
                    .map(|(k, v)| Json::Array(vec![self.value(k), self.value(v)]))
                    .collect();
                object.insert("$map".into(), Json::Array(entries));
            }
            Value::Set(set) => {
                let members: Vec<Json> = set.members().iter().map(|m| self.value(m)).collect();
                object.insert("$set".into(), Json::Array(members));
            }
            Value::Deferred(deferred) => {
                let body = match deferred.settlement() {
                    None => json!({ "state": "pending" }),
                    Some(Settlement::Fulfilled(v)) => {
                        json!({ "state": "fulfilled", "value": self.value(&v) })
                    }
                    Some(Settlement::Rejected(v)) => {
                        json!({ "state": "rejected", "value": self.value(&v) })
                    }
                };
                object.insert("$deferred".into(), body);
            }
            Value::Pattern(pattern) => {
                object.insert(
                    "$pattern".into(),
                    json!({
                        "source": pattern.source(),
                        "flags": pattern.flags().to_string(),
                        "lastIndex": pattern.last_index(),
                    }),
                );
            }
            Value::Instant(instant) => {
                object.insert(
                    "$date".into(),
                    Json::String(instant.time().to_rfc3339_opts(SecondsFormat::Millis, true)),
                );
            }
            Value::Bytes(bytes) => {
                object.insert("$bytes".into(), Json::String(STANDARD.encode(bytes.to_vec())));
            }
            Value::Failure(failure) => {
                let mut body = Map::new();
                body.insert("name".into(), Json::String(failure.name().to_string()));
                body.insert("message".into(), Json::String(failure.message().to_string()));
                if let Some(trace) = failure.trace() {
                    body.insert("trace".into(), Json::String(trace.to_string()));
                }
                let fields = self.fields(failure.own_properties(), |key, property| {
                    matches!(key, PropertyKey::Name(_)) && property.is_enumerable()
                });
                if !fields.is_empty() {
                    body.insert("fields".into(), Json::Object(fields));
                }
                object.insert("$failure".into(), Json::Object(body));
            }
            Value::Record(record) => self.record(record, &mut object),
            Value::Null | Value::Primitive(_) => {}
        }
        if let Some(id) = id {
            object.insert("$id".into(), Json::from(id));
        }
        Json::Object(object)
    }

    fn record(&mut self, record: &Record, object: &mut Map<String, Json>) {
        let properties = record.own_properties();
        if let Some(shape) = record.shape() {
            object.insert("$shape".into(), Json::String(shape.name().to_string()));
        }
        let visible = self.fields(properties.clone(), |key, property| {
            matches!(key, PropertyKey::Name(_)) && property.is_enumerable()
        });
        object.extend(visible);

        let symbols = self.fields(properties.clone(), |key, _| key.is_symbol());
        if !symbols.is_empty() {
            object.insert("$symbols".into(), Json::Object(symbols));
        }
        let hidden = self.fields(properties, |key, property| {
            matches!(key, PropertyKey::Name(_)) && !property.is_enumerable()
        });
        if !hidden.is_empty() {
            object.insert("$hidden".into(), Json::Object(hidden));
        }
    }

    fn fields(
        &mut self,
        properties: Vec<(PropertyKey, Property)>,
        keep: impl Fn(&PropertyKey, &Property) -> bool,
    ) -> Map<String, Json> {
        let mut fields = Map::new();
        for (key, property) in properties {
            if !keep(&key, &property) {
                continue;
            }
            let name = match &key {
                PropertyKey::Name(name) => name.to_string(),
                PropertyKey::Symbol(symbol) => symbol.description().to_string(),
            };
            let json = match &property.slot {
                Slot::Data(value) => self.value(value),
                Slot::Accessor(accessor) if accessor.is_computed() => {
                    json!({ "$accessor": "computed" })
                }
                Slot::Accessor(_) => json!({ "$accessor": "plain" }),
            };
            fields.insert(name, json);
        }
        fields
    }
}

fn primitive_json(primitive: &Primitive) -> Json {
    match primitive {
        Primitive::Bool(b) => Json::Bool(*b),
        Primitive::Int(i) => Json::from(*i),
        Primitive::Float(f) => match Number::from_f64(*f) {
            Some(n) => Json::Number(n),
            None if f.is_nan() => json!({ "$float": "NaN" }),
            None if f.is_sign_positive() => json!({ "$float": "inf" }),
            None => json!({ "$float": "-inf" }),
        },
        Primitive::Str(s) => Json::String(s.to_string()),
        Primitive::Symbol(symbol) => json!({ "$symbol": symbol.description() }),
    }
}

/// Members the encoder visits, in emission order. Accessors are skipped.
fn children(value: &Value) -> Vec<Value> {
    let data = |properties: Vec<(PropertyKey, Property)>| -> Vec<Value> {
        properties
            .into_iter()
            .filter_map(|(_, property)| match property.slot {
                Slot::Data(value) => Some(value),
                Slot::Accessor(_) => None,
            })
            .collect()
    };
    match value {
        Value::Sequence(sequence) => sequence.values(),
        Value::Map(map) => map.entries().into_iter().flat_map(|(k, v)| [k, v]).collect(),
        Value::Set(set) => set.members(),
        Value::Deferred(deferred) => deferred
            .settlement()
            .map(|outcome| vec![outcome.value().clone()])
            .unwrap_or_default(),
        Value::Failure(failure) => data(failure.own_properties()),
        Value::Record(record) => data(record.own_properties()),
        _ => Vec::new(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_maps_to_records_and_sequences() {
        let value = from_str(r#"{"a": 1, "b": [1, 2.5, "x"], "c": {"d": null}}"#).expect("decode");
        let record = value.as_record().expect("record");
        assert_eq!(record.get("a").and_then(|v| v.as_int()), Some(1));

        let b = record.get("b").expect("b");
        let items = b.as_sequence().expect("sequence").values();
        assert_eq!(items[1].as_float(), Some(2.5));
        assert_eq!(items[2].as_str(), Some("x"));
    }

    #[test]
    fn refs_resolve_to_enclosing_nodes() {
        let value = from_str(r#"{"$id": 1, "self": {"$ref": 1}}"#).expect("decode");
        let inner = value.as_record().and_then(|r| r.get("self")).expect("self");
        assert!(inner.ptr_eq(&value));
    }

    #[test]
    fn forward_refs_are_rejected() {
        let result = from_str(r#"[{"$ref": 7}, {"$id": 7}]"#);
        assert!(matches!(result, Err(FacsimileError::InvalidDocument(_))));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = from_str(r#"[{"$id": 1}, {"$id": 1}]"#);
        assert!(matches!(result, Err(FacsimileError::InvalidDocument(_))));
    }

    #[test]
    fn symbols_are_interned_per_document() {
        let value = from_str(r#"[{"$symbol": "k"}, {"$symbol": "k"}]"#).expect("decode");
        let items = value.as_sequence().expect("sequence").values();
        assert_eq!(items[0].as_symbol(), items[1].as_symbol());
    }

    #[test]
    fn shared_nodes_get_ids_once() {
        let shared = Value::from(Record::new());
        let root = Value::from(Sequence::from_values([shared.clone(), shared]));
        let json = encode(&root);
        let items = json.as_array().expect("array");
        assert_eq!(items[0], json!({"$id": 0}));
        assert_eq!(items[1], json!({"$ref": 0}));
    }

    #[test]
    fn non_finite_floats() {
        let json = encode(&Value::float(f64::NEG_INFINITY));
        assert_eq!(json, json!({"$float": "-inf"}));
        let value = decode(&json).expect("decode");
        assert_eq!(value.as_float(), Some(f64::NEG_INFINITY));
    }

    #[test]
    fn accessors_are_encoded_without_invocation() {
        let record = Record::new();
        record.define_property(
            PropertyKey::from("total"),
            Property::accessor(facsimile_core::Accessor::computed(|| Value::int(1))),
        );
        let json = encode(&Value::from(record));
        assert_eq!(json, json!({"total": {"$accessor": "computed"}}));
        assert!(decode(&json).is_err());
    }
}
