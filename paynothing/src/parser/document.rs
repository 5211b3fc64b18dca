//! Firestore document codec.
//!
//! Firestore's REST API wraps every value in a type tag
//! (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). These helpers
//! convert between that representation and plain JSON so documents can be
//! (de)serialized with serde.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Convert a typed Firestore value into plain JSON.
pub fn decode_value(value: &Value) -> Result<Value> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::parse("Firestore value is not an object"))?;
    let (tag, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| Error::parse("Empty Firestore value"))?;

    match tag.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| Error::parse(format!("Bad booleanValue: {}", inner))),
        "stringValue" | "referenceValue" => Ok(Value::String(string_of(inner)?)),
        "integerValue" => {
            // int64 travels as a decimal string
            let n = match inner {
                Value::String(s) => s
                    .parse::<i64>()
                    .map_err(|_| Error::parse(format!("Bad integerValue: {}", s)))?,
                Value::Number(n) => n
                    .as_i64()
                    .ok_or_else(|| Error::parse(format!("Bad integerValue: {}", n)))?,
                other => return Err(Error::parse(format!("Bad integerValue: {}", other))),
            };
            Ok(Value::from(n))
        }
        "doubleValue" => Ok(inner.clone()),
        "timestampValue" => {
            let raw = string_of(inner)?;
            let ts = chrono::DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| Error::parse(format!("Bad timestampValue {}: {}", raw, e)))?;
            Ok(Value::from(ts.timestamp_millis()))
        }
        "arrayValue" => {
            let items: Vec<Value> = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values.iter().map(decode_value).collect::<Result<_>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(items))
        }
        "mapValue" => {
            let fields = inner.get("fields").and_then(Value::as_object);
            Ok(Value::Object(match fields {
                Some(fields) => decode_fields(fields)?,
                None => Map::new(),
            }))
        }
        other => Err(Error::parse(format!("Unsupported Firestore value type: {}", other))),
    }
}

fn string_of(value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::parse(format!("Expected string, got {}", value)))
}

/// Decode a document's `fields` map.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

/// Convert plain JSON into a typed Firestore value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => serde_json::json!({ "nullValue": null }),
        Value::Bool(b) => serde_json::json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => serde_json::json!({ "integerValue": i.to_string() }),
            None => serde_json::json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => serde_json::json!({ "stringValue": s }),
        Value::Array(items) => serde_json::json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => serde_json::json!({
            "mapValue": { "fields": encode_map(map) }
        }),
    }
}

fn encode_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Serialize a struct into a document body (`{"fields": {...}}`).
pub fn encode_document<T: Serialize>(value: &T) -> Result<Value> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(serde_json::json!({ "fields": encode_map(&map) })),
        other => Err(Error::parse(format!("Document must be an object, got {}", other))),
    }
}

/// The document ID: last segment of its resource name.
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Deserialize a REST document into `T`, exposing the document ID as `id`.
pub fn decode_document<T: DeserializeOwned>(document: &Value) -> Result<T> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::missing("name"))?;

    let mut fields = match document.get("fields").and_then(Value::as_object) {
        Some(fields) => decode_fields(fields)?,
        None => Map::new(),
    };
    fields.insert("id".to_owned(), Value::String(document_id(name).to_owned()));

    Ok(serde_json::from_value(Value::Object(fields))?)
}
