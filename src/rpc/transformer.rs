//! Structure-preserving wire envelope.
//!
//! Plain JSON loses value types such as timestamps. Every input and output
//! travels as `{ "json": <value>, "meta": { "values": { "<path>": ["Date"] } } }`
//! where `meta.values` names the dotted paths whose JSON form stands in for a
//! richer type. Dates are ISO-8601 strings inside `json`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::RpcError;

/// Dotted path -> type annotation, e.g. `"0.createdAt" -> "Date"`
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TypeMeta {
    values: BTreeMap<String, String>,
}

impl TypeMeta {
    pub fn insert(&mut self, path: impl Into<String>, kind: &str) {
        self.values.insert(path.into(), kind.to_string());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.values.get(path).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn to_json(&self) -> Value {
        let values: Map<String, Value> = self
            .values
            .iter()
            .map(|(path, kind)| (path.clone(), json!([kind])))
            .collect();
        json!({ "values": values })
    }
}

/// Types that know which parts of their JSON form carry a richer type
pub trait Rich {
    fn annotate(&self, _path: &str, _meta: &mut TypeMeta) {}
}

pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

macro_rules! plain {
    ($($ty:ty),* $(,)?) => {
        $(impl Rich for $ty {})*
    };
}

plain!((), bool, i32, i64, u32, u64, f64, String, Uuid, Value);

impl Rich for DateTime<Utc> {
    fn annotate(&self, path: &str, meta: &mut TypeMeta) {
        meta.insert(path, "Date");
    }
}

impl<T: Rich> Rich for Option<T> {
    fn annotate(&self, path: &str, meta: &mut TypeMeta) {
        if let Some(inner) = self {
            inner.annotate(path, meta);
        }
    }
}

impl<T: Rich> Rich for Vec<T> {
    fn annotate(&self, path: &str, meta: &mut TypeMeta) {
        for (index, item) in self.iter().enumerate() {
            item.annotate(&child_path(path, &index.to_string()), meta);
        }
    }
}

/// An encoded procedure result
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub json: Value,
    pub meta: TypeMeta,
}

impl Encoded {
    pub fn to_json(&self) -> Value {
        if self.meta.is_empty() {
            json!({ "json": self.json })
        } else {
            json!({ "json": self.json, "meta": self.meta.to_json() })
        }
    }
}

pub fn encode<T: Serialize + Rich>(value: &T) -> Result<Encoded, RpcError> {
    let json = serde_json::to_value(value)?;
    let mut meta = TypeMeta::default();
    value.annotate("", &mut meta);
    Ok(Encoded { json, meta })
}

/// Unwrap an inbound envelope into plain JSON ready for typed decoding.
///
/// A value that is not an envelope (an object with keys other than `json` and
/// `meta`) passes through untouched.
pub fn decode(raw: Value) -> Result<Value, RpcError> {
    let Value::Object(mut envelope) = raw else {
        return Ok(raw);
    };
    let is_envelope = envelope.contains_key("json")
        && envelope.keys().all(|key| key == "json" || key == "meta");
    if !is_envelope {
        return Ok(Value::Object(envelope));
    }

    let mut value = envelope.remove("json").unwrap_or(Value::Null);
    let Some(Value::Object(meta)) = envelope.remove("meta") else {
        return Ok(value);
    };
    let Some(Value::Object(values)) = meta.get("values") else {
        return Ok(value);
    };

    for (path, kind) in values {
        let kind = match kind {
            Value::String(kind) => kind.as_str(),
            Value::Array(parts) => parts.first().and_then(Value::as_str).unwrap_or_default(),
            _ => return Err(RpcError::bad_input(format!("Invalid type annotation at '{}'", path))),
        };
        apply_annotation(&mut value, path, kind)?;
    }

    Ok(value)
}

fn apply_annotation(root: &mut Value, path: &str, kind: &str) -> Result<(), RpcError> {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut cursor = root;
    for segment in parents {
        cursor = match cursor {
            Value::Object(map) => map.get_mut(*segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| RpcError::bad_input(format!("Type annotation path '{}' does not exist", path)))?;
    }

    match kind {
        "undefined" => {
            if let Value::Object(map) = cursor {
                map.remove(*last);
            }
        }
        "bigint" => {
            if let Some(slot) = cursor.get_mut(*last) {
                if let Some(text) = slot.as_str() {
                    let number: i64 = text
                        .parse()
                        .map_err(|_| RpcError::bad_input(format!("Invalid bigint at '{}'", path)))?;
                    *slot = json!(number);
                }
            }
        }
        // Dates stay ISO strings; chrono decodes them directly
        _ => {}
    }

    Ok(())
}
