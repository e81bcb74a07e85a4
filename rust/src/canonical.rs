//! Canonical form of query-string payloads.
//! The remote service signs the JSON object built from `key=value` pairs with
//! keys in ascending byte order, so parsing here is lenient and the ordering
//! strict.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Parameter map iterated in ascending key order regardless of input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalParams(BTreeMap<String, String>);

impl CanonicalParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Compact JSON object with keys in map order.
    pub fn to_canonical_json(&self) -> String {
        to_canonical_json(self)
    }
}

/// Parses a `&`-separated payload into canonical parameters.
///
/// A segment that splits on `=` into exactly two parts becomes `key → value`.
/// Anything else keeps the text before the first `=` (or the whole segment)
/// as the key with an empty value. Later duplicates overwrite earlier ones.
pub fn canonicalize(raw: &str) -> CanonicalParams {
    let mut params = BTreeMap::new();
    for segment in raw.split('&') {
        let mut parts = segment.split('=');
        let key = parts.next().unwrap_or_default();
        let value = match (parts.next(), parts.next()) {
            (Some(value), None) => value,
            _ => "",
        };
        params.insert(key.to_string(), value.to_string());
    }
    CanonicalParams(params)
}

/// Serializes parameters as a compact JSON object in ascending key order.
pub fn to_canonical_json(params: &CanonicalParams) -> String {
    // Entries arrive sorted, so insertion order and key order agree.
    let object: Map<String, Value> = params
        .0
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    Value::Object(object).to_string()
}
