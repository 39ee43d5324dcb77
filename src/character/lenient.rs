//! Deserializers that turn type mismatches into absent values.
//!
//! The character schema belongs to D&D Beyond and drifts between
//! characters; one odd field must not make the whole sheet unreadable.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// `Option<T>` that is `None` for null or for a value of the wrong shape.
pub fn option<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(d)?;
    Ok(serde_json::from_value(v).ok())
}

/// `Vec<T>` keeping only the elements that parse; non-arrays are empty.
pub fn vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(array_of(Value::deserialize(d)?))
}

/// Object of arrays, e.g. `modifiers: { race: [...], class: [...] }`.
pub fn map_of_vecs<'de, D, T>(d: D) -> Result<BTreeMap<String, Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Object(map) = Value::deserialize(d)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map.into_iter().map(|(k, v)| (k, array_of(v))).collect())
}

fn array_of<T: DeserializeOwned>(v: Value) -> Vec<T> {
    match v {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}
