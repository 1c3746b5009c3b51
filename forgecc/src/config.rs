//! Configuration values (spec §3 "Config value" / §6 "config reader"). The
//! core never builds or owns the loader — the spec treats it as an
//! external collaborator — but its own testable properties (§8 scenario 5)
//! require a concrete dotted-path get/set over a JSON-shaped variant, so
//! this module ships one, built directly on `serde_json::Value` the way
//! other crates in the pack use that type as their config representation.

use crate::error::{Error, Result};
use serde_json::Value as Json;

/// A recursive variant over `{none, bool, i64, f64, string, array, object}`
/// addressed by dot-separated paths (spec §3). This is a thin, owned
/// wrapper around [`serde_json::Value`] rather than a hand-rolled enum,
/// since `serde_json::Value` already models exactly this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Value(Json);

impl Value {
    pub fn none() -> Self {
        Value(Json::Null)
    }

    pub fn bool(b: bool) -> Self {
        Value(Json::Bool(b))
    }

    pub fn i64(v: i64) -> Self {
        Value(Json::Number(v.into()))
    }

    pub fn f64(v: f64) -> Self {
        serde_json::Number::from_f64(v).map(Json::Number).map(Value).unwrap_or_else(Value::none)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value(Json::String(s.into()))
    }

    /// Parse a JSON document into a config value (spec §8 scenario 5).
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map(Value).map_err(|e| Error::bad_encoding(format!("invalid config JSON: {e}")))
    }

    pub fn to_string_pretty(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "null".to_string())
    }

    pub fn is_none(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.0.as_bool()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.0.as_i64()
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// Read the value at a dot-separated path, or `None` if any segment is
    /// missing or the path walks through a non-object (spec §8 scenario 5:
    /// `get("a.b.c.d")` on `{"a":{"b":{"c":42}}}` returns nothing).
    pub fn get(&self, path: &str) -> Option<Value> {
        let mut cursor = &self.0;
        for segment in split_path(path) {
            cursor = cursor.as_object()?.get(segment)?;
        }
        Some(Value(cursor.clone()))
    }

    /// Write a value at a dot-separated path, creating intermediate objects
    /// as needed. Fails with `BadArgument` if an existing non-object sits
    /// where a path segment needs to descend further.
    pub fn set(&mut self, path: &str, value: Value) -> Result<()> {
        let segments: Vec<&str> = split_path(path).collect();
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => {
                self.0 = value.0;
                return Ok(());
            }
        };

        if !self.0.is_object() {
            self.0 = Json::Object(serde_json::Map::new());
        }
        let mut cursor = &mut self.0;
        for segment in parents {
            let map = cursor.as_object_mut().ok_or_else(|| Error::bad_argument(format!("'{path}' descends through a non-object")))?;
            let entry = map.entry(*segment).or_insert_with(|| Json::Object(serde_json::Map::new()));
            if !entry.is_object() {
                return Err(Error::bad_argument(format!("'{path}' descends through a non-object at '{segment}'")));
            }
            cursor = entry;
        }
        let map = cursor.as_object_mut().ok_or_else(|| Error::bad_argument(format!("'{path}' descends through a non-object")))?;
        map.insert((*last).to_string(), value.0);
        Ok(())
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_path_scenario() {
        // spec §8 scenario 5.
        let mut cfg = Value::parse(r#"{"a":{"b":{"c":42}}}"#).unwrap();

        assert_eq!(cfg.get("a.b.c").unwrap().as_i64(), Some(42));

        let sub = cfg.get("a.b").unwrap();
        assert_eq!(sub.0.as_object().map(|m| m.len()), Some(1));
        assert!(sub.0.as_object().unwrap().contains_key("c"));

        assert!(cfg.get("a.b.c.d").is_none());

        cfg.set("a.b.c", Value::i64(7)).unwrap();
        assert_eq!(cfg.get("a.b.c").unwrap().as_i64(), Some(7));
        assert_eq!(cfg.0.as_object().map(|m| m.len()), Some(1));
    }

    #[test]
    fn set_creates_missing_intermediate_objects() {
        let mut cfg = Value::none();
        cfg.set("x.y.z", Value::bool(true)).unwrap();
        assert_eq!(cfg.get("x.y.z").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn set_through_non_object_fails() {
        let mut cfg = Value::parse(r#"{"a": 1}"#).unwrap();
        assert!(cfg.set("a.b", Value::i64(2)).is_err());
    }
}
