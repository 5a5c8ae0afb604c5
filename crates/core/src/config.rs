//! Untyped question configuration (`settings` and `validations`).
//!
//! The admin side stores these as free-form JSON objects, so nothing about
//! the shape of a value can be trusted. Every accessor downcasts and returns
//! `None` (or the caller's default) on a type mismatch instead of failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A key to value bag with safe downcasting accessors.
///
/// Deserializes from any JSON value: objects become the map, anything else
/// (null, strings, arrays) becomes an empty map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct ConfigMap(BTreeMap<String, Value>);

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw value. Mostly useful for building fixtures.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numeric value for `key`, if present and a JSON number.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Boolean value for `key`, or `default` when absent or not a boolean.
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// String list for `key`, if present and a JSON array.
    ///
    /// Non-string elements are dropped. An array of only non-strings yields
    /// `Some(vec![])`: the key was a list, it just listed nothing usable.
    pub fn string_list(&self, key: &str) -> Option<Vec<String>> {
        let items = self.0.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
        )
    }
}

impl From<Value> for ConfigMap {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ConfigMap(map.into_iter().collect()),
            _ => ConfigMap::default(),
        }
    }
}

impl From<ConfigMap> for Value {
    fn from(map: ConfigMap) -> Self {
        Value::Object(map.0.into_iter().collect())
    }
}
