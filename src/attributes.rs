//! The per-identity attribute multimap.
//!
//! An attribute maps a string key to an *ordered* sequence of string values.
//! Insertion order is significant and duplicates are allowed. A key with zero
//! values is indistinguishable from an absent key, and the editing operations
//! here maintain that invariant so it never leaks into storage.

use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An ordered multimap of identity attributes.
///
/// Editing always happens on a fresh copy of the stored map (the admin layer
/// clones before mutating and writes the whole map back in one call), so this
/// type itself stays a plain value with no interior mutability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Vec<String>>);

impl Attributes {
    /// Create an empty attribute map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the end of a key's value sequence, creating the key
    /// if needed. Duplicate values are allowed.
    pub fn add_last(&mut self, key: &str, value: impl Into<String>) {
        self.0.entry(key.to_string()).or_default().push(value.into());
    }

    /// Remove every occurrence of `value` under `key`, leaving the remaining
    /// values in their original relative order. Removing a missing key or a
    /// missing value is a no-op, not an error. A key left with zero values is
    /// removed entirely.
    pub fn remove_value(&mut self, key: &str, value: &str) {
        if let Some(values) = self.0.get_mut(key) {
            values.retain(|v| v != value);
            if values.is_empty() {
                self.0.remove(key);
            }
        }
    }

    /// Remove a key and all of its values. Missing key is a no-op.
    pub fn remove_key(&mut self, key: &str) {
        self.0.remove(key);
    }

    /// Grab the value sequence for a key, if present.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|values| values.as_slice())
    }

    /// Whether the key is present (with at least one value).
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over `(key, values)` entries.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Number of keys present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no keys at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_last_preserves_order_and_duplicates() {
        let mut attributes = Attributes::new();
        attributes.add_last("k", "a");
        attributes.add_last("k", "b");
        attributes.add_last("k", "a");
        assert_eq!(attributes.get("k").unwrap(), &["a", "b", "a"]);
    }

    #[test]
    fn remove_value_keeps_relative_order() {
        let mut attributes = Attributes::new();
        for value in ["a", "b", "a", "c"] {
            attributes.add_last("k", value);
        }
        attributes.remove_value("k", "a");
        assert_eq!(attributes.get("k").unwrap(), &["b", "c"]);

        // missing value and missing key are both no-ops
        attributes.remove_value("k", "zz");
        attributes.remove_value("nope", "a");
        assert_eq!(attributes.get("k").unwrap(), &["b", "c"]);
    }

    #[test]
    fn zero_values_means_absent() {
        let mut attributes = Attributes::new();
        attributes.add_last("k", "a");
        attributes.remove_value("k", "a");
        assert!(!attributes.contains_key("k"));
        assert!(attributes.is_empty());
    }

    #[test]
    fn remove_key_drops_everything_under_it() {
        let mut attributes = Attributes::new();
        attributes.add_last("k", "a");
        attributes.add_last("k", "b");
        attributes.add_last("other", "x");
        attributes.remove_key("k");
        assert!(!attributes.contains_key("k"));
        assert_eq!(attributes.get("other").unwrap(), &["x"]);
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn serde_round_trip_as_map_of_lists() {
        let mut attributes = Attributes::new();
        attributes.add_last("mail", "jonie@example.com");
        attributes.add_last("roles", "admin");
        attributes.add_last("roles", "operator");
        let json = serde_json::to_string(&attributes).unwrap();
        assert_eq!(json, r#"{"mail":["jonie@example.com"],"roles":["admin","operator"]}"#);
        let back: Attributes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attributes);
    }
}
