//! Generated objects and generation-time overrides

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

/// Literal values that replace attribute definitions for one generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    values: BTreeMap<String, Value>,
}

impl Overrides {
    /// Create an empty set of overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add an override in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Get an override by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no overrides are set
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut overrides = Overrides::new();
        for (name, value) in iter {
            overrides.insert(name, value);
        }
        overrides
    }
}

impl IntoIterator for Overrides {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// A plain object produced by `Blueprint::generate`
///
/// Keys are exactly the blueprint's export list, in export-list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generated {
    entries: Vec<(String, Value)>,
}

impl Generated {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Add an entry; a repeated name replaces the earlier value in place
    pub(crate) fn insert(&mut self, name: String, value: Value) {
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Get a generated value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Check if a name was exported
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Exported names, in export-list order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Name and value pairs, in export-list order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of exported entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was exported
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into a table value (key order becomes sorted)
    pub fn into_value(self) -> Value {
        Value::Table(self.entries.into_iter().collect())
    }

    /// Convert into a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.into()))
                .collect(),
        )
    }
}

impl Serialize for Generated {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Generated {
        let mut generated = Generated::default();
        generated.insert("foo".into(), Value::Int(5));
        generated.insert("bar".into(), Value::Int(10));
        generated
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        assert_eq!(sample().keys().collect::<Vec<_>>(), vec!["foo", "bar"]);
    }

    #[test]
    fn test_repeated_insert_replaces() {
        let mut generated = sample();
        generated.insert("foo".into(), Value::Int(7));
        assert_eq!(generated.len(), 2);
        assert_eq!(generated.get("foo"), Some(&Value::Int(7)));
    }

    #[test]
    fn test_serializes_as_object() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(json, r#"{"foo":5,"bar":10}"#);
        assert_eq!(sample().to_json(), serde_json::json!({"foo": 5, "bar": 10}));
    }

    #[test]
    fn test_into_value_builds_table() {
        let table = sample().into_value();
        let entries = table.as_table().expect("table");
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["bar", "foo"]);
        assert_eq!(entries.get("bar"), Some(&Value::Int(10)));
        assert_eq!(Generated::default().into_value(), Value::Table(BTreeMap::new()));
    }

    #[test]
    fn test_overrides_from_iter() {
        let overrides: Overrides = [("foo", 5), ("bar", 6)].into_iter().collect();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("foo"), Some(&Value::Int(5)));
        assert_eq!(Overrides::new().set("x", "y").get("x"), Some(&Value::Str("y".into())));
    }
}
