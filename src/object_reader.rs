//! Object reader: read-only key/value view over aspect-supplied parameter bags
//!
//! Aspect authors hand the engine opaque bags for template arguments (`args`)
//! and tags (`tags`). Attribute named arguments are read the same way. The
//! reader normalizes all of them to one shape: an ordered map from name to a
//! JSON value, with typed accessors.

use crate::error::{Error, Result};
use crate::model::AttributeDecl;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Read-only view over a parameter bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectReader {
    entries: BTreeMap<String, Value>,
}

impl ObjectReader {
    /// The empty bag
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap an arbitrary JSON value. `null` is the empty bag; objects become
    /// entries; anything else is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::empty()),
            Value::Object(map) => Ok(Self {
                entries: map.into_iter().collect(),
            }),
            other => Err(Error::InvalidAdviceParameters(format!(
                "a parameter bag must be an object, got {}",
                other
            ))),
        }
    }

    /// Build a reader from any serializable value (a struct with named fields)
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        Self::from_value(serde_json::to_value(value)?)
    }

    /// Named arguments of an attribute
    pub fn from_attribute(attribute: &AttributeDecl) -> Self {
        Self {
            entries: attribute.arguments.clone(),
        }
    }

    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self {
            entries: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Typed read; `Ok(None)` when the key is absent or null
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.entries.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| {
                    Error::InvalidAdviceParameters(format!(
                        "cannot read '{}' from parameter bag: {}",
                        key, e
                    ))
                }),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.entries.get(key).and_then(Value::as_bool)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge two bags; entries of `other` win
    pub fn merge(&self, other: &ObjectReader) -> ObjectReader {
        let mut entries = self.entries.clone();
        for (k, v) in &other.entries {
            entries.insert(k.clone(), v.clone());
        }
        ObjectReader { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_is_empty() {
        let reader = ObjectReader::from_value(Value::Null).unwrap();
        assert!(reader.is_empty());
    }

    #[test]
    fn test_scalar_rejected() {
        let err = ObjectReader::from_value(json!(42)).unwrap_err();
        assert!(matches!(err, Error::InvalidAdviceParameters(_)));
    }

    #[test]
    fn test_typed_access() {
        #[derive(Serialize)]
        struct Args {
            retries: u32,
            name: &'static str,
        }

        let reader = ObjectReader::from_serializable(&Args {
            retries: 3,
            name: "x",
        })
        .unwrap();
        assert_eq!(reader.get_as::<u32>("retries").unwrap(), Some(3));
        assert_eq!(reader.get_str("name"), Some("x"));
        assert_eq!(reader.get_as::<u32>("missing").unwrap(), None);
        assert!(reader.get_as::<u32>("name").is_err());
    }

    #[test]
    fn test_merge_prefers_right() {
        let a = ObjectReader::from_pairs([("k", json!(1)), ("only_a", json!(true))]);
        let b = ObjectReader::from_pairs([("k", json!(2))]);
        let merged = a.merge(&b);
        assert_eq!(merged.get("k"), Some(&json!(2)));
        assert_eq!(merged.get_bool("only_a"), Some(true));
        assert_eq!(merged.len(), 2);
    }
}
