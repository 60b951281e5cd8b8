//! Serialized projection of the active state configuration.
//!
//! In human-readable formats a [`StateValue`] is either a plain string
//! (the id of the active leaf child) or a map from child id to nested
//! value, e.g. `"off"` or `{"A": "a1", "B": "b"}`. Compact binary formats
//! use an explicitly tagged encoding since they cannot self-describe.

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Nested value describing which states are active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateValue {
    /// The id of an active leaf.
    Leaf(String),
    /// Active children keyed by id. Empty for a leaf region of a parallel node.
    Branch(BTreeMap<String, StateValue>),
}

impl StateValue {
    pub fn leaf(id: impl Into<String>) -> Self {
        Self::Leaf(id.into())
    }

    pub fn branch<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, StateValue)>,
        K: Into<String>,
    {
        Self::Branch(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(id) => Some(id),
            Self::Branch(_) => None,
        }
    }

    /// Whether `id` appears anywhere in this value.
    ///
    /// ```rust
    /// use canopy::core::StateValue;
    ///
    /// let value = StateValue::branch([("A", StateValue::leaf("a1"))]);
    /// assert!(value.matches("A"));
    /// assert!(value.matches("a1"));
    /// assert!(!value.matches("a2"));
    /// ```
    pub fn matches(&self, id: &str) -> bool {
        match self {
            Self::Leaf(leaf) => leaf == id,
            Self::Branch(children) => children
                .iter()
                .any(|(key, child)| key == id || child.matches(id)),
        }
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

impl From<&str> for StateValue {
    fn from(id: &str) -> Self {
        Self::leaf(id)
    }
}

#[derive(Serialize, Deserialize)]
enum Tagged {
    Leaf(String),
    Branch(BTreeMap<String, StateValue>),
}

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            match self {
                Self::Leaf(id) => serializer.serialize_str(id),
                Self::Branch(children) => children.serialize(serializer),
            }
        } else {
            let tagged = match self {
                Self::Leaf(id) => Tagged::Leaf(id.clone()),
                Self::Branch(children) => Tagged::Branch(children.clone()),
            };
            tagged.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(StateValueVisitor)
        } else {
            Ok(match Tagged::deserialize(deserializer)? {
                Tagged::Leaf(id) => Self::Leaf(id),
                Tagged::Branch(children) => Self::Branch(children),
            })
        }
    }
}

struct StateValueVisitor;

impl<'de> Visitor<'de> for StateValueVisitor {
    type Value = StateValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a state id or a map of child state values")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(StateValue::Leaf(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(StateValue::Leaf(v))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut children = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, StateValue>()? {
            children.insert(key, value);
        }
        Ok(StateValue::Branch(children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parallel_value() -> StateValue {
        StateValue::branch([
            ("A", StateValue::leaf("a1")),
            ("B", StateValue::leaf("b")),
        ])
    }

    #[test]
    fn json_form_is_plain_strings_and_maps() {
        assert_eq!(serde_json::to_string(&StateValue::leaf("off")).unwrap(), r#""off""#);
        assert_eq!(
            serde_json::to_string(&parallel_value()).unwrap(),
            r#"{"A":"a1","B":"b"}"#
        );
    }

    #[test]
    fn json_form_parses_back() {
        let parsed: StateValue = serde_json::from_str(r#"{"A":"a1","B":{"b":{}}}"#).unwrap();
        let expected = StateValue::branch([
            ("A", StateValue::leaf("a1")),
            ("B", StateValue::branch([("b", StateValue::Branch(BTreeMap::new()))])),
        ]);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn binary_form_survives_bincode() {
        let bytes = bincode::serialize(&parallel_value()).unwrap();
        let decoded: StateValue = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, parallel_value());
    }

    #[test]
    fn matches_searches_keys_and_leaves() {
        let value = parallel_value();
        assert!(value.matches("B"));
        assert!(value.matches("b"));
        assert!(!value.matches("c"));
    }

    #[test]
    fn display_uses_json() {
        assert_eq!(parallel_value().to_string(), r#"{"A":"a1","B":"b"}"#);
    }
}
