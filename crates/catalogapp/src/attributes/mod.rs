//! # Attribute Store
//!
//! Categories and products both carry an [`AttributeMap`]: a schema-less set of
//! string facts (`color = black`, `ram = 8GB`). The map has no nesting and no
//! typed values; every entry is an independent fact.
//!
//! The two maps play different roles:
//!
//! | Owner | Role |
//! |-------|------|
//! | Category | Defines the *vocabulary*: keys a product in it may use |
//! | Product | Holds the product's own values for those keys |
//!
//! Vocabulary membership is checked at the service boundary with
//! [`AttributeMap::keys_missing_from`]. Filtering is done by [`AttrFilter`],
//! which consults the product first and its category second.
//!
//! ## Storage
//!
//! Persisted rows keep the map as JSON text in a single column. Use
//! [`AttributeMap::to_column`] / [`AttributeMap::from_column`] at the row
//! boundary; everything above the store works with the decoded map.
//!
//! ## Ordering
//!
//! The map is backed by a `BTreeMap`, so iteration, serialization and
//! difference results come out in key order regardless of insertion order.

mod filter;

pub use filter::{AttrFilter, MatchSource};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::{BTreeMap, HashMap};

/// Ordered string to string mapping attached to categories and products.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<String, String>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
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

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True when `key` is present and its value equals `value` exactly.
    /// A missing key never matches.
    pub fn has_value(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    /// Keys of `self` that `vocabulary` does not define, in key order.
    pub fn keys_missing_from(&self, vocabulary: &AttributeMap) -> Vec<String> {
        self.0
            .keys()
            .filter(|key| !vocabulary.contains_key(key))
            .cloned()
            .collect()
    }

    /// Encode for the single text column used by the row store.
    pub fn to_column(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Decode a text column. A blank column is an empty map.
    pub fn from_column(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        Ok(Self(serde_json::from_str(text)?))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for AttributeMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl From<HashMap<String, String>> for AttributeMap {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
