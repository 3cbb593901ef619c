//! Attribute filtering.
//!
//! An [`AttrFilter`] is a set of filter pairs (`key = value`). A product passes
//! when **every** pair is satisfied, and each pair is satisfied independently by
//! either source:
//!
//! 1. the product's own attributes, or
//! 2. its category's attributes.
//!
//! The category is a fallback per pair, not a merged view: a pair satisfied by
//! the product never looks at the category, and a product value that differs
//! does not hide a matching category value. A key absent from both sides fails
//! the pair. An empty filter passes everything.

use super::AttributeMap;

/// Which attribute map satisfied a filter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Product,
    Category,
}

/// A conjunction of exact-match filter pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrFilter {
    pairs: AttributeMap,
}

impl AttrFilter {
    pub fn new(pairs: AttributeMap) -> Self {
        Self { pairs }
    }

    pub fn pairs(&self) -> &AttributeMap {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Where a single pair is satisfied, checking the product first.
    pub fn match_source(
        key: &str,
        value: &str,
        product: &AttributeMap,
        category: &AttributeMap,
    ) -> Option<MatchSource> {
        if product.has_value(key, value) {
            Some(MatchSource::Product)
        } else if category.has_value(key, value) {
            Some(MatchSource::Category)
        } else {
            None
        }
    }

    /// Check whether a product (with its category's attributes) passes.
    pub fn matches(&self, product: &AttributeMap, category: &AttributeMap) -> bool {
        self.pairs
            .iter()
            .all(|(key, value)| Self::match_source(key, value, product, category).is_some())
    }
}

impl From<AttributeMap> for AttrFilter {
    fn from(pairs: AttributeMap) -> Self {
        Self::new(pairs)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttrFilter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
