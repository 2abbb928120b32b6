//! Shared value objects used across multiple bounded contexts

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw fields of a carrier webhook delivery.
///
/// Carrier callbacks are forwarded to the system of record verbatim, so the
/// handlers keep the original key/value pairs around instead of a typed
/// projection. Typed accessors treat empty values as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackFields(BTreeMap<String, String>);

impl CallbackFields {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Get a non-empty field value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// Get a field value as an owned string, or an empty string when absent
    pub fn get_or_default(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Copy of these fields with one extra correlation key attached
    pub fn with(&self, key: &str, value: Option<&str>) -> Self {
        let mut fields = self.clone();
        fields.insert(key, value.unwrap_or_default());
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl From<BTreeMap<String, String>> for CallbackFields {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
