//! Catalog entries and the catalog mapping.
//!
//! An entry is kept as an ordered field map rather than a fixed struct:
//! the downstream tool adds keys of its own, and an absent `format` must
//! stay distinguishable from an explicit `format: ~`. Equality is deep and
//! ignores field order.

use crate::config::CatalogConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Fields with a fixed position on write, in that order. Anything else
/// follows in read order.
const FIELD_ORDER: &[&str] = &[
    "format",
    "path",
    "description",
    "width",
    "height",
    "variant",
    "config",
];

/// One import definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogEntry {
    fields: IndexMap<String, Value>,
}

impl CatalogEntry {
    /// Entry for the artifact at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        let mut entry = Self::default();
        entry.set("path", Value::String(path.into()));
        entry
    }

    /// Import format; `None` is written as an explicit null.
    pub fn with_format(mut self, format: Option<&str>) -> Self {
        let value = match format {
            Some(format) => Value::String(format.to_string()),
            None => Value::Null,
        };
        self.set("format", value);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set("description", Value::String(description.into()));
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.set("width", Value::Number(width.into()));
        self.set("height", Value::Number(height.into()));
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.set("variant", Value::String(variant.into()));
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.set("config", Value::String(config.into()));
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn path(&self) -> Option<&str> {
        self.get("path").and_then(Value::as_str)
    }

    pub fn format(&self) -> Option<&str> {
        self.get("format").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.get("description").and_then(Value::as_str)
    }

    pub fn config(&self) -> Option<&str> {
        self.get("config").and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in the order they are written.
    pub fn ordered_fields(&self) -> Vec<(&str, &Value)> {
        let mut fields: Vec<(&str, &Value)> = self
            .fields
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        // Stable: unknown keys keep their read order.
        fields.sort_by_key(|(key, _)| field_rank(key));
        fields
    }

    pub(crate) fn from_fields(fields: IndexMap<String, Value>) -> Self {
        Self { fields }
    }
}

fn field_rank(key: &str) -> usize {
    FIELD_ORDER
        .iter()
        .position(|known| *known == key)
        .unwrap_or(FIELD_ORDER.len())
}

/// Mapping from import id to entry, plus the optional schema header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    /// Contents of the `__metadata__` key, kept verbatim.
    pub metadata: Option<Value>,
    entries: IndexMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace an entry. A replaced entry keeps its position.
    ///
    /// The metadata key is not an entry; inserting under it is ignored and
    /// returns `None`.
    pub fn insert(&mut self, key: impl Into<String>, entry: CatalogEntry) -> Option<CatalogEntry> {
        let key = key.into();
        if key == CatalogConfig::METADATA_KEY {
            return None;
        }
        self.entries.insert(key, entry)
    }

    /// Remove an entry, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<CatalogEntry> {
        self.entries.shift_remove(key)
    }

    /// Keep only entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &CatalogEntry) -> bool) {
        self.entries.retain(|key, entry| keep(key, entry));
    }

    /// Shallow merge: entries of `other` replace entries with the same key.
    pub fn merge(&mut self, other: Catalog) {
        for (key, entry) in other.entries {
            self.entries.insert(key, entry);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }
}

impl FromIterator<(String, CatalogEntry)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (String, CatalogEntry)>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for (key, entry) in iter {
            catalog.insert(key, entry);
        }
        catalog
    }
}
