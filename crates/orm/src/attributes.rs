//! Attribute bags - the normalized form of every record
//!
//! An [`AttributeBag`] maps column names to values. Keys compare
//! case-insensitively and iteration follows insertion order, which is the
//! order positional parameters are bound in generated statements.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::backends::{DatabaseRow, DatabaseValue};
use crate::error::{ModelError, OrmResult};

/// Ordered, case-insensitive column → value mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeBag {
    // folded key -> (name as first inserted, value)
    entries: IndexMap<String, (String, DatabaseValue)>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. A replaced entry keeps its original
    /// position and spelling.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<DatabaseValue>) -> Option<DatabaseValue> {
        let name = name.into();
        let value = value.into();
        match self.entries.get_mut(&fold(&name)) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.insert(fold(&name), (name, value));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseValue> {
        self.entries.get(&fold(name)).map(|(_, value)| value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(&fold(name))
    }

    /// Remove an entry, preserving the order of the remaining ones
    pub fn remove(&mut self, name: &str) -> Option<DatabaseValue> {
        self.entries.shift_remove(&fold(name)).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.entries.values().map(|(name, value)| (name.as_str(), value))
    }

    /// Column names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(name, _)| name.as_str())
    }

    /// Non-null value of the key field, if present
    pub fn primary_key(&self, key_field: &str) -> Option<&DatabaseValue> {
        self.get(key_field).filter(|value| !value.is_null())
    }

    /// Materialize a result row, keeping the result column order
    pub fn from_row(row: &dyn DatabaseRow) -> OrmResult<Self> {
        let mut bag = Self::new();
        for (index, name) in row.column_names().into_iter().enumerate() {
            let value = row.get_by_index(index)?;
            bag.insert(name, value);
        }
        Ok(bag)
    }

    /// Normalize any serializable struct or map into a bag
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> OrmResult<Self> {
        serde_json::to_value(value)?.into_attribute_bag()
    }

    pub fn to_json(&self) -> JsonValue {
        let map = self
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        JsonValue::Object(map)
    }
}

fn fold(name: &str) -> String {
    name.to_lowercase()
}

impl<K, V> FromIterator<(K, V)> for AttributeBag
where
    K: Into<String>,
    V: Into<DatabaseValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = AttributeBag::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}

impl IntoIterator for AttributeBag {
    type Item = (String, DatabaseValue);
    type IntoIter = indexmap::map::IntoValues<String, (String, DatabaseValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

/// Form-style name/value collection (e.g. a decoded POST body).
/// Repeated names are joined with commas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Decode an `application/x-www-form-urlencoded` body
    pub fn parse(body: &str) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(body.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Conversion of heterogeneous inputs into a normalized [`AttributeBag`]
pub trait IntoAttributeBag {
    fn into_attribute_bag(self) -> OrmResult<AttributeBag>;
}

impl IntoAttributeBag for AttributeBag {
    fn into_attribute_bag(self) -> OrmResult<AttributeBag> {
        Ok(self)
    }
}

impl IntoAttributeBag for &AttributeBag {
    fn into_attribute_bag(self) -> OrmResult<AttributeBag> {
        Ok(self.clone())
    }
}

impl IntoAttributeBag for serde_json::Map<String, JsonValue> {
    fn into_attribute_bag(self) -> OrmResult<AttributeBag> {
        Ok(self
            .into_iter()
            .map(|(name, value)| (name, DatabaseValue::from_json(value)))
            .collect())
    }
}

impl IntoAttributeBag for JsonValue {
    fn into_attribute_bag(self) -> OrmResult<AttributeBag> {
        match self {
            JsonValue::Object(map) => map.into_attribute_bag(),
            other => Err(ModelError::Serialization(format!(
                "Expected an object to normalize into a record, found {}",
                json_kind(&other)
            ))),
        }
    }
}

impl IntoAttributeBag for FormData {
    fn into_attribute_bag(self) -> OrmResult<AttributeBag> {
        let mut bag = AttributeBag::new();
        for (name, value) in self.pairs {
            let joined = match bag.get(&name).and_then(|existing| existing.as_str()) {
                Some(existing) => format!("{},{}", existing, value),
                None => value,
            };
            bag.insert(name, joined);
        }
        Ok(bag)
    }
}

impl<K: Into<String>> IntoAttributeBag for Vec<(K, DatabaseValue)> {
    fn into_attribute_bag(self) -> OrmResult<AttributeBag> {
        Ok(self.into_iter().collect())
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
