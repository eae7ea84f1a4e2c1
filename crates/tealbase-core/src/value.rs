use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::ops::{Deref, DerefMut};

/// A dynamic row: column name to JSON value, in insertion order.
///
/// Used for rows sent to and returned from the query endpoint when no typed
/// struct is involved.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Row(pub Map<String, JsonValue>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Set a column value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get a column value.
    pub fn get_value(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Get a typed value from a column, returning None if missing or wrong type.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Get column names.
    pub fn columns(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }

    /// Try to build a row from an arbitrary JSON value; only objects qualify.
    pub fn from_json(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}

impl Deref for Row {
    type Target = Map<String, JsonValue>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Row {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Macro for constructing a `Row` with key-value pairs.
///
/// # Examples
/// ```
/// use tealbase_core::row;
/// let row = row![("message", "hello"), ("channel_id", 1)];
/// assert_eq!(row.len(), 2);
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::Row::new()
    };
    ($(($key:expr, $val:expr)),+ $(,)?) => {{
        let mut row = $crate::Row::new();
        $(
            row.set($key, $crate::serde_json::json!($val));
        )+
        row
    }};
}
