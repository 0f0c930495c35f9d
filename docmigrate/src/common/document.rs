use crate::common::Value;
use crate::errors::{ErrorKind, MigrateError, MigrateResult};
use indexmap::IndexMap;
use std::fmt::{Debug, Display, Formatter};

/// An ordered set of key-value pairs sent to or read from the database.
///
/// Keys keep their insertion order. This matters for administrative commands,
/// where the first key names the command (`{"createIndexes": "users", ...}`).
///
/// Equality ignores key order.
#[derive(Clone, Default, PartialEq)]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    /// Associates `value` with `key`. An existing key keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidDocument] if `key` is empty.
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> MigrateResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(MigrateError::new(
                "document does not support empty key",
                ErrorKind::InvalidDocument,
            ));
        }
        self.data.insert(key.to_string(), value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Removes `key` while keeping the order of the remaining keys.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The first key of the document. For a command this is the command name.
    pub fn first_key(&self) -> Option<&str> {
        self.data.keys().next().map(String::as_str)
    }

    /// Returns `true` if every top-level field of `filter` is present here with
    /// an equal value. An empty filter matches every document.
    pub fn matches(&self, filter: &Document) -> bool {
        filter
            .iter()
            .all(|(key, expected)| self.get(key).is_some_and(|actual| actual == expected))
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::common::ext_json::document_to_json(self))
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Strips the quotes `stringify!` leaves around a string literal key.
#[doc(hidden)]
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] from key-value pairs.
///
/// Nested documents and arrays are written inline. Negative numbers and other
/// multi-token expressions need parentheses.
///
/// ```rust,ignore
/// let cmd = doc! {
///     "createIndexes": "users",
///     "indexes": [{ "key": { "email": 1 }, "name": "email_1", "unique": true }],
/// };
/// let desc = doc! { "locking_key": (-1) };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::common::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::common::Document::new();
            $(
                doc.put(&$crate::common::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
