//! Database driver boundary.
//!
//! The metadata layer never talks to a database directly. Every dialect issues
//! its catalog queries through the [`Connection`] trait and receives generic
//! [`Row`]s back, which it then decodes into dialect-specific record structs.
//!
//! ```text
//! ┌──────────────────────┐     select(sql, bindings)     ┌──────────────────┐
//! │  meta::dialect::*    │ ────────────────────────────▶ │  dyn Connection  │
//! │  (MySql / Postgres / │ ◀──────────────────────────── │  (sqlite, mysql, │
//! │   Sqlite)            │          Vec<Row>             │   fixtures, ...) │
//! └──────────────────────┘                               └──────────────────┘
//! ```

mod fixture;
mod sqlite;

pub use fixture::{fixture_rows, FixtureConnection};
pub use sqlite::SqliteConnection;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MetaError, MetaResult};

/// Error raised by a driver call.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ConnectionError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<rusqlite::Error> for ConnectionError {
    fn from(err: rusqlite::Error) -> Self {
        Self::with_source(format!("SQLite error: {err}"), err)
    }
}

/// A database connection able to answer catalog queries.
///
/// Calls may block; no timeout policy is imposed on top of the driver's own.
pub trait Connection {
    /// Name of the connection (as configured by the host application).
    fn name(&self) -> &str;

    /// Driver type key, used to pick a dialect from the registry.
    fn driver(&self) -> &str;

    /// Name of the database the connection is bound to, if any.
    fn database_name(&self) -> Option<&str> {
        None
    }

    /// Run a read-only statement and return every row.
    fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>, ConnectionError>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn driver(&self) -> &str {
        (**self).driver()
    }

    fn database_name(&self) -> Option<&str> {
        (**self).database_name()
    }

    fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>, ConnectionError> {
        (**self).select(sql, bindings)
    }
}

/// One result row, keyed by column label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from a JSON object. Non-object values yield an empty row.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a column label ignoring ASCII case.
    ///
    /// Catalog views report labels in upper case on some servers and lower case
    /// on others.
    pub fn get_ignore_case(&self, key: &str) -> Option<&Value> {
        self.0.get(key).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// String value of a column, `None` for NULL or non-string values.
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get_ignore_case(key).and_then(Value::as_str)
    }

    /// Integer value of a column, accepting numeric strings.
    pub fn i64(&self, key: &str) -> Option<i64> {
        match self.get_ignore_case(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the row into a record struct.
    pub fn decode<T: DeserializeOwned>(&self, context: &str) -> MetaResult<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| MetaError::invalid_record(context, e))
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
