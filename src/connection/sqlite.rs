//! SQLite connection backed by `rusqlite`.

use std::path::Path;

use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Map, Number, Value};

use super::{Connection, ConnectionError, Row};

/// Driver key SQLite connections report to the dialect registry.
pub const SQLITE_DRIVER: &str = "sqlite";

/// A SQLite database file (or in-memory database).
pub struct SqliteConnection {
    name: String,
    conn: rusqlite::Connection,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Open a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConnectionError> {
        let conn = rusqlite::Connection::open(path)?;
        Ok(Self::from_rusqlite(conn))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, ConnectionError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Ok(Self::from_rusqlite(conn))
    }

    /// Wrap an already opened `rusqlite` connection.
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            name: SQLITE_DRIVER.to_string(),
            conn,
        }
    }

    /// Builder: set the connection name recorded on loaded blueprints.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Run one or more statements (DDL, inserts) without returning rows.
    pub fn execute_batch(&self, sql: &str) -> Result<(), ConnectionError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver(&self) -> &str {
        SQLITE_DRIVER
    }

    fn database_name(&self) -> Option<&str> {
        Some("main")
    }

    fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>, ConnectionError> {
        let mut stmt = self.conn.prepare(sql)?;
        let labels: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let params = rusqlite::params_from_iter(bindings.iter().map(to_sql_value));
        let mut rows = stmt.query(params)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Map::with_capacity(labels.len());
            for (i, label) in labels.iter().enumerate() {
                map.insert(label.clone(), from_value_ref(row.get_ref(i)?));
            }
            out.push(Row::from(map));
        }

        Ok(out)
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
