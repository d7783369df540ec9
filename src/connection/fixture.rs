//! Canned-response connection for exercising dialects without a server.

use std::cell::RefCell;

use serde_json::Value;

use super::{Connection, ConnectionError, Row};

#[derive(Debug, Clone)]
struct Fixture {
    needle: String,
    bindings: Option<Vec<Value>>,
    outcome: Result<Vec<Row>, String>,
}

/// A [`Connection`] that answers queries from registered fixtures.
///
/// A fixture matches when its needle occurs in the (whitespace-collapsed) SQL
/// text and, if bindings were given, the bindings are equal. The longest
/// matching needle wins. Unmatched queries return no rows.
#[derive(Debug)]
pub struct FixtureConnection {
    name: String,
    driver: String,
    database: Option<String>,
    fixtures: Vec<Fixture>,
    executed: RefCell<Vec<String>>,
}

impl FixtureConnection {
    pub fn new(driver: impl Into<String>) -> Self {
        let driver = driver.into();
        Self {
            name: driver.clone(),
            driver,
            database: None,
            fixtures: Vec::new(),
            executed: RefCell::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Answer any query containing `needle` with `rows`.
    pub fn respond(mut self, needle: &str, rows: Vec<Row>) -> Self {
        self.fixtures.push(Fixture {
            needle: collapse(needle),
            bindings: None,
            outcome: Ok(rows),
        });
        self
    }

    /// Answer queries containing `needle` and bound with exactly `bindings`.
    pub fn respond_with(mut self, needle: &str, bindings: &[&str], rows: Vec<Row>) -> Self {
        self.fixtures.push(Fixture {
            needle: collapse(needle),
            bindings: Some(bindings.iter().map(|b| Value::from(*b)).collect()),
            outcome: Ok(rows),
        });
        self
    }

    /// Fail any query containing `needle`.
    pub fn fail_on(mut self, needle: &str, message: &str) -> Self {
        self.fixtures.push(Fixture {
            needle: collapse(needle),
            bindings: None,
            outcome: Err(message.to_string()),
        });
        self
    }

    /// Statements issued so far, whitespace-collapsed.
    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }
}

/// Build rows from a JSON array of objects.
pub fn fixture_rows(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items.into_iter().map(Row::from_json).collect(),
        other => vec![Row::from_json(other)],
    }
}

fn collapse(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Connection for FixtureConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver(&self) -> &str {
        &self.driver
    }

    fn database_name(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>, ConnectionError> {
        let sql = collapse(sql);
        self.executed.borrow_mut().push(sql.clone());

        let fixture = self
            .fixtures
            .iter()
            .filter(|f| sql.contains(&f.needle))
            .filter(|f| f.bindings.as_deref().map_or(true, |b| b == bindings))
            .max_by_key(|f| f.needle.len());

        match fixture.map(|f| &f.outcome) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(message)) => Err(ConnectionError::new(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}
