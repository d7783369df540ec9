//! Per-dialect introspection.
//!
//! Each dialect knows how to enumerate schemas and tables on a connection,
//! normalize one raw column record, and recover a table's constraints from
//! whatever its database exposes:
//!
//! | Dialect    | Columns                   | Constraints                       |
//! |------------|---------------------------|-----------------------------------|
//! | `MySql`    | `SHOW FULL COLUMNS`       | `SHOW CREATE TABLE` text          |
//! | `Postgres` | `information_schema`      | catalog views                     |
//! | `Sqlite`   | `PRAGMA table_info`       | `PRAGMA index_list` / `foreign_key_list` |

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

use serde_json::Value;

use super::blueprint::BlueprintBuilder;
use super::column::Column;
use crate::connection::{Connection, Row};
use crate::error::MetaResult;

/// A table or view discovered in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub name: String,
    pub is_view: bool,
}

impl TableEntry {
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_view: false,
        }
    }

    pub fn view(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_view: true,
        }
    }
}

/// Introspection capability set of one database dialect.
pub trait Dialect: Send + Sync {
    /// Short dialect name, used in logs.
    fn name(&self) -> &'static str;

    /// Every non-system schema visible on the connection.
    fn schemas(&self, conn: &dyn Connection) -> MetaResult<Vec<String>>;

    /// Base tables of `schema` followed by its views.
    fn tables(&self, schema: &str, conn: &dyn Connection) -> MetaResult<Vec<TableEntry>>;

    /// Turn one raw column record into a canonical column.
    fn normalize_column(&self, row: &Row) -> MetaResult<Column>;

    /// Load and normalize the columns of the table being built.
    fn fill_columns(&self, blueprint: &mut BlueprintBuilder, conn: &dyn Connection)
        -> MetaResult<()>;

    /// Load primary key, indexes and foreign keys of the table being built.
    fn fill_constraints(
        &self,
        blueprint: &mut BlueprintBuilder,
        conn: &dyn Connection,
    ) -> MetaResult<()>;
}

/// Render a scalar driver value as text. NULL stays `None`.
pub(crate) fn value_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Deserialize helper for catalog fields that may arrive as text or number.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(super::value_text(value.as_ref()))
    }

    pub fn u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Option::<Value>::deserialize(d)?;
        Ok(match value {
            Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
            Some(Value::Bool(b)) => i64::from(b),
            _ => 0,
        })
    }
}
