//! MySQL / MariaDB introspection.
//!
//! Columns come from `SHOW FULL COLUMNS`; keys are recovered from the
//! `SHOW CREATE TABLE` text. Index names are read from the quoted text,
//! everything else with identifier quoting stripped.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::{lenient, Dialect, TableEntry};
use crate::connection::{Connection, Row};
use crate::error::{MetaError, MetaResult};
use crate::meta::blueprint::BlueprintBuilder;
use crate::meta::column::{Column, ColumnType, TypeSpec, ValueMapping};
use crate::meta::key::{Key, TableRef};

static PRIMARY_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)\s*(PRIMARY KEY)\s+\(([^)]+)\)").unwrap());

// Quoted index names may hold any character but a backtick.
static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)\s*(UNIQUE)?\s*(KEY|INDEX)\s+(?:`([^`]+)`|(\w+))\s*\(([^)]+)\)").unwrap()
});

static FOREIGN_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)FOREIGN KEY\s+\(([^)]+)\)\s+REFERENCES\s+([^(\s]+)\s*\(([^)]+)\)").unwrap()
});

const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "sys", "mysql", "performance_schema"];

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

#[derive(Debug, Deserialize)]
struct ColumnRecord {
    #[serde(rename = "Field")]
    field: String,
    #[serde(rename = "Type", default, deserialize_with = "lenient::string")]
    raw_type: Option<String>,
    #[serde(rename = "Null", default, deserialize_with = "lenient::string")]
    null: Option<String>,
    #[serde(rename = "Default", default, deserialize_with = "lenient::string")]
    default: Option<String>,
    #[serde(rename = "Extra", default, deserialize_with = "lenient::string")]
    extra: Option<String>,
    #[serde(rename = "Comment", default, deserialize_with = "lenient::string")]
    comment: Option<String>,
}

fn map_type(head: &str) -> ColumnType {
    match head {
        "datetime" | "year" | "date" | "time" | "timestamp" => ColumnType::DateTime,
        "bigint" | "int" | "integer" | "tinyint" | "smallint" | "mediumint" => ColumnType::Int,
        "float" | "decimal" | "numeric" | "dec" | "fixed" | "double" | "real" => ColumnType::Float,
        "bit" | "bool" | "boolean" => ColumnType::Bool,
        _ => ColumnType::String,
    }
}

/// Backtick-quote every dot-separated piece of a name.
fn wrap(name: &str) -> String {
    name.replace('`', "")
        .split('.')
        .map(|piece| format!("`{piece}`"))
        .collect::<Vec<_>>()
        .join(".")
}

fn columnize(list: &str) -> Vec<String> {
    list.split(',')
        .map(|c| c.trim().trim_matches('`').to_string())
        .collect()
}

impl MySql {
    fn fetch_tables(
        &self,
        schema: &str,
        table_type: &str,
        conn: &dyn Connection,
    ) -> MetaResult<Vec<String>> {
        let sql = format!(
            "SHOW FULL TABLES FROM {} WHERE Table_type=\"{}\"",
            wrap(schema),
            table_type
        );
        let label = format!("Tables_in_{schema}");

        Ok(conn
            .select(&sql, &[])?
            .iter()
            .filter_map(|row| table_name(row, &label))
            .collect())
    }

    /// Parse keys out of `CREATE TABLE` text.
    pub fn parse_create_table(&self, sql: &str, blueprint: &mut BlueprintBuilder) {
        for caps in INDEX_RE.captures_iter(sql) {
            let Some(name) = caps.get(3).or_else(|| caps.get(4)) else {
                continue;
            };
            let columns = columnize(&caps[5]);
            let key = if caps.get(1).is_some() {
                Key::unique(name.as_str(), columns)
            } else {
                Key::index(name.as_str(), columns)
            };
            blueprint.with_index(key);
        }

        let sql = sql.replace('`', "");

        if let Some(caps) = PRIMARY_KEY_RE.captures(&sql) {
            blueprint.with_primary_key(Key::primary(columnize(&caps[2])));
        }

        for caps in FOREIGN_KEY_RE.captures_iter(&sql) {
            let target = match caps[2].split_once('.') {
                Some((schema, table)) => TableRef::new(schema, table),
                None => TableRef::new(blueprint.schema(), &caps[2]),
            };
            blueprint.with_relation(Key::foreign(
                "",
                columnize(&caps[1]),
                columnize(&caps[3]),
                target,
            ));
        }
    }
}

fn table_name(row: &Row, label: &str) -> Option<String> {
    // Some servers fold the label's case differently from the schema name.
    row.str(label)
        .or_else(|| {
            row.iter()
                .find(|(k, _)| k.to_ascii_lowercase().starts_with("tables_in_"))
                .and_then(|(_, v)| v.as_str())
        })
        .map(String::from)
}

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn schemas(&self, conn: &dyn Connection) -> MetaResult<Vec<String>> {
        let rows = conn.select("SELECT schema_name FROM information_schema.schemata", &[])?;

        Ok(rows
            .iter()
            .filter_map(|row| row.str("schema_name"))
            .filter(|name| !SYSTEM_SCHEMAS.contains(name))
            .map(String::from)
            .collect())
    }

    fn tables(&self, schema: &str, conn: &dyn Connection) -> MetaResult<Vec<TableEntry>> {
        let mut entries: Vec<TableEntry> = self
            .fetch_tables(schema, "BASE TABLE", conn)?
            .into_iter()
            .map(TableEntry::table)
            .collect();
        entries.extend(
            self.fetch_tables(schema, "VIEW", conn)?
                .into_iter()
                .map(TableEntry::view),
        );
        Ok(entries)
    }

    fn normalize_column(&self, row: &Row) -> MetaResult<Column> {
        let record: ColumnRecord = row.decode("MySQL column")?;
        let raw = record.raw_type.unwrap_or_else(|| "string".to_string());
        let spec = TypeSpec::parse(&record.field, &raw)?;
        let head = spec.head();

        let mut column = Column::new(&record.field, map_type(head));

        match head {
            "enum" => column.enum_values = spec.literals(),
            "set" => {}
            _ => {
                let (size, scale) = spec.size_and_scale(&record.field, &raw)?;
                if size == Some(1) && matches!(head, "bit" | "tinyint") {
                    column.column_type = ColumnType::Bool;
                    if head == "bit" {
                        column.value_mapping = Some(ValueMapping::bit());
                    }
                } else {
                    column.size = size;
                    column.scale = scale;
                }
            }
        }

        if column.column_type == ColumnType::Int {
            column.unsigned = raw.to_ascii_lowercase().contains("unsigned");
        }

        column.autoincrement = record
            .extra
            .as_deref()
            .is_some_and(|e| e.eq_ignore_ascii_case("auto_increment"));
        column.nullable = record
            .null
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case("YES"));
        column.default = record.default;
        column.comment = record.comment.filter(|c| !c.is_empty());

        Ok(column)
    }

    fn fill_columns(
        &self,
        blueprint: &mut BlueprintBuilder,
        conn: &dyn Connection,
    ) -> MetaResult<()> {
        let sql = format!(
            "SHOW FULL COLUMNS FROM {}.{}",
            wrap(blueprint.schema()),
            wrap(blueprint.table())
        );

        for row in conn.select(&sql, &[])? {
            let column = self.normalize_column(&row)?;
            blueprint.with_column(column);
        }
        Ok(())
    }

    fn fill_constraints(
        &self,
        blueprint: &mut BlueprintBuilder,
        conn: &dyn Connection,
    ) -> MetaResult<()> {
        let sql = format!(
            "SHOW CREATE TABLE {}.{}",
            wrap(blueprint.schema()),
            wrap(blueprint.table())
        );
        let rows = conn.select(&sql, &[])?;

        let label = if blueprint.is_view() {
            "Create View"
        } else {
            "Create Table"
        };
        let Some(ddl) = rows.first().and_then(|row| row.str(label)) else {
            return Err(MetaError::invalid_record(
                "MySQL create statement",
                serde::de::Error::missing_field(label),
            ));
        };

        debug!("Parsing create statement of {}.{}", blueprint.schema(), blueprint.table());
        self.parse_create_table(ddl, blueprint);
        Ok(())
    }
}
