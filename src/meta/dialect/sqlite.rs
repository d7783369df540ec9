//! SQLite introspection through `sqlite_master` and the structural pragmas.

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::warn;

use super::{lenient, Dialect, TableEntry};
use crate::connection::{Connection, Row};
use crate::error::MetaResult;
use crate::meta::blueprint::BlueprintBuilder;
use crate::meta::column::{Column, ColumnType, TypeSpec};
use crate::meta::key::{Key, TableRef};

/// SQLite dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

#[derive(Debug, Deserialize)]
struct TableInfoRecord {
    name: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    raw_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::i64")]
    notnull: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    dflt_value: Option<String>,
    #[serde(default, deserialize_with = "lenient::i64")]
    pk: i64,
}

#[derive(Debug, Deserialize)]
struct IndexListRecord {
    name: String,
    #[serde(default, deserialize_with = "lenient::i64")]
    unique: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    origin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexInfoRecord {
    #[serde(default, deserialize_with = "lenient::i64")]
    seqno: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForeignKeyRecord {
    #[serde(default, deserialize_with = "lenient::i64")]
    id: i64,
    #[serde(default, deserialize_with = "lenient::i64")]
    seq: i64,
    table: String,
    from: String,
    #[serde(default, deserialize_with = "lenient::string")]
    to: Option<String>,
}

/// Double-quote an identifier.
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// SQLite resolves a foreign key's parent table case-insensitively, so the
/// declared spelling may differ from the stored name.
fn canonical_name(known: &[String], declared: &str) -> String {
    known
        .iter()
        .find(|name| name.eq_ignore_ascii_case(declared))
        .map_or_else(|| declared.to_string(), String::clone)
}

/// `'it''s'` becomes `it's`. Expressions such as `CURRENT_TIMESTAMP` are kept.
fn unquote_default(default: &str) -> String {
    match default
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(inner) => inner.replace("''", "'"),
        None => default.to_string(),
    }
}

/// Canonical type by SQLite's affinity rules, with booleans and date/time
/// names singled out.
fn map_type(spec: &TypeSpec) -> ColumnType {
    let base = spec.base.as_str();
    let width_one = spec.args.len() == 1 && spec.args[0] == "1";

    if base == "bool" || base == "boolean" {
        ColumnType::Bool
    } else if width_one && matches!(base, "bit" | "tinyint") {
        ColumnType::Bool
    } else if base.contains("date") || base.contains("time") {
        ColumnType::DateTime
    } else if base.contains("int") {
        ColumnType::Int
    } else if base.contains("char") || base.contains("clob") || base.contains("text") {
        ColumnType::String
    } else if ["real", "floa", "doub", "numeric", "decimal"]
        .iter()
        .any(|t| base.contains(t))
    {
        ColumnType::Float
    } else {
        ColumnType::String
    }
}

impl Sqlite {
    fn table_info(
        &self,
        schema: &str,
        table: &str,
        conn: &dyn Connection,
    ) -> MetaResult<Vec<TableInfoRecord>> {
        let sql = format!("PRAGMA {}.table_info({})", quote(schema), quote(table));
        conn.select(&sql, &[])?
            .iter()
            .map(|row| row.decode("SQLite table_info"))
            .collect()
    }

    fn primary_key_columns(
        &self,
        schema: &str,
        table: &str,
        conn: &dyn Connection,
    ) -> MetaResult<Vec<String>> {
        let mut keyed: Vec<(i64, String)> = self
            .table_info(schema, table, conn)?
            .into_iter()
            .filter(|c| c.pk > 0)
            .map(|c| (c.pk, c.name))
            .collect();
        keyed.sort_by_key(|(ordinal, _)| *ordinal);
        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }

    fn fetch_names(&self, schema: &str, kind: &str, conn: &dyn Connection) -> MetaResult<Vec<String>> {
        let sql = format!(
            "SELECT name FROM {}.sqlite_master \
             WHERE type = '{kind}' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            quote(schema)
        );
        Ok(conn
            .select(&sql, &[])?
            .iter()
            .filter_map(|row| row.str("name").map(String::from))
            .collect())
    }

    fn fill_indexes(&self, blueprint: &mut BlueprintBuilder, conn: &dyn Connection) -> MetaResult<()> {
        let schema = quote(blueprint.schema());
        let sql = format!("PRAGMA {schema}.index_list({})", quote(blueprint.table()));

        for row in conn.select(&sql, &[])? {
            let index: IndexListRecord = row.decode("SQLite index_list")?;
            if index.origin.as_deref() == Some("pk") {
                continue;
            }

            let sql = format!("PRAGMA {schema}.index_info({})", quote(&index.name));
            let mut parts: Vec<IndexInfoRecord> = conn
                .select(&sql, &[])?
                .iter()
                .map(|row| row.decode("SQLite index_info"))
                .collect::<MetaResult<_>>()?;
            parts.sort_by_key(|p| p.seqno);

            // Expression indexes have no column names.
            let Some(columns) = parts.into_iter().map(|p| p.name).collect::<Option<Vec<_>>>() else {
                continue;
            };

            let key = if index.unique != 0 {
                Key::unique(index.name, columns)
            } else {
                Key::index(index.name, columns)
            };
            blueprint.with_index(key);
        }
        Ok(())
    }

    fn fill_relations(&self, blueprint: &mut BlueprintBuilder, conn: &dyn Connection) -> MetaResult<()> {
        let sql = format!(
            "PRAGMA {}.foreign_key_list({})",
            quote(blueprint.schema()),
            quote(blueprint.table())
        );

        let mut grouped: IndexMap<i64, Vec<ForeignKeyRecord>> = IndexMap::new();
        for row in conn.select(&sql, &[])? {
            let record: ForeignKeyRecord = row.decode("SQLite foreign_key_list")?;
            grouped.entry(record.id).or_default().push(record);
        }
        grouped.sort_keys();
        if grouped.is_empty() {
            return Ok(());
        }

        let known = self.fetch_names(blueprint.schema(), "table", conn)?;
        for (_, mut records) in grouped {
            records.sort_by_key(|r| r.seq);
            let Some(declared) = records.first().map(|r| r.table.as_str()) else {
                continue;
            };
            let table = canonical_name(&known, declared);

            // A foreign key declared without columns targets the primary key.
            let references: Vec<String> = if records.iter().all(|r| r.to.is_some()) {
                records.iter().filter_map(|r| r.to.clone()).collect()
            } else {
                self.primary_key_columns(blueprint.schema(), &table, conn)?
            };
            let columns: Vec<String> = records.into_iter().map(|r| r.from).collect();

            if references.len() != columns.len() {
                warn!(
                    "Skipping foreign key ({}) on {}.{}: {} has no matching key",
                    columns.join(", "),
                    blueprint.schema(),
                    blueprint.table(),
                    table
                );
                continue;
            }

            let target = TableRef::new(blueprint.schema(), table);
            blueprint.with_relation(Key::foreign("", columns, references, target));
        }
        Ok(())
    }
}

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn schemas(&self, conn: &dyn Connection) -> MetaResult<Vec<String>> {
        let name = conn
            .database_name()
            .filter(|n| !n.is_empty())
            .unwrap_or("main");
        Ok(vec![name.to_string()])
    }

    fn tables(&self, schema: &str, conn: &dyn Connection) -> MetaResult<Vec<TableEntry>> {
        let mut entries: Vec<TableEntry> = self
            .fetch_names(schema, "table", conn)?
            .into_iter()
            .map(TableEntry::table)
            .collect();
        entries.extend(
            self.fetch_names(schema, "view", conn)?
                .into_iter()
                .map(TableEntry::view),
        );
        Ok(entries)
    }

    fn normalize_column(&self, row: &Row) -> MetaResult<Column> {
        let record: TableInfoRecord = row.decode("SQLite column")?;
        let raw = record.raw_type.unwrap_or_default();

        let mut column = if raw.trim().is_empty() {
            Column::new(&record.name, ColumnType::String)
        } else {
            let spec = TypeSpec::parse(&record.name, &raw)?;
            let mut column = Column::new(&record.name, map_type(&spec));
            if column.column_type != ColumnType::Bool {
                let (size, scale) = spec.size_and_scale(&record.name, &raw)?;
                column.size = size;
                column.scale = scale;
            }
            column
        };

        column.autoincrement = record.pk > 0 && raw.to_ascii_lowercase().contains("int");
        column.nullable = record.notnull == 0;
        column.default = record.dflt_value.as_deref().map(unquote_default);

        Ok(column)
    }

    fn fill_columns(
        &self,
        blueprint: &mut BlueprintBuilder,
        conn: &dyn Connection,
    ) -> MetaResult<()> {
        let sql = format!(
            "PRAGMA {}.table_info({})",
            quote(blueprint.schema()),
            quote(blueprint.table())
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
        let primary = self.primary_key_columns(blueprint.schema(), blueprint.table(), conn)?;
        if !primary.is_empty() {
            blueprint.with_primary_key(Key::primary(primary));
        }

        self.fill_indexes(blueprint, conn)?;
        self.fill_relations(blueprint, conn)
    }
}
