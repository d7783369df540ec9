//! PostgreSQL introspection through the `information_schema` catalog views.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{lenient, Dialect, TableEntry};
use crate::connection::{Connection, Row};
use crate::error::MetaResult;
use crate::meta::blueprint::BlueprintBuilder;
use crate::meta::column::{Column, ColumnType, TypeSpec};
use crate::meta::key::{Key, TableRef};

const SCHEMAS_SQL: &str = "
    SELECT schema_name
    FROM information_schema.schemata
    WHERE schema_name NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
      AND schema_name NOT LIKE 'pg_temp_%'
      AND schema_name NOT LIKE 'pg_toast_temp_%'
    ORDER BY schema_name";

const COLUMNS_SQL: &str = "
    SELECT c.*,
           col_description(
               (quote_ident(c.table_schema) || '.' || quote_ident(c.table_name))::regclass::oid,
               c.ordinal_position
           ) AS column_comment
    FROM information_schema.columns c
    WHERE c.table_schema = $1 AND c.table_name = $2
    ORDER BY c.ordinal_position";

const KEY_COLUMNS_SQL: &str = "
    SELECT tc.constraint_name, kcu.table_name, kcu.column_name, kcu.ordinal_position
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
     AND tc.table_name = kcu.table_name
    WHERE tc.constraint_type = $1
      AND tc.table_schema = $2
      AND tc.table_name = $3
    ORDER BY tc.constraint_name, kcu.ordinal_position";

const FOREIGN_KEYS_SQL: &str = "
    SELECT kcu.constraint_name,
           kcu.table_name,
           kcu.column_name,
           kcu.ordinal_position,
           rcu.table_schema AS foreign_table_schema,
           rcu.table_name AS foreign_table_name,
           rcu.column_name AS foreign_column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
     AND tc.table_name = kcu.table_name
    JOIN information_schema.referential_constraints rc
      ON rc.constraint_name = tc.constraint_name
     AND rc.constraint_schema = tc.table_schema
    JOIN information_schema.key_column_usage rcu
      ON rcu.constraint_name = rc.unique_constraint_name
     AND rcu.constraint_schema = rc.unique_constraint_schema
     AND rcu.ordinal_position = kcu.position_in_unique_constraint
    WHERE tc.constraint_type = 'FOREIGN KEY'
      AND tc.table_schema = $1
      AND tc.table_name = $2
    ORDER BY kcu.constraint_name, kcu.ordinal_position";

const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "pg_catalog", "pg_toast"];

/// Type prefixes and their canonical types. The longest matching prefix wins.
const TYPE_PREFIXES: &[(&str, ColumnType)] = &[
    ("character varying", ColumnType::String),
    ("varchar", ColumnType::String),
    ("character", ColumnType::String),
    ("char", ColumnType::String),
    ("text", ColumnType::String),
    ("citext", ColumnType::String),
    ("uuid", ColumnType::String),
    ("json", ColumnType::String),
    ("jsonb", ColumnType::String),
    ("xml", ColumnType::String),
    ("inet", ColumnType::String),
    ("cidr", ColumnType::String),
    ("macaddr", ColumnType::String),
    ("integer", ColumnType::Int),
    ("int", ColumnType::Int),
    ("int4", ColumnType::Int),
    ("smallint", ColumnType::Int),
    ("int2", ColumnType::Int),
    ("bigint", ColumnType::Int),
    ("int8", ColumnType::Int),
    ("serial", ColumnType::Int),
    ("bigserial", ColumnType::Int),
    ("serial4", ColumnType::Int),
    ("serial8", ColumnType::Int),
    ("numeric", ColumnType::Float),
    ("decimal", ColumnType::Float),
    ("double precision", ColumnType::Float),
    ("float8", ColumnType::Float),
    ("real", ColumnType::Float),
    ("float4", ColumnType::Float),
    ("money", ColumnType::Float),
    ("boolean", ColumnType::Bool),
    ("bool", ColumnType::Bool),
    ("timestamp", ColumnType::DateTime),
    ("timestamptz", ColumnType::DateTime),
    ("date", ColumnType::DateTime),
    ("time", ColumnType::DateTime),
    ("timetz", ColumnType::DateTime),
    ("interval", ColumnType::DateTime),
];

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

#[derive(Debug, Deserialize)]
struct ColumnRecord {
    column_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    data_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    udt_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    is_nullable: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    column_default: Option<String>,
    #[serde(default, deserialize_with = "lenient::u32")]
    character_maximum_length: Option<u32>,
    #[serde(default, deserialize_with = "lenient::u32")]
    numeric_precision: Option<u32>,
    #[serde(default, deserialize_with = "lenient::u32")]
    numeric_scale: Option<u32>,
    #[serde(default, deserialize_with = "lenient::string")]
    column_comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeyColumnRecord {
    constraint_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    table_name: Option<String>,
    column_name: String,
    #[serde(default, deserialize_with = "lenient::i64")]
    ordinal_position: i64,
}

#[derive(Debug, Deserialize)]
struct ForeignKeyRecord {
    constraint_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    table_name: Option<String>,
    column_name: String,
    #[serde(default, deserialize_with = "lenient::i64")]
    ordinal_position: i64,
    foreign_table_schema: String,
    foreign_table_name: String,
    foreign_column_name: String,
}

fn map_type(base: &str) -> ColumnType {
    TYPE_PREFIXES
        .iter()
        .filter(|(prefix, _)| base.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, column_type)| *column_type)
        .unwrap_or(ColumnType::String)
}

/// `'draft'::character varying` becomes `draft`; `nextval(...)` is dropped.
fn clean_default(default: Option<String>) -> Option<String> {
    let default = default?;
    if default.contains("nextval") {
        return None;
    }
    match default.split_once("::") {
        Some((value, _)) => Some(value.trim_matches('\'').to_string()),
        None => Some(default),
    }
}

fn binding(value: &str) -> Value {
    Value::String(value.to_string())
}

/// Constraint names are only unique per table, so rows naming another table
/// belong to someone else.
fn owned_by(table_name: Option<&str>, blueprint: &BlueprintBuilder) -> bool {
    table_name.map_or(true, |name| name == blueprint.table())
}

impl Postgres {
    fn fetch_tables(
        &self,
        schema: &str,
        table_type: &str,
        conn: &dyn Connection,
    ) -> MetaResult<Vec<String>> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = $1 AND table_type = '{table_type}' ORDER BY table_name"
        );
        Ok(conn
            .select(&sql, &[binding(schema)])?
            .iter()
            .filter_map(|row| row.str("table_name").map(String::from))
            .collect())
    }

    /// Columns of every `constraint_type` constraint on the table, grouped by
    /// constraint name and ordered by ordinal position.
    fn key_columns(
        &self,
        constraint_type: &str,
        blueprint: &BlueprintBuilder,
        conn: &dyn Connection,
    ) -> MetaResult<IndexMap<String, Vec<String>>> {
        let rows = conn.select(
            KEY_COLUMNS_SQL,
            &[
                binding(constraint_type),
                binding(blueprint.schema()),
                binding(blueprint.table()),
            ],
        )?;

        let mut grouped: IndexMap<String, Vec<KeyColumnRecord>> = IndexMap::new();
        for row in &rows {
            let record: KeyColumnRecord = row.decode("PostgreSQL key column")?;
            if !owned_by(record.table_name.as_deref(), blueprint) {
                continue;
            }
            grouped
                .entry(record.constraint_name.clone())
                .or_default()
                .push(record);
        }

        Ok(grouped
            .into_iter()
            .map(|(name, mut records)| {
                records.sort_by_key(|r| r.ordinal_position);
                (name, records.into_iter().map(|r| r.column_name).collect())
            })
            .collect())
    }

    fn fill_relations(
        &self,
        blueprint: &mut BlueprintBuilder,
        conn: &dyn Connection,
    ) -> MetaResult<()> {
        let rows = conn.select(
            FOREIGN_KEYS_SQL,
            &[binding(blueprint.schema()), binding(blueprint.table())],
        )?;

        let mut grouped: IndexMap<String, Vec<ForeignKeyRecord>> = IndexMap::new();
        for row in &rows {
            let record: ForeignKeyRecord = row.decode("PostgreSQL foreign key")?;
            if !owned_by(record.table_name.as_deref(), blueprint) {
                continue;
            }
            grouped
                .entry(record.constraint_name.clone())
                .or_default()
                .push(record);
        }

        for (name, mut records) in grouped {
            records.sort_by_key(|r| r.ordinal_position);
            let Some(first) = records.first() else {
                continue;
            };
            let target = TableRef::new(&first.foreign_table_schema, &first.foreign_table_name);
            let references: Vec<String> =
                records.iter().map(|r| r.foreign_column_name.clone()).collect();
            let columns: Vec<String> = records.into_iter().map(|r| r.column_name).collect();

            blueprint.with_relation(Key::foreign(name, columns, references, target));
        }
        Ok(())
    }
}

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "pgsql"
    }

    fn schemas(&self, conn: &dyn Connection) -> MetaResult<Vec<String>> {
        Ok(conn
            .select(SCHEMAS_SQL, &[])?
            .iter()
            .filter_map(|row| row.str("schema_name"))
            .filter(|name| {
                !SYSTEM_SCHEMAS.contains(name)
                    && !name.starts_with("pg_temp_")
                    && !name.starts_with("pg_toast_temp_")
            })
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
        let record: ColumnRecord = row.decode("PostgreSQL column")?;
        let data_type = record.data_type.unwrap_or_default();

        let user_defined = matches!(data_type.as_str(), "USER-DEFINED" | "ARRAY");
        let raw = match record.udt_name.clone() {
            Some(udt) if user_defined => udt,
            _ => data_type,
        };
        let spec = TypeSpec::parse(&record.column_name, &raw)?;

        let mut column = Column::new(&record.column_name, map_type(&spec.base));

        if spec.base == "bit" && record.character_maximum_length == Some(1) {
            column.column_type = ColumnType::Bool;
        } else if let Some(length) = record.character_maximum_length {
            column.size = Some(length);
        } else if let Some(precision) = record.numeric_precision {
            column.size = Some(precision);
            column.scale = record.numeric_scale.filter(|s| *s > 0);
        }

        column.autoincrement = record
            .column_default
            .as_deref()
            .is_some_and(|d| d.contains("nextval"));
        column.nullable = record.is_nullable.as_deref() == Some("YES");
        column.default = clean_default(record.column_default);
        column.comment = record.column_comment;

        Ok(column)
    }

    fn fill_columns(
        &self,
        blueprint: &mut BlueprintBuilder,
        conn: &dyn Connection,
    ) -> MetaResult<()> {
        let rows = conn.select(
            COLUMNS_SQL,
            &[binding(blueprint.schema()), binding(blueprint.table())],
        )?;

        for row in rows {
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
        let primary = self.key_columns("PRIMARY KEY", blueprint, conn)?;
        if let Some((_, columns)) = primary.into_iter().next() {
            blueprint.with_primary_key(Key::primary(columns));
        }

        for (name, columns) in self.key_columns("UNIQUE", blueprint, conn)? {
            blueprint.with_index(Key::unique(name, columns));
        }

        self.fill_relations(blueprint, conn)?;

        debug!(
            "Loaded constraints of {}.{}",
            blueprint.schema(),
            blueprint.table()
        );
        Ok(())
    }
}
