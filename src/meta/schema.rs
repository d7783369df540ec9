//! Schema: every Blueprint of one database/schema name on one connection.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info};

use super::blueprint::{Blueprint, BlueprintBuilder};
use super::dialect::Dialect;
use super::key::{Key, TableRef};
use crate::connection::Connection;
use crate::error::{MetaError, MetaResult};

/// A foreign key of `blueprint` pointing at some other Blueprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reference<'a> {
    pub blueprint: &'a Blueprint,
    pub key: &'a Key,
}

/// Lookup surface the inference engine runs against.
pub trait Catalog {
    /// The Blueprint addressed by `target`, if loaded.
    fn blueprint(&self, target: &TableRef) -> Option<&Blueprint>;

    /// Every foreign key, across all loaded Blueprints, pointing at `target`.
    fn referencing<'a>(&'a self, target: &Blueprint) -> Vec<Reference<'a>>;

    /// Every loaded Blueprint.
    fn blueprints(&self) -> Box<dyn Iterator<Item = &Blueprint> + '_>;
}

/// The tables and views of one schema, keyed by table name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    name: String,
    connection: String,
    tables: IndexMap<String, Blueprint>,
}

impl Schema {
    /// Discover and load every base table, then every view.
    ///
    /// Any driver failure aborts the load.
    pub fn load(dialect: &dyn Dialect, name: &str, conn: &dyn Connection) -> MetaResult<Self> {
        let entries = dialect.tables(name, conn)?;
        let mut tables = IndexMap::with_capacity(entries.len());
        let mut views = 0usize;

        for entry in entries {
            let mut builder = BlueprintBuilder::new(conn.name(), name, &entry.name, entry.is_view);
            dialect.fill_columns(&mut builder, conn)?;
            dialect.fill_constraints(&mut builder, conn)?;
            let blueprint = builder.build()?;

            debug!(
                "Loaded {}.{}: {} columns, {} indexes, {} foreign keys",
                name,
                entry.name,
                blueprint.columns().count(),
                blueprint.indexes().len(),
                blueprint.relations().len()
            );

            if entry.is_view {
                views += 1;
            }
            tables.insert(entry.name, blueprint);
        }

        info!(
            "Loaded schema {} via {}: {} tables, {} views",
            name,
            dialect.name(),
            tables.len() - views,
            views
        );

        Ok(Self {
            name: name.to_string(),
            connection: conn.name().to_string(),
            tables,
        })
    }

    /// Assemble a Schema from already built Blueprints.
    pub fn from_blueprints(
        name: impl Into<String>,
        connection: impl Into<String>,
        blueprints: impl IntoIterator<Item = Blueprint>,
    ) -> Self {
        Self {
            name: name.into(),
            connection: connection.into(),
            tables: blueprints
                .into_iter()
                .map(|bp| (bp.table().to_string(), bp))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn tables(&self) -> impl Iterator<Item = &Blueprint> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn has(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn table(&self, table: &str) -> MetaResult<&Blueprint> {
        self.tables
            .get(table)
            .ok_or_else(|| MetaError::unknown_table(&self.name, table))
    }

    /// Foreign keys in this schema that point at `target`.
    pub fn referencing<'a>(&'a self, target: &Blueprint) -> Vec<Reference<'a>> {
        self.tables
            .values()
            .flat_map(|bp| {
                bp.references(target)
                    .into_iter()
                    .map(move |key| Reference { blueprint: bp, key })
            })
            .collect()
    }
}

impl Catalog for Schema {
    fn blueprint(&self, target: &TableRef) -> Option<&Blueprint> {
        if target.schema != self.name {
            return None;
        }
        self.tables.get(&target.table)
    }

    fn referencing<'a>(&'a self, target: &Blueprint) -> Vec<Reference<'a>> {
        Schema::referencing(self, target)
    }

    fn blueprints(&self) -> Box<dyn Iterator<Item = &Blueprint> + '_> {
        Box::new(self.tables.values())
    }
}
