//! Schema manager: one cached [`Schema`] per schema name on a connection.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use super::blueprint::Blueprint;
use super::dialect::{Dialect, MySql, Postgres, Sqlite};
use super::key::TableRef;
use super::schema::{Catalog, Reference, Schema};
use crate::connection::Connection;
use crate::error::{MetaError, MetaResult};

/// Maps connection driver keys to dialects.
#[derive(Clone)]
pub struct DialectRegistry {
    dialects: HashMap<String, Arc<dyn Dialect>>,
}

impl std::fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut drivers: Vec<_> = self.dialects.keys().collect();
        drivers.sort();
        f.debug_struct("DialectRegistry")
            .field("drivers", &drivers)
            .finish()
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("mysql", MySql)
            .register("mariadb", MySql)
            .register("pgsql", Postgres)
            .register("postgres", Postgres)
            .register("postgresql", Postgres)
            .register("sqlite", Sqlite);
        registry
    }
}

impl DialectRegistry {
    /// A registry with no dialects.
    pub fn empty() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    /// Register (or replace) the dialect for a driver key.
    pub fn register(&mut self, driver: impl Into<String>, dialect: impl Dialect + 'static) -> &mut Self {
        self.dialects.insert(driver.into(), Arc::new(dialect));
        self
    }

    pub fn resolve(&self, driver: &str) -> MetaResult<Arc<dyn Dialect>> {
        self.dialects
            .get(driver)
            .or_else(|| self.dialects.get(&driver.to_ascii_lowercase()))
            .cloned()
            .ok_or_else(|| MetaError::UnsupportedDriver {
                driver: driver.to_string(),
            })
    }
}

/// Every schema reachable from one connection.
///
/// The set of schema names is enumerated once at boot and never refreshed;
/// build a new manager for fresh metadata.
pub struct SchemaManager<C: Connection> {
    connection: C,
    dialect: Arc<dyn Dialect>,
    names: Vec<String>,
    schemas: IndexMap<String, Schema>,
}

impl<C: Connection> std::fmt::Debug for SchemaManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaManager")
            .field("connection", &self.connection.name())
            .field("dialect", &self.dialect.name())
            .field("schemas", &self.names)
            .finish()
    }
}

impl<C: Connection> SchemaManager<C> {
    /// Boot with the default dialect registry.
    pub fn new(connection: C) -> MetaResult<Self> {
        Self::with_registry(connection, &DialectRegistry::default())
    }

    /// Resolve the connection's dialect, enumerate its schemas and load each.
    pub fn with_registry(connection: C, registry: &DialectRegistry) -> MetaResult<Self> {
        let dialect = registry.resolve(connection.driver())?;
        let names = dialect.schemas(&connection)?;

        info!(
            "Booting schema manager for {} ({}): {} schemas",
            connection.name(),
            dialect.name(),
            names.len()
        );

        let mut manager = Self {
            connection,
            dialect,
            names: names.clone(),
            schemas: IndexMap::new(),
        };
        for name in &names {
            manager.make(name)?;
        }
        Ok(manager)
    }

    /// The cached Schema for `name`, loading it on first access.
    pub fn make(&mut self, name: &str) -> MetaResult<&Schema> {
        let index = match self.schemas.get_index_of(name) {
            Some(index) => index,
            None => {
                debug!("Loading schema {}", name);
                let schema = Schema::load(self.dialect.as_ref(), name, &self.connection)?;
                self.schemas.insert_full(name.to_string(), schema).0
            }
        };
        Ok(&self.schemas[index])
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Schema names enumerated at boot.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Currently cached schemas, in load order.
    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }
}

impl<'a, C: Connection> IntoIterator for &'a SchemaManager<C> {
    type Item = &'a Schema;
    type IntoIter = indexmap::map::Values<'a, String, Schema>;

    fn into_iter(self) -> Self::IntoIter {
        self.schemas.values()
    }
}

impl<C: Connection> Catalog for SchemaManager<C> {
    fn blueprint(&self, target: &TableRef) -> Option<&Blueprint> {
        self.schemas.get(&target.schema)?.blueprint(target)
    }

    /// Searches every cached schema, so cross-schema foreign keys are found.
    fn referencing<'a>(&'a self, target: &Blueprint) -> Vec<Reference<'a>> {
        self.schemas
            .values()
            .flat_map(|schema| schema.referencing(target))
            .collect()
    }

    fn blueprints(&self) -> Box<dyn Iterator<Item = &Blueprint> + '_> {
        Box::new(self.schemas.values().flat_map(|s| s.tables()))
    }
}
