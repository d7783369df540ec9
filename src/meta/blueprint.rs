//! Blueprint: the metadata of one table or view.
//!
//! Dialects fill a [`BlueprintBuilder`] (columns first, then constraints) and
//! freeze it with [`BlueprintBuilder::build`]. Everything downstream reads the
//! resulting [`Blueprint`] and never changes it.

use indexmap::IndexMap;
use serde::Serialize;

use super::column::Column;
use super::key::{Key, KeyKind, TableRef, EMPTY_KEY};
use crate::error::{MetaError, MetaResult};

/// Normalized metadata for one table or view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blueprint {
    connection: String,
    schema: String,
    table: String,
    is_view: bool,
    columns: IndexMap<String, Column>,
    indexes: Vec<Key>,
    relations: Vec<Key>,
    primary_key: Option<Key>,
}

impl Blueprint {
    pub fn connection(&self) -> &str {
        &self.connection
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `schema.table`
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.schema, &self.table)
    }

    pub fn is_view(&self) -> bool {
        self.is_view
    }

    /// Columns in physical order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> MetaResult<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| MetaError::unknown_column(self.qualified_table(), name))
    }

    /// Every declared index, unique keys included.
    pub fn indexes(&self) -> &[Key] {
        &self.indexes
    }

    pub fn unique_keys(&self) -> impl Iterator<Item = &Key> {
        self.indexes.iter().filter(|k| k.kind == KeyKind::Unique)
    }

    /// Outgoing foreign keys.
    pub fn relations(&self) -> &[Key] {
        &self.relations
    }

    /// The key that identifies a row.
    ///
    /// The declared primary key, else the first unique key, else an empty key.
    pub fn primary_key(&self) -> &Key {
        self.primary_key
            .as_ref()
            .or_else(|| self.unique_keys().next())
            .unwrap_or(&EMPTY_KEY)
    }

    /// The declared primary key, without fallback.
    pub fn declared_primary_key(&self) -> Option<&Key> {
        self.primary_key.as_ref()
    }

    pub fn has_composite_primary_key(&self) -> bool {
        self.primary_key().is_composite()
    }

    /// Whether a single-column unique key covers one of `columns`.
    ///
    /// Composite unique keys are not considered.
    pub fn is_unique_key(&self, columns: &[String]) -> bool {
        self.unique_keys().any(|k| match k.columns.as_slice() {
            [only] => columns.contains(only),
            _ => false,
        })
    }

    pub fn is(&self, schema: &str, table: &str) -> bool {
        self.schema == schema && self.table == table
    }

    /// Foreign keys of this table that point at `other`.
    pub fn references(&self, other: &Blueprint) -> Vec<&Key> {
        self.relations
            .iter()
            .filter(|k| k.targets(&other.schema, &other.table))
            .collect()
    }
}

/// Mutable Blueprint under construction.
#[derive(Debug, Clone)]
pub struct BlueprintBuilder {
    inner: Blueprint,
}

impl BlueprintBuilder {
    pub fn new(
        connection: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
        is_view: bool,
    ) -> Self {
        Self {
            inner: Blueprint {
                connection: connection.into(),
                schema: schema.into(),
                table: table.into(),
                is_view,
                columns: IndexMap::new(),
                indexes: Vec::new(),
                relations: Vec::new(),
                primary_key: None,
            },
        }
    }

    pub fn schema(&self) -> &str {
        &self.inner.schema
    }

    pub fn table(&self) -> &str {
        &self.inner.table
    }

    pub fn is_view(&self) -> bool {
        self.inner.is_view
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.inner.has_column(name)
    }

    pub fn with_column(&mut self, column: Column) -> &mut Self {
        self.inner.columns.insert(column.name.clone(), column);
        self
    }

    pub fn with_index(&mut self, index: Key) -> &mut Self {
        self.inner.indexes.push(index);
        self
    }

    pub fn with_relation(&mut self, relation: Key) -> &mut Self {
        self.inner.relations.push(relation);
        self
    }

    pub fn with_primary_key(&mut self, primary_key: Key) -> &mut Self {
        self.inner.primary_key = Some(primary_key);
        self
    }

    /// Freeze the Blueprint, checking every foreign key first.
    pub fn build(self) -> MetaResult<Blueprint> {
        let bp = self.inner;

        for key in &bp.relations {
            if key.columns.len() != key.references.len() || key.columns.is_empty() {
                return Err(MetaError::MisalignedForeignKey {
                    table: bp.qualified_table(),
                    columns: key.columns.clone(),
                    references: key.references.clone(),
                });
            }
            if let Some(missing) = key.columns.iter().find(|c| !bp.has_column(c)) {
                return Err(MetaError::unknown_column(bp.qualified_table(), missing));
            }
        }

        Ok(bp)
    }
}
