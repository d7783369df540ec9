//! Key descriptors: primary, unique, index and foreign keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a key constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Primary,
    Unique,
    Index,
    Foreign,
}

/// Name pair addressing a table inside a schema manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A key over one or more ordered columns.
///
/// Foreign keys also carry the referenced columns, ordinal-aligned with
/// `columns`, and the referenced table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub kind: KeyKind,
    /// Constraint or index name as reported by the database. May be empty.
    pub index: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<TableRef>,
}

/// Stand-in returned when a table has neither a primary nor a unique key.
pub(crate) static EMPTY_KEY: Key = Key {
    kind: KeyKind::Primary,
    index: String::new(),
    columns: Vec::new(),
    references: Vec::new(),
    on: None,
};

impl Key {
    pub fn primary<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self::plain(KeyKind::Primary, "", columns)
    }

    pub fn unique<S: Into<String>>(
        index: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::plain(KeyKind::Unique, index, columns)
    }

    pub fn index<S: Into<String>>(
        index: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::plain(KeyKind::Index, index, columns)
    }

    pub fn foreign<S: Into<String>, R: Into<String>>(
        index: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
        references: impl IntoIterator<Item = R>,
        on: TableRef,
    ) -> Self {
        Self {
            kind: KeyKind::Foreign,
            index: index.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            references: references.into_iter().map(Into::into).collect(),
            on: Some(on),
        }
    }

    fn plain<S: Into<String>>(
        kind: KeyKind,
        index: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            kind,
            index: index.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            references: Vec::new(),
            on: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }

    pub fn first_column(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }

    pub fn first_reference(&self) -> Option<&str> {
        self.references.first().map(String::as_str)
    }

    /// Whether this foreign key points at `schema.table`.
    pub fn targets(&self, schema: &str, table: &str) -> bool {
        self.on
            .as_ref()
            .is_some_and(|on| on.schema == schema && on.table == table)
    }

    /// `(column, referenced column)` pairs, ordinal-aligned.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(&self.references)
            .map(|(c, r)| (c.as_str(), r.as_str()))
    }
}
