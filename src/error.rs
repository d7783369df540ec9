//! Error types for schema introspection.
//!
//! Introspection is a one-shot snapshot: every error here is fatal for the
//! operation that raised it and nothing partially loaded is cached.

use crate::config::SettingsError;
use crate::connection::ConnectionError;

/// Result type for metadata operations.
pub type MetaResult<T> = Result<T, MetaError>;

/// Errors raised while building or querying the metadata model.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// No dialect is registered for the connection's driver type.
    #[error("There is no schema dialect registered for [{driver}] connections")]
    UnsupportedDriver { driver: String },

    /// The underlying driver call failed.
    #[error("Database call failed: {0}")]
    Connectivity(#[from] ConnectionError),

    /// A column's raw type string could not be tokenized.
    #[error("Column [{column}] has a malformed type [{raw}]")]
    MalformedType { column: String, raw: String },

    #[error("Table [{table}] does not belong to schema [{schema}]")]
    UnknownTable { schema: String, table: String },

    #[error("Column [{column}] does not belong to table [{table}]")]
    UnknownColumn { table: String, column: String },

    /// A foreign key whose local and referenced column lists differ in length.
    #[error(
        "Foreign key on [{table}] is misaligned: columns {columns:?} reference {references:?}"
    )]
    MisalignedForeignKey {
        table: String,
        columns: Vec<String>,
        references: Vec<String>,
    },

    /// A driver row did not have the shape the dialect expects.
    #[error("Unexpected {context} record: {source}")]
    InvalidRecord {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl MetaError {
    pub fn unknown_table(schema: impl Into<String>, table: impl Into<String>) -> Self {
        MetaError::UnknownTable {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        MetaError::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn malformed_type(column: impl Into<String>, raw: impl Into<String>) -> Self {
        MetaError::MalformedType {
            column: column.into(),
            raw: raw.into(),
        }
    }

    pub fn invalid_record(context: impl Into<String>, source: serde_json::Error) -> Self {
        MetaError::InvalidRecord {
            context: context.into(),
            source,
        }
    }
}
