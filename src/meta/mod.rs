//! Schema metadata model.
//!
//! Raw dialect output is normalized into [`Column`]s and [`Key`]s, assembled
//! into one [`Blueprint`] per table or view, grouped into a [`Schema`] per
//! database/schema name, and cached per connection by the [`SchemaManager`].

mod blueprint;
mod column;
pub mod dialect;
mod key;
mod manager;
mod schema;

pub use blueprint::{Blueprint, BlueprintBuilder};
pub use column::{Column, ColumnType, ValueMapping};
pub use dialect::{Dialect, MySql, Postgres, Sqlite, TableEntry};
pub use key::{Key, KeyKind, TableRef};
pub use manager::{DialectRegistry, SchemaManager};
pub use schema::{Catalog, Reference, Schema};
