//! Relationship inference over loaded schemas.
//!
//! [`RelationEngine`] runs against any [`Catalog`](crate::meta::Catalog) (a
//! single [`Schema`](crate::meta::Schema) or a whole
//! [`SchemaManager`](crate::meta::SchemaManager)) and asks a
//! [`ConfigSource`](crate::config::ConfigSource) how each table is named.

mod engine;
mod model;
pub mod naming;
mod relation;

pub use engine::{RelationEngine, RelationSet};
pub use model::Model;
pub use relation::{Condition, Relation, RelationBody, RelationKind};
