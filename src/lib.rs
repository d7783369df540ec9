//! # relmap
//!
//! Database schema introspection and relationship inference.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Connection (driver boundary)                │
//! │        select(sql, bindings) -> Vec<Row>                 │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dialect: MySql / Postgres / Sqlite]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Blueprint per table (columns, keys, foreign keys)      │
//! │   Schema per schema name, SchemaManager per connection   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [inference + ConfigSource]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Relations: belongsTo / hasOne / hasMany /              │
//! │              belongsToMany (through pivot tables)        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use relmap::config::ModelSettings;
//! use relmap::connection::SqliteConnection;
//! use relmap::inference::{RelationEngine, RelationKind};
//! use relmap::meta::SchemaManager;
//!
//! let conn = SqliteConnection::open_in_memory().unwrap();
//! conn.execute_batch(
//!     "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
//!      CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id));",
//! )
//! .unwrap();
//!
//! let manager = SchemaManager::new(conn).unwrap();
//! let settings = ModelSettings::default();
//! let engine = RelationEngine::new(&manager, &settings);
//!
//! let users = manager.get("main").unwrap().table("users").unwrap();
//! let relations = engine.relations(users);
//! assert_eq!(relations["posts"].kind(), RelationKind::HasMany);
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod inference;
pub mod meta;

pub use error::{MetaError, MetaResult};
