//! Loading real SQLite databases into Blueprints.

use relmap::connection::SqliteConnection;
use relmap::meta::{ColumnType, KeyKind, Schema, Sqlite, TableRef};

fn shop() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
             id INTEGER PRIMARY KEY,
             email VARCHAR(191) NOT NULL UNIQUE,
             is_admin TINYINT(1) NOT NULL DEFAULT 0,
             verified BOOLEAN,
             balance DECIMAL(10,2),
             created_at DATETIME
         );
         CREATE TABLE orders (
             id INTEGER NOT NULL,
             tenant_id INTEGER NOT NULL,
             user_id INTEGER REFERENCES users(id),
             PRIMARY KEY (id, tenant_id)
         );
         CREATE TABLE order_lines (
             id INTEGER PRIMARY KEY,
             order_id INTEGER NOT NULL,
             tenant_id INTEGER NOT NULL,
             sku TEXT,
             FOREIGN KEY (order_id, tenant_id) REFERENCES orders (id, tenant_id)
         );
         CREATE INDEX order_lines_sku_index ON order_lines (sku);
         CREATE VIEW admins AS SELECT id, email FROM users WHERE is_admin = 1;",
    )
    .unwrap();
    conn
}

#[test]
fn test_tables_then_views_sorted_by_name() {
    let conn = shop();
    let schema = Schema::load(&Sqlite, "main", &conn).unwrap();

    let tables: Vec<_> = schema.tables().map(|t| (t.table(), t.is_view())).collect();
    assert_eq!(
        tables,
        vec![
            ("order_lines", false),
            ("orders", false),
            ("users", false),
            ("admins", true),
        ]
    );
}

#[test]
fn test_column_types_are_canonical() {
    let conn = shop();
    let schema = Schema::load(&Sqlite, "main", &conn).unwrap();
    let users = schema.table("users").unwrap();

    let types: Vec<_> = users.columns().map(|c| (c.name.as_str(), c.column_type)).collect();
    assert_eq!(
        types,
        vec![
            ("id", ColumnType::Int),
            ("email", ColumnType::String),
            ("is_admin", ColumnType::Bool),
            ("verified", ColumnType::Bool),
            ("balance", ColumnType::Float),
            ("created_at", ColumnType::DateTime),
        ]
    );

    let email = users.column("email").unwrap();
    assert_eq!(email.size, Some(191));
    assert!(!email.nullable);

    let balance = users.column("balance").unwrap();
    assert_eq!((balance.size, balance.scale), (Some(10), Some(2)));
    assert!(users.column("id").unwrap().autoincrement);
}

#[test]
fn test_unique_constraint_becomes_unique_key() {
    let conn = shop();
    let schema = Schema::load(&Sqlite, "main", &conn).unwrap();
    let users = schema.table("users").unwrap();

    let unique: Vec<_> = users.unique_keys().map(|k| k.columns.clone()).collect();
    assert_eq!(unique, vec![vec!["email".to_string()]]);
    assert!(users.is_unique_key(&["email".to_string()]));
    assert_eq!(users.primary_key().columns, vec!["id"]);
}

#[test]
fn test_composite_keys() {
    let conn = shop();
    let schema = Schema::load(&Sqlite, "main", &conn).unwrap();

    let orders = schema.table("orders").unwrap();
    assert_eq!(orders.primary_key().columns, vec!["id", "tenant_id"]);
    assert!(orders.indexes().is_empty());

    let lines = schema.table("order_lines").unwrap();
    let fk = &lines.relations()[0];
    assert_eq!(fk.kind, KeyKind::Foreign);
    assert_eq!(fk.columns, vec!["order_id", "tenant_id"]);
    assert_eq!(fk.references, vec!["id", "tenant_id"]);
    assert_eq!(fk.on, Some(TableRef::new("main", "orders")));

    let index = &lines.indexes()[0];
    assert_eq!(index.kind, KeyKind::Index);
    assert_eq!(index.columns, vec!["sku"]);
}

#[test]
fn test_view_has_columns_and_no_keys() {
    let conn = shop();
    let schema = Schema::load(&Sqlite, "main", &conn).unwrap();
    let admins = schema.table("admins").unwrap();

    assert!(admins.is_view());
    assert_eq!(admins.column_names().collect::<Vec<_>>(), vec!["id", "email"]);
    assert!(admins.relations().is_empty());
    assert!(admins.primary_key().is_empty());
}

#[test]
fn test_missing_table_is_an_error() {
    let conn = shop();
    let schema = Schema::load(&Sqlite, "main", &conn).unwrap();
    let err = schema.table("invoices").unwrap_err();
    assert_eq!(err.to_string(), "Table [invoices] does not belong to schema [main]");
}

#[test]
fn test_loading_twice_is_identical() {
    let conn = shop();
    let first = Schema::load(&Sqlite, "main", &conn).unwrap();
    let second = Schema::load(&Sqlite, "main", &conn).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_foreign_key_target_uses_stored_table_name() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY);
         CREATE TABLE posts (
             id INTEGER PRIMARY KEY,
             user_id INTEGER REFERENCES Users(id)
         );",
    )
    .unwrap();
    let schema = Schema::load(&Sqlite, "main", &conn).unwrap();

    let posts = schema.table("posts").unwrap();
    assert_eq!(posts.relations()[0].on, Some(TableRef::new("main", "users")));

    let users = schema.table("users").unwrap();
    let referencing = schema.referencing(users);
    assert_eq!(referencing.len(), 1);
    assert_eq!(referencing[0].blueprint.table(), "posts");
}

#[test]
fn test_foreign_key_without_target_key_is_dropped() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE tags (name TEXT);
         CREATE TABLE posts (
             id INTEGER PRIMARY KEY,
             tag_name TEXT REFERENCES tags
         );",
    )
    .unwrap();
    let schema = Schema::load(&Sqlite, "main", &conn).unwrap();

    let posts = schema.table("posts").unwrap();
    assert!(posts.relations().is_empty());
    assert_eq!(posts.column_names().collect::<Vec<_>>(), vec!["id", "tag_name"]);
}
