//! Schema manager boot, caching and cross-schema lookups.

use relmap::config::ModelSettings;
use relmap::connection::{fixture_rows, FixtureConnection, SqliteConnection};
use relmap::inference::{RelationEngine, RelationKind};
use relmap::meta::{Catalog, DialectRegistry, SchemaManager, Sqlite, TableRef};
use relmap::MetaError;
use serde_json::json;

/// Two MySQL schemas where `shop.posts` points at `crm.members`.
fn two_schemas() -> FixtureConnection {
    FixtureConnection::new("mysql")
        .with_name("mysql-main")
        .respond(
            "information_schema.schemata",
            fixture_rows(json!([
                { "SCHEMA_NAME": "information_schema" },
                { "SCHEMA_NAME": "shop" },
                { "SCHEMA_NAME": "crm" }
            ])),
        )
        .respond(
            "SHOW FULL TABLES FROM `shop` WHERE Table_type=\"BASE TABLE\"",
            fixture_rows(json!([{ "Tables_in_shop": "posts", "Table_type": "BASE TABLE" }])),
        )
        .respond(
            "SHOW FULL TABLES FROM `crm` WHERE Table_type=\"BASE TABLE\"",
            fixture_rows(json!([{ "Tables_in_crm": "members", "Table_type": "BASE TABLE" }])),
        )
        .respond(
            "SHOW FULL COLUMNS FROM `shop`.`posts`",
            fixture_rows(json!([
                { "Field": "id", "Type": "int unsigned", "Null": "NO", "Extra": "auto_increment" },
                { "Field": "member_id", "Type": "int unsigned", "Null": "YES" },
                { "Field": "published", "Type": "bit(1)", "Null": "NO" }
            ])),
        )
        .respond(
            "SHOW FULL COLUMNS FROM `crm`.`members`",
            fixture_rows(json!([
                { "Field": "id", "Type": "int unsigned", "Null": "NO", "Extra": "auto_increment" },
                { "Field": "email", "Type": "varchar(191)", "Null": "NO" }
            ])),
        )
        .respond(
            "SHOW CREATE TABLE `shop`.`posts`",
            fixture_rows(json!([{
                "Table": "posts",
                "Create Table": "CREATE TABLE `posts` (\n  `id` int unsigned NOT NULL AUTO_INCREMENT,\n  `member_id` int unsigned DEFAULT NULL,\n  `published` bit(1) NOT NULL,\n  PRIMARY KEY (`id`),\n  CONSTRAINT `posts_member_id_foreign` FOREIGN KEY (`member_id`) REFERENCES `crm`.`members` (`id`)\n) ENGINE=InnoDB"
            }])),
        )
        .respond(
            "SHOW CREATE TABLE `crm`.`members`",
            fixture_rows(json!([{
                "Table": "members",
                "Create Table": "CREATE TABLE `members` (\n  `id` int unsigned NOT NULL AUTO_INCREMENT,\n  `email` varchar(191) NOT NULL,\n  PRIMARY KEY (`id`),\n  UNIQUE KEY `members_email_unique` (`email`)\n) ENGINE=InnoDB"
            }])),
        )
}

#[test]
fn test_boot_loads_every_schema() {
    let manager = SchemaManager::new(two_schemas()).unwrap();

    assert_eq!(manager.names(), ["shop", "crm"]);
    assert_eq!(manager.dialect().name(), "mysql");
    let loaded: Vec<_> = manager.schemas().map(|s| s.name()).collect();
    assert_eq!(loaded, vec!["shop", "crm"]);

    let posts = manager.get("shop").unwrap().table("posts").unwrap();
    assert_eq!(posts.connection(), "mysql-main");
    assert_eq!(posts.column("published").unwrap().column_type.as_str(), "bool");
}

#[test]
fn test_make_returns_cached_schema() {
    let mut manager = SchemaManager::new(two_schemas()).unwrap();
    let queries = manager.connection().executed().len();

    let schema = manager.make("crm").unwrap();
    assert_eq!(schema.len(), 1);
    assert_eq!(manager.connection().executed().len(), queries);
}

#[test]
fn test_make_loads_unlisted_schema_on_demand() {
    let mut manager = SchemaManager::new(two_schemas()).unwrap();

    let schema = manager.make("archive").unwrap();
    assert!(schema.is_empty());
    assert!(manager.get("archive").is_some());
    assert_eq!(manager.names(), ["shop", "crm"]);
}

#[test]
fn test_cross_schema_foreign_keys() {
    let manager = SchemaManager::new(two_schemas()).unwrap();
    let members = Catalog::blueprint(&manager, &TableRef::new("crm", "members")).unwrap();

    let referencing = manager.referencing(members);
    assert_eq!(referencing.len(), 1);
    assert_eq!(referencing[0].blueprint.qualified_table(), "shop.posts");

    let settings = ModelSettings::default();
    let engine = RelationEngine::new(&manager, &settings);

    let relations = engine.relations(members);
    assert_eq!(relations["posts"].kind(), RelationKind::HasMany);
    assert_eq!(relations["posts"].related(), &TableRef::new("shop", "posts"));

    let posts = manager.get("shop").unwrap().table("posts").unwrap();
    let relations = engine.relations(posts);
    assert_eq!(relations["member"].hint(), "Member|null");
}

#[test]
fn test_failed_load_caches_nothing() {
    let conn = two_schemas().fail_on("SHOW FULL COLUMNS FROM `crm`.`members`", "connection reset");
    let err = SchemaManager::new(conn).unwrap_err();

    assert!(matches!(err, MetaError::Connectivity(_)));
    assert_eq!(err.to_string(), "Database call failed: connection reset");
}

#[test]
fn test_custom_registry() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    assert!(matches!(
        SchemaManager::with_registry(conn, &DialectRegistry::empty()),
        Err(MetaError::UnsupportedDriver { .. })
    ));

    let mut registry = DialectRegistry::empty();
    registry.register("sqlite", Sqlite);
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE users (id INTEGER PRIMARY KEY);").unwrap();

    let manager = SchemaManager::with_registry(conn, &registry).unwrap();
    assert_eq!(manager.names(), ["main"]);
    assert!(manager.get("main").unwrap().has("users"));
}

#[test]
fn test_iterating_manager_visits_cached_schemas() {
    let manager = SchemaManager::new(two_schemas()).unwrap();
    let tables: usize = (&manager).into_iter().map(|schema| schema.len()).sum();
    assert_eq!(tables, 2);
}

#[test]
fn test_boot_tolerates_loose_sqlite_foreign_keys() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY);
         CREATE TABLE tags (name TEXT);
         CREATE TABLE posts (
             id INTEGER PRIMARY KEY,
             user_id INTEGER NOT NULL REFERENCES Users(id),
             tag_name TEXT REFERENCES tags
         );",
    )
    .unwrap();
    let manager = SchemaManager::new(conn).unwrap();

    let main = manager.get("main").unwrap();
    let posts = main.table("posts").unwrap();
    assert_eq!(posts.relations().len(), 1);

    let settings = ModelSettings::default();
    let engine = RelationEngine::new(&manager, &settings);

    let relations = engine.relations(posts);
    assert_eq!(relations["user"].kind(), RelationKind::BelongsTo);
    assert_eq!(relations["user"].related(), &TableRef::new("main", "users"));
    assert!(!relations.contains_key("tag"));

    let users = engine.relations(main.table("users").unwrap());
    assert_eq!(users["posts"].kind(), RelationKind::HasMany);
    assert!(engine.relations(main.table("tags").unwrap()).is_empty());
}
