//! Relationship classification over a real SQLite schema.

use relmap::config::ModelSettings;
use relmap::connection::SqliteConnection;
use relmap::inference::{RelationEngine, RelationKind};
use relmap::meta::{Blueprint, SchemaManager};

const BLOG: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    created_at DATETIME,
    updated_at DATETIME
);
CREATE TABLE posts (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id),
    title VARCHAR(120)
);
CREATE TABLE profiles (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
    bio TEXT
);
CREATE TABLE roles (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE role_user (
    role_id INTEGER NOT NULL REFERENCES roles(id),
    user_id INTEGER NOT NULL REFERENCES users(id),
    expires_at DATETIME,
    created_at DATETIME,
    updated_at DATETIME,
    PRIMARY KEY (role_id, user_id)
);
CREATE TABLE employees (
    id INTEGER PRIMARY KEY,
    manager_id INTEGER REFERENCES employees(id),
    user_id INTEGER REFERENCES users(id)
);
";

fn manager() -> SchemaManager<SqliteConnection> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(BLOG).unwrap();
    SchemaManager::new(conn).unwrap()
}

fn table<'a>(manager: &'a SchemaManager<SqliteConnection>, name: &str) -> &'a Blueprint {
    manager.get("main").unwrap().table(name).unwrap()
}

fn names(relations: &relmap::inference::RelationSet) -> Vec<&str> {
    relations.keys().map(String::as_str).collect()
}

#[test]
fn test_post_belongs_to_user_and_user_has_many_posts() {
    let manager = manager();
    let settings = ModelSettings::default();
    let engine = RelationEngine::new(&manager, &settings);

    let posts = engine.relations(table(&manager, "posts"));
    assert_eq!(names(&posts), vec!["user"]);
    insta::assert_json_snapshot!(posts["user"], @r###"
    {
      "kind": "belongs_to",
      "name": "user",
      "hint": "User",
      "parent": {
        "schema": "main",
        "table": "posts"
      },
      "related": {
        "schema": "main",
        "table": "users"
      },
      "body": {
        "method": "belongsTo",
        "related": "User"
      }
    }
    "###);

    let users = engine.relations(table(&manager, "users"));
    let posts = &users["posts"];
    assert_eq!(posts.kind(), RelationKind::HasMany);
    assert_eq!(posts.hint(), "Collection|Post[]");
    assert_eq!(posts.return_type(), "HasMany");
    assert_eq!(posts.body().to_string(), "hasMany(Post::class)");
}

#[test]
fn test_unique_foreign_key_is_has_one() {
    let manager = manager();
    let settings = ModelSettings::default();
    let engine = RelationEngine::new(&manager, &settings);

    let users = engine.relations(table(&manager, "users"));
    let profile = &users["profile"];
    assert_eq!(profile.kind(), RelationKind::HasOne);
    assert_eq!(profile.hint(), "Profile|null");
    assert!(!users.contains_key("profiles"));
}

#[test]
fn test_pivot_table_gives_belongs_to_many() {
    let manager = manager();
    let settings = ModelSettings::default();
    let engine = RelationEngine::new(&manager, &settings);

    let users = engine.relations(table(&manager, "users"));
    assert_eq!(names(&users), vec!["employees", "posts", "profile", "roles"]);

    let roles = &users["roles"];
    assert_eq!(roles.kind(), RelationKind::BelongsToMany);
    assert_eq!(roles.pivot().unwrap().table, "role_user");
    insta::assert_json_snapshot!(roles.body(), @r###"
    {
      "method": "belongsToMany",
      "related": "Role",
      "pivot_columns": [
        "expires_at"
      ],
      "with_timestamps": true
    }
    "###);

    let roles = engine.relations(table(&manager, "roles"));
    assert_eq!(names(&roles), vec!["users"]);
    assert_eq!(
        roles["users"].body().to_string(),
        "belongsToMany(User::class)->withPivot('expires_at')->withTimestamps()"
    );
}

#[test]
fn test_pivot_keeps_its_own_belongs_to() {
    let manager = manager();
    let settings = ModelSettings::default();
    let engine = RelationEngine::new(&manager, &settings);

    let pivot = engine.relations(table(&manager, "role_user"));
    assert_eq!(pivot.len(), 2);
    assert_eq!(pivot["role"].kind(), RelationKind::BelongsTo);
    assert_eq!(pivot["user"].kind(), RelationKind::BelongsTo);
}

#[test]
fn test_self_reference() {
    let manager = manager();
    let settings = ModelSettings::default();
    let engine = RelationEngine::new(&manager, &settings);

    let employees = engine.relations(table(&manager, "employees"));
    let mut found = names(&employees);
    found.sort();
    assert_eq!(found, vec!["employee", "employees", "user"]);

    let manager_relation = &employees["employee"];
    assert_eq!(manager_relation.kind(), RelationKind::BelongsTo);
    assert_eq!(manager_relation.hint(), "Employee|null");
    assert_eq!(
        manager_relation.body().to_string(),
        "belongsTo(Employee::class, 'manager_id')"
    );

    let reports = &employees["employees"];
    assert_eq!(reports.kind(), RelationKind::HasMany);
    assert_eq!(reports.parent(), reports.related());
}

#[test]
fn test_models_visits_filtered_tables() {
    let manager = manager();
    let settings = ModelSettings {
        except: vec!["role_*".to_string()],
        ..Default::default()
    };
    let engine = RelationEngine::new(&manager, &settings);

    let models = engine.models();
    let tables: Vec<_> = models.iter().map(|(bp, _)| bp.table()).collect();
    assert_eq!(tables, vec!["employees", "posts", "profiles", "roles", "users"]);

    let (_, users) = models.iter().find(|(bp, _)| bp.table() == "users").unwrap();
    assert!(users.contains_key("roles"));
}

#[test]
fn test_inference_is_repeatable() {
    let first = manager();
    let second = manager();
    let settings = ModelSettings::default();

    let a = RelationEngine::new(&first, &settings).models();
    let b = RelationEngine::new(&second, &settings).models();

    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
    assert_eq!(
        serde_json::to_string(first.get("main").unwrap()).unwrap(),
        serde_json::to_string(second.get("main").unwrap()).unwrap()
    );
}
