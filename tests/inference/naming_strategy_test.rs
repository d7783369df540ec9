//! Relation naming under the configurable strategies.

use relmap::config::{ModelSettings, NameStrategy, Settings};
use relmap::connection::SqliteConnection;
use relmap::inference::{RelationEngine, RelationKind, RelationSet};
use relmap::meta::{Blueprint, SchemaManager};

const CMS: &str = "
CREATE TABLE app_users (
    uuid TEXT PRIMARY KEY,
    name TEXT NOT NULL
);
CREATE TABLE app_groups (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL
);
CREATE TABLE app_posts (
    id INTEGER PRIMARY KEY,
    author_uuid TEXT NOT NULL REFERENCES app_users(uuid),
    editor_uuid TEXT REFERENCES app_users(uuid)
);
CREATE TABLE app_user_groups (
    member_uuid TEXT NOT NULL REFERENCES app_users(uuid),
    group_id INTEGER NOT NULL REFERENCES app_groups(id)
);
";

fn manager() -> SchemaManager<SqliteConnection> {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(CMS).unwrap();
    SchemaManager::new(conn).unwrap()
}

fn table<'a>(manager: &'a SchemaManager<SqliteConnection>, name: &str) -> &'a Blueprint {
    manager.get("main").unwrap().table(name).unwrap()
}

fn sorted_names(relations: &RelationSet) -> Vec<&str> {
    let mut names: Vec<_> = relations.keys().map(String::as_str).collect();
    names.sort();
    names
}

fn settings(toml: &str) -> ModelSettings {
    Settings::from_str(toml).unwrap().models
}

#[test]
fn test_foreign_key_strategy() {
    let manager = manager();
    let settings = settings(
        r#"
[models]
relation_name_strategy = "foreign_key"
table_prefix = "app_"
"#,
    );
    assert_eq!(settings.relation_name_strategy, NameStrategy::ForeignKey);
    let engine = RelationEngine::new(&manager, &settings);

    let posts = engine.relations(table(&manager, "app_posts"));
    assert_eq!(sorted_names(&posts), vec!["author", "editor"]);
    assert_eq!(posts["author"].hint(), "User");
    assert_eq!(posts["editor"].hint(), "User|null");
    assert_eq!(
        posts["author"].body().to_string(),
        "belongsTo(User::class, 'author_uuid')"
    );

    let users = engine.relations(table(&manager, "app_users"));
    assert_eq!(
        sorted_names(&users),
        vec!["groups", "posts_where_author", "posts_where_editor"]
    );
    assert_eq!(
        users["posts_where_author"].body().to_string(),
        "hasMany(Post::class, 'author_uuid')"
    );
}

#[test]
fn test_related_strategy_collapses_same_target() {
    let manager = manager();
    let settings = settings("[models]\ntable_prefix = \"app_\"\n");
    let engine = RelationEngine::new(&manager, &settings);

    let posts = engine.relations(table(&manager, "app_posts"));
    assert_eq!(sorted_names(&posts), vec!["user"]);

    let users = engine.relations(table(&manager, "app_users"));
    assert_eq!(sorted_names(&users), vec!["groups", "posts"]);
    assert_eq!(users["posts"].kind(), RelationKind::HasMany);
}

#[test]
fn test_camel_case_attributes() {
    let manager = manager();
    let settings = settings(
        r#"
[models]
relation_name_strategy = "foreign_key"
snake_attributes = false
table_prefix = "app_"
"#,
    );
    let engine = RelationEngine::new(&manager, &settings);

    let users = engine.relations(table(&manager, "app_users"));
    assert_eq!(
        sorted_names(&users),
        vec!["groups", "postsWhereAuthor", "postsWhereEditor"]
    );
}

#[test]
fn test_unconventional_pivot_spells_out_keys() {
    let manager = manager();
    let settings = settings("[models]\ntable_prefix = \"app_\"\n");
    let engine = RelationEngine::new(&manager, &settings);

    let users = engine.relations(table(&manager, "app_users"));
    let groups = &users["groups"];
    assert_eq!(groups.kind(), RelationKind::BelongsToMany);
    assert_eq!(groups.hint(), "Collection|Group[]");
    assert_eq!(
        groups.body().to_string(),
        "belongsToMany(Group::class, 'app_user_groups', 'member_uuid')"
    );

    let groups = engine.relations(table(&manager, "app_groups"));
    assert_eq!(
        groups["users"].body().to_string(),
        "belongsToMany(User::class, 'app_user_groups', 'group_id', 'member_uuid')"
    );
}

#[test]
fn test_model_name_override_drives_relation_names() {
    let manager = manager();
    let settings = settings(
        r#"
[models]
table_prefix = "app_"

[models.model_names]
app_users = "Member"
"#,
    );
    let engine = RelationEngine::new(&manager, &settings);

    let posts = engine.relations(table(&manager, "app_posts"));
    assert_eq!(sorted_names(&posts), vec!["member"]);
    assert!(posts["member"].hint().starts_with("Member"));

    let groups = engine.relations(table(&manager, "app_groups"));
    assert_eq!(groups["users"].hint(), "Collection|Member[]");
}

#[test]
fn test_model_for_table() {
    let manager = manager();
    let settings = settings("[models]\ntable_prefix = \"app_\"\n");
    let engine = RelationEngine::new(&manager, &settings);

    let model = engine.model(table(&manager, "app_user_groups"));
    assert_eq!(model.table_without_prefix(), "user_groups");
    assert_eq!(model.record_name(), "user_group");
    assert_eq!(model.class_name(), "UserGroup");
    assert_eq!(model.primary_key_name(), None);
}
