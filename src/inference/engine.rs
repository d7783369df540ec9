//! Relationship classification.
//!
//! Every outgoing foreign key of a table becomes a belongs-to relationship.
//! Every foreign key of another table pointing back at it becomes either a
//! belongs-to-many (when the other table looks like a pivot), a has-one or a
//! has-many.
//!
//! ```text
//! posts.user_id ──▶ users.id
//!
//!   on posts:  belongsTo(User)   "user"
//!   on users:  hasMany(Post)     "posts"
//! ```

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::{ConfigSource, NameStrategy};
use crate::meta::{Blueprint, Catalog, Key, Reference};

use super::model::Model;
use super::naming::{attribute, pluralize, singularize, snake, strip_key_suffix, ucfirst};
use super::relation::{Condition, Relation, RelationBody, RelationKind};

/// Relations of one table, keyed by relation name in declaration order.
pub type RelationSet = IndexMap<String, Relation>;

/// Infers relationships over every Blueprint of a catalog.
pub struct RelationEngine<'a> {
    catalog: &'a dyn Catalog,
    config: &'a dyn ConfigSource,
}

impl<'a> RelationEngine<'a> {
    pub fn new(catalog: &'a dyn Catalog, config: &'a dyn ConfigSource) -> Self {
        Self { catalog, config }
    }

    /// Naming view of `blueprint` under its configured settings.
    pub fn model<'b>(&'b self, blueprint: &'b Blueprint) -> Model<'b> {
        Model::new(blueprint, self.config)
    }

    /// Every Blueprint that passes its `only`/`except` filters, with its relations.
    pub fn models(&self) -> Vec<(&'a Blueprint, RelationSet)> {
        self.catalog
            .blueprints()
            .filter(|blueprint| self.model(blueprint).is_included())
            .map(|blueprint| (blueprint, self.relations(blueprint)))
            .collect()
    }

    /// All relationships of `blueprint`.
    ///
    /// Belongs-to relations come first, then the reverse relations found
    /// through the catalog. A later relation replaces an earlier one of the
    /// same name.
    pub fn relations(&self, blueprint: &Blueprint) -> RelationSet {
        let parent = self.model(blueprint);
        let mut relations = RelationSet::new();

        for key in blueprint.relations() {
            if let Some(relation) = self.belongs_to(&parent, key) {
                insert(&mut relations, relation);
            }
        }

        for reference in self.catalog.referencing(blueprint) {
            for relation in self.reverse(&parent, reference) {
                insert(&mut relations, relation);
            }
        }

        debug!(
            "Inferred {} relations for {}",
            relations.len(),
            blueprint.qualified_table()
        );
        relations
    }

    /// The belongs-to relationship of an outgoing foreign key.
    ///
    /// `None` when the referenced table is not loaded in the catalog.
    pub fn belongs_to(&self, parent: &Model<'_>, key: &Key) -> Option<Relation> {
        let target = key.on.as_ref()?;
        let Some(blueprint) = self.catalog.blueprint(target) else {
            warn!(
                "Foreign key {} on {} points at {}, which is not loaded",
                key.index,
                parent.blueprint().qualified_table(),
                target
            );
            return None;
        };
        let related = self.model(blueprint);

        let foreign_key = key.first_column().unwrap_or_default();
        let owner_key = key.first_reference().unwrap_or_default();

        let base = match parent.name_strategy() {
            NameStrategy::ForeignKey => {
                strip_key_suffix(parent.uses_snake_attributes(), owner_key, foreign_key)
            }
            NameStrategy::Related => related.class_name(),
        };
        let name = attribute(&base, parent.uses_snake_attributes());

        let needs_owner_key = related.primary_key_name() != Some(owner_key);
        let needs_foreign_key =
            needs_owner_key || format!("{}_id", related.record_name()) != foreign_key;

        let mut body = RelationBody::new(RelationKind::BelongsTo, related.class_name());
        body.foreign_key = needs_foreign_key.then(|| foreign_key.to_string());
        body.other_key = needs_owner_key.then(|| owner_key.to_string());
        body.conditions = composite_conditions(key, related.table(), parent.table());

        let nullable = parent
            .blueprint()
            .column(foreign_key)
            .map(|column| column.nullable)
            .unwrap_or(false);
        let hint = if nullable {
            format!("{}|null", related.class_name())
        } else {
            related.class_name()
        };

        Some(Relation::new(
            RelationKind::BelongsTo,
            name,
            hint,
            parent.blueprint().table_ref(),
            target.clone(),
            body,
        ))
    }

    /// Relationships on `parent` implied by a foreign key pointing at it.
    ///
    /// Yields one belongs-to-many per pivot partner when the referencing
    /// table is a pivot, otherwise a single has-one or has-many.
    pub fn reverse<'r>(&'r self, parent: &Model<'_>, reference: Reference<'r>) -> Vec<Relation> {
        let related = self.model(reference.blueprint);

        let partners = self.pivot_partners(parent, reference);
        if !partners.is_empty() {
            return partners
                .into_iter()
                .map(|(key, target)| {
                    self.belongs_to_many(parent, &related, reference.key, key, &self.model(target))
                })
                .collect();
        }

        vec![self.has_one_or_many(parent, &related, reference.key)]
    }

    /// Other foreign keys of a pivot candidate whose targets complete its name.
    ///
    /// The referencing table's name must contain the parent's record name.
    /// With that removed once, each remaining foreign key whose target's
    /// record name appears in what is left is a belongs-to-many partner.
    fn pivot_partners<'r>(
        &'r self,
        parent: &Model<'_>,
        reference: Reference<'r>,
    ) -> Vec<(&'r Key, &'r Blueprint)> {
        let pivot = reference.blueprint;
        let record = parent.record_name();
        if record.is_empty() || !pivot.table().contains(&record) {
            return Vec::new();
        }
        let remainder = pivot.table().replacen(&record, "", 1);

        let mut partners = Vec::new();
        for key in pivot.relations() {
            if key == reference.key {
                continue;
            }
            let Some(target) = key.on.as_ref().and_then(|on| self.catalog.blueprint(on)) else {
                continue;
            };
            let target_record = self.model(target).record_name();
            if !target_record.is_empty() && remainder.contains(&target_record) {
                partners.push((key, target));
            }
        }

        if partners.is_empty() {
            debug!(
                "{} contains {} but has no partner key, not a pivot",
                pivot.table(),
                record
            );
        } else {
            debug!(
                "{} is a pivot for {} with {} partners",
                pivot.table(),
                parent.table(),
                partners.len()
            );
        }
        partners
    }

    fn has_one_or_many(&self, parent: &Model<'_>, related: &Model<'_>, key: &Key) -> Relation {
        let child = related.blueprint();
        let primary = child.primary_key();
        let covers_primary_key =
            !primary.is_empty() && primary.columns.iter().all(|c| key.columns.contains(c));
        let kind = if covers_primary_key || child.is_unique_key(&key.columns) {
            RelationKind::HasOne
        } else {
            RelationKind::HasMany
        };

        let foreign_key = key.first_column().unwrap_or_default();
        let local_key = key.first_reference().unwrap_or_default();
        let snake_case = parent.uses_snake_attributes();

        let (name, hint) = match kind {
            RelationKind::HasOne => (
                attribute(&related.class_name(), snake_case),
                format!("{}|null", related.class_name()),
            ),
            _ => {
                let plural = pluralize(&related.class_name());
                let base = match parent.name_strategy() {
                    NameStrategy::ForeignKey => {
                        let stripped = strip_key_suffix(snake_case, local_key, foreign_key);
                        if snake(&stripped) == snake(&parent.class_name()) {
                            plural
                        } else {
                            format!("{plural}Where{}", ucfirst(&singularize(&stripped)))
                        }
                    }
                    NameStrategy::Related => plural,
                };
                (
                    attribute(&base, snake_case),
                    format!("Collection|{}[]", related.class_name()),
                )
            }
        };

        let needs_local_key = parent.primary_key_name() != Some(local_key);
        let needs_foreign_key =
            needs_local_key || format!("{}_id", parent.record_name()) != foreign_key;

        let mut body = RelationBody::new(kind, related.class_name());
        body.foreign_key = needs_foreign_key.then(|| foreign_key.to_string());
        body.other_key = needs_local_key.then(|| local_key.to_string());
        body.conditions = composite_conditions(key, parent.table(), related.table())
            .into_iter()
            .map(|c| Condition::new(c.right, c.left))
            .collect();

        Relation::new(
            kind,
            name,
            hint,
            parent.blueprint().table_ref(),
            child.table_ref(),
            body,
        )
    }

    fn belongs_to_many(
        &self,
        parent: &Model<'_>,
        pivot: &Model<'_>,
        parent_key: &Key,
        reference_key: &Key,
        reference: &Model<'_>,
    ) -> Relation {
        let snake_case = parent.uses_snake_attributes();

        let mut base = reference.table_without_prefix().to_string();
        if parent.settings().lower_table_name_first {
            base = base.to_lowercase();
        }
        if parent.pluralizes() {
            base = pluralize(&singularize(&base));
        }
        let name = attribute(&base, snake_case);

        let parent_record = snake(&parent.record_name());
        let reference_record = snake(&reference.record_name());
        let foreign_key = parent_key.first_column().unwrap_or_default();
        let other_key = reference_key.first_column().unwrap_or_default();

        let pivot_blueprint = pivot.blueprint();
        let pivot_table = if pivot.schema() != parent.schema() {
            pivot_blueprint.qualified_table()
        } else {
            pivot.table().to_string()
        };

        let needs_other_key = format!("{reference_record}_id") != other_key;
        let needs_foreign_key = needs_other_key || format!("{parent_record}_id") != foreign_key;
        let mut conventional = [reference_record.clone(), parent_record.clone()];
        conventional.sort();
        let needs_pivot_table =
            needs_foreign_key || conventional.join("_").to_lowercase() != pivot_table;

        let timestamps = pivot.timestamp_columns();
        let pivot_columns = pivot_blueprint
            .column_names()
            .filter(|c| *c != foreign_key && *c != other_key && !timestamps.contains(c))
            .map(str::to_string)
            .collect();

        let mut body = RelationBody::new(RelationKind::BelongsToMany, reference.class_name());
        body.pivot_table = needs_pivot_table.then_some(pivot_table);
        body.foreign_key = needs_foreign_key.then(|| foreign_key.to_string());
        body.other_key = needs_other_key.then(|| other_key.to_string());
        body.pivot_columns = pivot_columns;
        body.with_timestamps = pivot.uses_timestamps();

        Relation::new(
            RelationKind::BelongsToMany,
            name,
            format!("Collection|{}[]", reference.class_name()),
            parent.blueprint().table_ref(),
            reference.blueprint().table_ref(),
            body,
        )
        .through(pivot_blueprint.table_ref())
    }
}

/// Extra equalities for the column pairs of a composite key past the first.
///
/// Each pairs `referenced_table.referenced_column` with `owner_table.column`.
fn composite_conditions(key: &Key, referenced_table: &str, owner_table: &str) -> Vec<Condition> {
    key.pairs()
        .skip(1)
        .map(|(column, reference)| {
            Condition::new(
                format!("{referenced_table}.{reference}"),
                format!("{owner_table}.{column}"),
            )
        })
        .collect()
}

fn insert(relations: &mut RelationSet, relation: Relation) {
    let name = relation.name().to_string();
    if let Some(previous) = relations.insert(name, relation) {
        debug!(
            "Relation {} ({}) replaced by a later one",
            previous.name(),
            previous.kind()
        );
    }
}
