//! Classified relationships and their renderable bodies.

use std::fmt;

use serde::Serialize;

use crate::meta::TableRef;

/// The four relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    BelongsTo,
    HasOne,
    HasMany,
    BelongsToMany,
}

impl RelationKind {
    /// Name of the model method that builds the relationship.
    pub fn method(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::HasOne => "hasOne",
            RelationKind::HasMany => "hasMany",
            RelationKind::BelongsToMany => "belongsToMany",
        }
    }

    /// Return-type identifier of the relationship method.
    pub fn return_type(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "BelongsTo",
            RelationKind::HasOne => "HasOne",
            RelationKind::HasMany => "HasMany",
            RelationKind::BelongsToMany => "BelongsToMany",
        }
    }

    /// Whether the relationship yields a collection.
    pub fn is_many(&self) -> bool {
        matches!(self, RelationKind::HasMany | RelationKind::BelongsToMany)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// Equality between two qualified columns, added for composite keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub left: String,
    pub right: String,
}

impl Condition {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// How to construct a relationship at runtime.
///
/// Keys are only present when they differ from the naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationBody {
    pub method: &'static str,
    /// Class name of the related model.
    pub related: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot_table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
    /// Owner key (belongs-to), local key (has-one/has-many) or related pivot
    /// key (belongs-to-many).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_key: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pivot_columns: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub with_timestamps: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl RelationBody {
    pub fn new(kind: RelationKind, related: impl Into<String>) -> Self {
        Self {
            method: kind.method(),
            related: related.into(),
            pivot_table: None,
            foreign_key: None,
            other_key: None,
            pivot_columns: Vec::new(),
            with_timestamps: false,
            conditions: Vec::new(),
        }
    }

    /// Positional arguments of the method call.
    ///
    /// A later key forces every earlier one to be spelled out.
    fn arguments(&self) -> Vec<String> {
        let mut args = vec![format!("{}::class", self.related)];
        let keys = [&self.pivot_table, &self.foreign_key, &self.other_key];
        let needed = keys.iter().rposition(|k| k.is_some()).map_or(0, |i| i + 1);
        for key in keys.iter().take(needed) {
            args.push(format!("'{}'", key.as_deref().unwrap_or_default()));
        }
        args
    }
}

impl fmt::Display for RelationBody {
    /// Renders the body as a fluent call chain, e.g.
    /// `hasMany(Post::class, 'author_id')->where('posts.tenant_id', '=', 'users.tenant_id')`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.method, self.arguments().join(", "))?;
        for condition in &self.conditions {
            write!(f, "->where('{}', '=', '{}')", condition.left, condition.right)?;
        }
        if !self.pivot_columns.is_empty() {
            let columns: Vec<String> = self.pivot_columns.iter().map(|c| format!("'{c}'")).collect();
            write!(f, "->withPivot({})", columns.join(", "))?;
        }
        if self.with_timestamps {
            f.write_str("->withTimestamps()")?;
        }
        Ok(())
    }
}

/// One classified relationship of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation {
    kind: RelationKind,
    name: String,
    hint: String,
    /// Table the relationship is declared on.
    parent: TableRef,
    /// Table the relationship resolves to.
    related: TableRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pivot: Option<TableRef>,
    body: RelationBody,
}

impl Relation {
    pub(crate) fn new(
        kind: RelationKind,
        name: String,
        hint: String,
        parent: TableRef,
        related: TableRef,
        body: RelationBody,
    ) -> Self {
        Self {
            kind,
            name,
            hint,
            parent,
            related,
            pivot: None,
            body,
        }
    }

    pub(crate) fn through(mut self, pivot: TableRef) -> Self {
        self.pivot = Some(pivot);
        self
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Documentation type hint, e.g. `User|null` or `Collection|Post[]`.
    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn return_type(&self) -> &'static str {
        self.kind.return_type()
    }

    pub fn body(&self) -> &RelationBody {
        &self.body
    }

    pub fn parent(&self) -> &TableRef {
        &self.parent
    }

    pub fn related(&self) -> &TableRef {
        &self.related
    }

    /// Junction table of a belongs-to-many relationship.
    pub fn pivot(&self) -> Option<&TableRef> {
        self.pivot.as_ref()
    }
}
