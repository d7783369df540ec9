//! Naming view of one Blueprint under its settings.

use std::borrow::Cow;

use crate::config::{ConfigSource, ModelSettings, NameStrategy};
use crate::meta::Blueprint;

use super::naming::{singularize, studly};

/// A Blueprint paired with the settings that name it.
#[derive(Debug, Clone)]
pub struct Model<'a> {
    blueprint: &'a Blueprint,
    settings: Cow<'a, ModelSettings>,
}

impl<'a> Model<'a> {
    pub fn new(blueprint: &'a Blueprint, config: &'a dyn ConfigSource) -> Self {
        Self {
            blueprint,
            settings: config.settings(blueprint),
        }
    }

    pub fn with_settings(blueprint: &'a Blueprint, settings: ModelSettings) -> Self {
        Self {
            blueprint,
            settings: Cow::Owned(settings),
        }
    }

    pub fn blueprint(&self) -> &'a Blueprint {
        self.blueprint
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn table(&self) -> &'a str {
        self.blueprint.table()
    }

    pub fn schema(&self) -> &'a str {
        self.blueprint.schema()
    }

    /// Table name with the configured prefix removed.
    pub fn table_without_prefix(&self) -> &'a str {
        self.settings.strip_prefix(self.blueprint.table())
    }

    /// Whether this table's name is singularized into its record name.
    pub fn pluralizes(&self) -> bool {
        self.settings.pluralizes(self.blueprint.table())
    }

    /// Singular, human-facing name of one row: `users` gives `user`.
    pub fn record_name(&self) -> String {
        let table = self.table_without_prefix();
        if self.pluralizes() {
            singularize(table)
        } else {
            table.to_string()
        }
    }

    /// Class-style model name: `role_users` gives `RoleUser`.
    pub fn class_name(&self) -> String {
        if let Some(name) = self.settings.model_names.get(self.blueprint.table()) {
            return name.clone();
        }

        let record = self.record_name();
        if self.settings.lower_table_name_first {
            studly(&record.to_lowercase())
        } else {
            studly(&record)
        }
    }

    /// First column of the identifying key, if the table has one.
    pub fn primary_key_name(&self) -> Option<&'a str> {
        self.blueprint.primary_key().first_column()
    }

    pub fn uses_snake_attributes(&self) -> bool {
        self.settings.snake_attributes
    }

    pub fn name_strategy(&self) -> NameStrategy {
        self.settings.relation_name_strategy
    }

    /// Whether timestamps are enabled and both timestamp columns exist.
    pub fn uses_timestamps(&self) -> bool {
        let timestamps = &self.settings.timestamps;
        timestamps.enabled
            && self.blueprint.has_column(&timestamps.created_at)
            && self.blueprint.has_column(&timestamps.updated_at)
    }

    /// Names of the timestamp columns.
    pub fn timestamp_columns(&self) -> [&str; 2] {
        let timestamps = &self.settings.timestamps;
        [timestamps.created_at.as_str(), timestamps.updated_at.as_str()]
    }

    /// Whether the table passes the `only`/`except` filters.
    pub fn is_included(&self) -> bool {
        self.settings.includes(self.blueprint.table())
    }
}
