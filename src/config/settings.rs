//! TOML-based configuration for relmap.
//!
//! Example configuration:
//! ```toml
//! [models]
//! relation_name_strategy = "foreign_key"
//! snake_attributes = true
//! pluralize = true
//! override_pluralize_for = ["news"]
//! table_prefix = "app_"
//! except = ["migrations", "*_audit"]
//!
//! [models.model_names]
//! people = "Person"
//!
//! [models.timestamps]
//! enabled = true
//! created_at = "created_on"
//! updated_at = "updated_on"
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::meta::Blueprint;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Per-table settings oracle.
///
/// The engine asks for the settings of every Blueprint it visits. How the
/// answer is scoped (connection, schema, table) is up to the implementation.
pub trait ConfigSource {
    fn settings(&self, blueprint: &Blueprint) -> Cow<'_, ModelSettings>;
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Model generation settings.
    pub models: ModelSettings,
}

/// How relation names are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStrategy {
    /// Name after the related model's class.
    #[default]
    Related,
    /// Name after the foreign key column, minus the referenced key suffix.
    ForeignKey,
}

/// Timestamp column settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimestampSettings {
    pub enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Default for TimestampSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            created_at: "created_at".to_string(),
            updated_at: "updated_at".to_string(),
        }
    }
}

/// Settings that shape model and relation naming.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSettings {
    pub relation_name_strategy: NameStrategy,

    /// Use snake_case relation names (camelCase otherwise).
    pub snake_attributes: bool,

    /// Singularize table names into record names.
    pub pluralize: bool,

    /// Tables for which `pluralize` is inverted.
    pub override_pluralize_for: Vec<String>,

    /// Lower-case the record name before converting it to a class name.
    pub lower_table_name_first: bool,

    /// Prefix stripped from table names before naming.
    pub table_prefix: String,

    /// Explicit class names, keyed by table name.
    pub model_names: HashMap<String, String>,

    pub timestamps: TimestampSettings,

    /// Table patterns to visit. Empty means all. `*` matches any run of characters.
    pub only: Vec<String>,

    /// Table patterns to skip.
    pub except: Vec<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            relation_name_strategy: NameStrategy::Related,
            snake_attributes: true,
            pluralize: true,
            override_pluralize_for: Vec::new(),
            lower_table_name_first: false,
            table_prefix: String::new(),
            model_names: HashMap::new(),
            timestamps: TimestampSettings::default(),
            only: Vec::new(),
            except: Vec::new(),
        }
    }
}

impl ModelSettings {
    /// Whether the record name of `table` is singularized.
    pub fn pluralizes(&self, table: &str) -> bool {
        if self.override_pluralize_for.iter().any(|t| t == table) {
            !self.pluralize
        } else {
            self.pluralize
        }
    }

    /// Strip the configured table prefix, if present.
    pub fn strip_prefix<'a>(&self, table: &'a str) -> &'a str {
        if self.table_prefix.is_empty() {
            return table;
        }
        table.strip_prefix(self.table_prefix.as_str()).unwrap_or(table)
    }

    /// Whether `table` passes the `only`/`except` filters.
    pub fn includes(&self, table: &str) -> bool {
        let listed = self.only.is_empty() || self.only.iter().any(|p| matches_pattern(p, table));
        listed && !self.except.iter().any(|p| matches_pattern(p, table))
    }
}

impl ConfigSource for ModelSettings {
    fn settings(&self, _blueprint: &Blueprint) -> Cow<'_, ModelSettings> {
        Cow::Borrowed(self)
    }
}

impl ConfigSource for Settings {
    fn settings(&self, _blueprint: &Blueprint) -> Cow<'_, ModelSettings> {
        Cow::Borrowed(&self.models)
    }
}

/// Shell-style match where `*` stands for any run of characters.
pub(crate) fn matches_pattern(pattern: &str, value: &str) -> bool {
    if pattern == value {
        return true;
    }
    if !pattern.contains('*') {
        return false;
    }

    let body = regex::escape(pattern).replace(r"\*", ".*");
    Regex::new(&format!("^{body}$"))
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse settings from TOML text.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RELMAP_CONFIG`
    /// 2. `./relmap.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("RELMAP_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("relmap.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        Ok(Settings::default())
    }
}
