//! Configuration module for relmap.
//!
//! Holds the per-table model settings the inference engine consults, and the
//! TOML loader for them.

mod settings;

pub use settings::{
    ConfigSource, ModelSettings, NameStrategy, Settings, SettingsError, TimestampSettings,
};
