//! Storage infrastructure: settings files and keyword list persistence.
//!
//! - `paths` resolves the per-user configuration directory and file names.
//! - `settings_store` is the `key=value` store behind every settings module.
//! - `keyword_lists` is the TOML-backed keyword list registry.

pub mod keyword_lists;
pub mod paths;
pub mod settings_store;
