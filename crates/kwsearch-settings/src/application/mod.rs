//! Application layer use cases for keyword search configuration.
//!
//! Code here depends only on `kwsearch_core` and the traits in [`ports`];
//! it performs no file-system access itself.
//!
//! # Sub-modules
//!
//! - **`ports`** – Traits implemented by the infrastructure layer: the
//!   key/value settings store, the keyword list registry, and the ingest
//!   monitor.
//!
//! - **`feature_settings`** – Typed, defaulted view over the three keyword
//!   search settings files.
//!
//! - **`config_controller`** – Coordinates settings and keyword lists and
//!   republishes every change to observers.

pub mod config_controller;
pub mod feature_settings;
pub mod ports;
