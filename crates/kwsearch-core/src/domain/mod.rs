//! Domain entities for keyword search configuration.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies.  Code in the settings crate (storage, controller, CLI)
//! depends on these types; they never depend back on it.

/// Typed change notifications published by the configuration controller.
pub mod change;

/// Keywords, keyword lists, and list-level change events.
pub mod keyword;

/// Copy-on-notify listener hub.
pub mod observer;

/// Update frequency, script and extract option enumerations.
pub mod options;
