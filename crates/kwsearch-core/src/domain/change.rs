//! Change notifications published by the configuration controller.
//!
//! Observers receive a [`ConfigChange`] carrying the old and new value of
//! whatever changed.  The enum is closed, so a `match` over it is exhaustive:
//! adding a new kind of change is a compile error for every observer that
//! needs to handle it.

use super::options::{ExtractOption, Script, UpdateFrequency};

/// Symbolic name of a change, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    SkipKnown,
    UpdateFrequency,
    Scripts,
    ExtractOptions,
    KeywordLists,
}

impl ChangeKind {
    /// Stable lower-case identifier, used in log lines and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::SkipKnown => "skip_known",
            ChangeKind::UpdateFrequency => "update_frequency",
            ChangeKind::Scripts => "scripts",
            ChangeKind::ExtractOptions => "string_extract_options",
            ChangeKind::KeywordLists => "keyword_lists",
        }
    }
}

/// How the set of keyword lists changed.
///
/// `Added` corresponds to an old value of "absent" and `Removed` to a new
/// value of "absent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListsChange {
    /// A list was added or replaced under this name.
    Added { name: String },
    /// The list with this name was removed.
    Removed { name: String },
    /// Some field of this list changed.  Which field is not reported.
    Modified { name: String },
}

impl ListsChange {
    /// The list name carried by the change.
    pub fn name(&self) -> &str {
        match self {
            ListsChange::Added { name }
            | ListsChange::Removed { name }
            | ListsChange::Modified { name } => name,
        }
    }

    /// Old value in old/new form: the removed name, otherwise absent.
    pub fn old_value(&self) -> Option<&str> {
        match self {
            ListsChange::Removed { name } => Some(name),
            _ => None,
        }
    }

    /// New value in old/new form: the added or modified name, otherwise absent.
    pub fn new_value(&self) -> Option<&str> {
        match self {
            ListsChange::Added { name } | ListsChange::Modified { name } => Some(name),
            ListsChange::Removed { .. } => None,
        }
    }
}

/// A typed configuration change with old and new values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigChange {
    SkipKnown {
        old: bool,
        new: bool,
    },
    UpdateFrequency {
        old: UpdateFrequency,
        new: UpdateFrequency,
    },
    Scripts {
        old: Vec<Script>,
        new: Vec<Script>,
    },
    ExtractOption {
        option: ExtractOption,
        old: bool,
        new: bool,
    },
    KeywordLists(ListsChange),
}

impl ConfigChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ConfigChange::SkipKnown { .. } => ChangeKind::SkipKnown,
            ConfigChange::UpdateFrequency { .. } => ChangeKind::UpdateFrequency,
            ConfigChange::Scripts { .. } => ChangeKind::Scripts,
            ConfigChange::ExtractOption { .. } => ChangeKind::ExtractOptions,
            ConfigChange::KeywordLists(_) => ChangeKind::KeywordLists,
        }
    }
}
