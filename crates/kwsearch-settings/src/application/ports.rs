//! Traits the application layer depends on.
//!
//! Use cases in this crate talk only to these abstractions.  The
//! infrastructure layer provides the file-backed implementations, and tests
//! substitute in-memory fakes or `mockall` mocks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kwsearch_core::{Keyword, KeywordList, ListError};
use thiserror::Error;

// ── Key/value settings ────────────────────────────────────────────────────────

/// String key/value persistence for one (module, context) pair.
///
/// Implementations never surface I/O failures to the caller: reads degrade to
/// "absent" or an empty map, and a failed write is logged and dropped.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key is unset or unreadable.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns every stored entry in key order.
    fn get_all(&self) -> BTreeMap<String, String>;

    /// Upserts one entry.
    fn set(&self, key: &str, value: &str);

    /// Upserts every entry in one read-modify-write pass.
    fn set_all(&self, entries: &BTreeMap<String, String>);

    /// Deletes one entry.  Absent keys are a no-op.
    fn remove(&self, key: &str);
}

/// Hands out the store for a (module, context) pair.
///
/// The same pair must always resolve to the same backing file.
pub trait SettingsProvider: Send + Sync {
    fn store(&self, module: &str, context: &str) -> Arc<dyn KeyValueStore>;
}

// ── Keyword list registry ─────────────────────────────────────────────────────

/// Error type for keyword list persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing keyword lists at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The lists file could not be parsed.
    #[error("failed to parse keyword lists at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The lists could not be serialized.
    #[error("failed to serialize keyword lists: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// An export named a list that does not exist.
    #[error("keyword list {0:?} not found")]
    UnknownList(String),
}

/// Collection of named keyword lists with load/save persistence.
///
/// Lists are handed out as shared `Arc<KeywordList>` handles; mutating a
/// handle mutates the registry's copy.  Nothing is written to disk until
/// [`save`](KeywordListStore::save) is called.
pub trait KeywordListStore: Send {
    /// Loads lists from storage on top of whatever is in memory.
    fn load(&mut self) -> Result<(), StorageError>;

    /// Discards every in-memory list and loads from storage.
    fn reload(&mut self) -> Result<(), StorageError>;

    /// Writes every list to storage.
    fn save(&self) -> Result<(), StorageError>;

    /// Every list, in registry order.
    fn lists(&self) -> Vec<Arc<KeywordList>>;

    /// Only locked (`true`) or only unlocked (`false`) lists.
    fn lists_filtered(&self, locked: bool) -> Vec<Arc<KeywordList>>;

    fn get(&self, name: &str) -> Option<Arc<KeywordList>>;

    /// The first list holding a keyword with this query text.
    fn list_with_keyword(&self, query: &str) -> Option<Arc<KeywordList>>;

    /// Adds `list`, replacing an unlocked list of the same name in place.
    ///
    /// Returns the list that was replaced, if any.
    ///
    /// # Errors
    ///
    /// [`ListError::Locked`] if a locked list already has this name.
    fn add_list(&mut self, list: Arc<KeywordList>) -> Result<Option<Arc<KeywordList>>, ListError>;

    /// Creates an unlocked list from `keywords` and adds it like
    /// [`add_list`](KeywordListStore::add_list).
    fn add_list_with(
        &mut self,
        name: &str,
        keywords: Vec<Keyword>,
    ) -> Result<Arc<KeywordList>, ListError> {
        let list = Arc::new(KeywordList::new(name, keywords));
        self.add_list(Arc::clone(&list))?;
        Ok(list)
    }

    /// Removes and returns the named list.
    ///
    /// # Errors
    ///
    /// [`ListError::ListNotFound`] or [`ListError::Locked`].
    fn delete_list(&mut self, name: &str) -> Result<Arc<KeywordList>, ListError>;

    /// Names of every list, in registry order.
    fn list_names(&self) -> Vec<String> {
        self.lists().iter().map(|l| l.name().to_string()).collect()
    }

    /// Writes the named lists to `path` in the registry's own format.
    fn export_lists(&self, names: &[String], path: &Path) -> Result<(), StorageError>;
}

// ── Ingest ────────────────────────────────────────────────────────────────────

/// Read-only view of the ingest pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait IngestMonitor: Send + Sync {
    /// Returns `true` while a running ingest job searches with this list.
    fn is_list_in_use(&self, name: &str) -> bool;
}
