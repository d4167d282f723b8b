//! File-backed key/value settings store.
//!
//! One [`SettingsStore`] owns one `<module>-<context>.properties` file.  Every
//! read parses the whole file and every write rewrites it; there is no cache,
//! so two stores pointed at the same file converge on last-writer-wins.
//!
//! Within one store, each read-modify-write cycle runs under a mutex, so
//! concurrent `set` calls for different keys on the same instance never lose
//! an update.
//!
//! The public API never fails.  I/O and parse errors are logged through
//! `tracing` and the operation degrades: reads return nothing, writes are
//! dropped.  [`StoreError`] exists only to carry those failures to the log.

use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kwsearch_core::{parse_properties, write_properties, PropertiesError};
use thiserror::Error;
use tracing::{debug, warn};

use super::paths::{config_dir, settings_file_path, ConfigDirError};
use crate::application::ports::{KeyValueStore, SettingsProvider};

const SINGLE_COMMENT: &str = "Changed config settings(single)";
const BATCH_COMMENT: &str = "Changed config settings(batch)";

/// Error type for settings file access.  Logged, never returned publicly.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error accessing settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: PropertiesError,
    },
}

// ── SettingsStore ─────────────────────────────────────────────────────────────

/// Key/value persistence for one (module, context) pair.
#[derive(Debug)]
pub struct SettingsStore {
    module: String,
    context: String,
    path: PathBuf,
    lock: Mutex<()>,
}

impl SettingsStore {
    /// Creates a store for `<dir>/<module>-<context>.properties`.
    ///
    /// Nothing is touched on disk until the first read or write.
    pub fn new(dir: &Path, module: &str, context: &str) -> Self {
        Self {
            module: module.to_string(),
            context: context.to_string(),
            path: settings_file_path(dir, module, context),
            lock: Mutex::new(()),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates the parent directory and an empty file if the file is absent.
    ///
    /// An existing file is never truncated.
    fn ensure_exists(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                let header = write_properties("", &BTreeMap::new());
                file.write_all(header.as_bytes())
                    .map_err(|source| self.io_error(source))?;
                debug!(path = %self.path.display(), "created settings file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        self.ensure_exists()?;
        let text = std::fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        parse_properties(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write_entries(
        &self,
        comment: &str,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let text = write_properties(comment, entries);
        std::fs::write(&self.path, text).map_err(|source| self.io_error(source))
    }

    /// Runs one read-modify-write cycle under the store lock.
    fn update<F>(&self, comment: &str, mutate: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.guard();
        let mut entries = self.read_entries()?;
        if mutate(&mut entries) {
            self.write_entries(comment, &entries)?;
        }
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn log_failure(&self, operation: &str, error: &StoreError) {
        warn!(
            module = %self.module,
            context = %self.context,
            operation,
            error = %error,
            "settings operation failed"
        );
    }
}

impl KeyValueStore for SettingsStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.guard();
        match self.read_entries() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                self.log_failure("get", &e);
                None
            }
        }
    }

    fn get_all(&self) -> BTreeMap<String, String> {
        let _guard = self.guard();
        self.read_entries().unwrap_or_else(|e| {
            self.log_failure("get_all", &e);
            BTreeMap::new()
        })
    }

    fn set(&self, key: &str, value: &str) {
        let result = self.update(SINGLE_COMMENT, |entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        });
        if let Err(e) = result {
            self.log_failure("set", &e);
        }
    }

    fn set_all(&self, updates: &BTreeMap<String, String>) {
        let result = self.update(BATCH_COMMENT, |entries| {
            entries.extend(updates.iter().map(|(k, v)| (k.clone(), v.clone())));
            true
        });
        if let Err(e) = result {
            self.log_failure("set_all", &e);
        }
    }

    fn remove(&self, key: &str) {
        let comment = format!("Removed {key}");
        let result = self.update(&comment, |entries| entries.remove(key).is_some());
        if let Err(e) = result {
            self.log_failure("remove", &e);
        }
    }
}

// ── SettingsRepository ────────────────────────────────────────────────────────

/// Factory that hands out one shared [`SettingsStore`] per (module, context).
///
/// Sharing the instance is what makes the per-store lock effective: every
/// caller asking for the same pair serializes on the same mutex.
#[derive(Debug)]
pub struct SettingsRepository {
    dir: PathBuf,
    stores: Mutex<HashMap<(String, String), Arc<SettingsStore>>>,
}

impl SettingsRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a repository rooted at the per-user configuration directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigDirError`] when no directory can be determined.
    pub fn from_environment() -> Result<Self, ConfigDirError> {
        Ok(Self::new(config_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the store for this pair, creating it on first request.
    pub fn settings_store(&self, module: &str, context: &str) -> Arc<SettingsStore> {
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);
        let store = stores
            .entry((module.to_string(), context.to_string()))
            .or_insert_with(|| Arc::new(SettingsStore::new(&self.dir, module, context)));
        Arc::clone(store)
    }
}

impl SettingsProvider for SettingsRepository {
    fn store(&self, module: &str, context: &str) -> Arc<dyn KeyValueStore> {
        self.settings_store(module, context)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
