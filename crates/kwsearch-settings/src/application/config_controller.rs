//! ConfigController: the single coordination point for keyword search
//! configuration.
//!
//! The controller owns the [`FeatureSettings`] and the keyword list registry
//! and republishes every change as one typed [`ConfigChange`] stream.
//!
//! # Keyword list lifecycle
//!
//! ```text
//! Unregistered ──add──► Registered ──mutate──► Registered ──remove──► Deleted
//!                      (observed)     │
//!                                     └─► save registry, notify KeywordLists
//! ```
//!
//! A list is observed from the moment it is added (or loaded at startup).
//! Any mutation of an observed list, made through the controller or directly
//! on the shared `Arc<KeywordList>`, saves the whole registry and emits one
//! `KeywordLists(Modified)` notification.  Removal detaches the observer
//! before the registry drops the list.  A list event already in flight when
//! the list is removed or replaced is ignored: only a list that is still
//! registered under its name causes a save and a notification.
//!
//! Registry save failures are logged and never rolled back: in-memory state
//! stays authoritative for the rest of the process.
//!
//! # Locking
//!
//! The registry lock is never held while a list is mutated, because list
//! observers take that lock to save.  Observers of the controller are
//! always called with no controller lock held.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use kwsearch_core::{
    ConfigChange, ExtractOption, Keyword, KeywordList, ListError, ListEvent, Listeners,
    ListsChange, Script, SubscriptionId, UpdateFrequency,
};
use thiserror::Error;
use tracing::{debug, error, info};

use super::feature_settings::{FeatureSettings, SettingsSnapshot};
use super::ports::{IngestMonitor, KeywordListStore, StorageError};

/// Error type for controller operations on keyword lists.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The list is built-in and cannot be removed or edited.
    #[error("keyword list {0:?} is locked")]
    Locked(String),

    /// A running ingest job is searching with this list.
    #[error("keyword list {0:?} is in use by a running ingest job")]
    ListInUse(String),

    #[error("keyword list {0:?} not found")]
    ListNotFound(String),

    /// A copy target name is already taken.
    #[error("keyword list {0:?} already exists")]
    ListExists(String),

    #[error(transparent)]
    List(#[from] ListError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ── Shared state ──────────────────────────────────────────────────────────────

/// State reachable from list observers.
///
/// Observers hold a `Weak` to this, so lists never keep the controller alive.
struct Shared {
    registry: Mutex<Box<dyn KeywordListStore>>,
    listeners: Listeners<ConfigChange>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Box<dyn KeywordListStore>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_list_event(&self, list: &Arc<KeywordList>, event: &ListEvent) {
        {
            let registry = self.registry();
            let registered = registry
                .get(&event.list)
                .is_some_and(|current| Arc::ptr_eq(&current, list));
            if !registered {
                debug!(list = %event.list, "ignoring event from unregistered list");
                return;
            }
            debug!(list = %event.list, kind = ?event.kind, "keyword list changed");
            save_registry(registry.as_ref());
        }
        self.publish(ConfigChange::KeywordLists(ListsChange::Modified {
            name: event.list.clone(),
        }));
    }

    fn publish(&self, change: ConfigChange) {
        debug!(kind = change.kind().as_str(), "publishing configuration change");
        self.listeners.notify(&change);
    }
}

fn save_registry(registry: &dyn KeywordListStore) {
    if let Err(e) = registry.save() {
        error!(error = %e, "failed to save keyword lists");
    }
}

// ── ConfigController ──────────────────────────────────────────────────────────

/// Coordinates feature settings, keyword lists, and change notification.
pub struct ConfigController {
    settings: FeatureSettings,
    shared: Arc<Shared>,
    ingest: Arc<dyn IngestMonitor>,
    subscriptions: Mutex<HashMap<String, SubscriptionId>>,
}

impl ConfigController {
    /// Reloads the registry from storage and starts observing every list.
    ///
    /// A registry that fails to load is logged and used with whatever it
    /// could recover.
    pub fn new(
        settings: FeatureSettings,
        mut registry: Box<dyn KeywordListStore>,
        ingest: Arc<dyn IngestMonitor>,
    ) -> Self {
        if let Err(e) = registry.reload() {
            error!(error = %e, "failed to load keyword lists");
        }
        let lists = registry.lists();

        let controller = Self {
            settings,
            shared: Arc::new(Shared {
                registry: Mutex::new(registry),
                listeners: Listeners::new(),
            }),
            ingest,
            subscriptions: Mutex::new(HashMap::new()),
        };
        for list in &lists {
            controller.attach(list);
        }
        info!(lists = lists.len(), "configuration controller ready");
        controller
    }

    // ── Observers ─────────────────────────────────────────────────────────────

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ConfigChange) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.listeners.unsubscribe(id)
    }

    // ── Feature settings ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &FeatureSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        self.settings.snapshot()
    }

    pub fn is_skip_known(&self) -> bool {
        self.settings.skip_known()
    }

    pub fn update_frequency(&self) -> UpdateFrequency {
        self.settings.update_frequency()
    }

    pub fn string_extract_scripts(&self) -> Vec<Script> {
        self.settings.string_extract_scripts()
    }

    pub fn is_string_extract_option_set(&self, option: ExtractOption) -> bool {
        self.settings.is_string_extract_option_set(option)
    }

    pub fn set_skip_known(&self, skip: bool) {
        let old = self.settings.set_skip_known(skip);
        if old != skip {
            self.shared
                .publish(ConfigChange::SkipKnown { old, new: skip });
        }
    }

    pub fn set_update_frequency(&self, frequency: UpdateFrequency) {
        let old = self.settings.set_update_frequency(frequency);
        if old != frequency {
            self.shared.publish(ConfigChange::UpdateFrequency {
                old,
                new: frequency,
            });
        }
    }

    pub fn set_string_extract_scripts(&self, scripts: &[Script]) {
        let old = self.settings.set_string_extract_scripts(scripts);
        let new = self.settings.string_extract_scripts();
        if old != new {
            self.shared.publish(ConfigChange::Scripts { old, new });
        }
    }

    /// Enables or disables one extract option.  Unchanged values are a no-op.
    pub fn set_string_extract_option(&self, option: ExtractOption, enabled: bool) {
        let old = self.settings.set_string_extract_option(option, enabled);
        if old != enabled {
            self.shared.publish(ConfigChange::ExtractOption {
                option,
                old,
                new: enabled,
            });
        }
    }

    // ── Keyword list queries ──────────────────────────────────────────────────

    pub fn keyword_list(&self, name: &str) -> Option<Arc<KeywordList>> {
        self.shared.registry().get(name)
    }

    pub fn keyword_lists(&self) -> Vec<Arc<KeywordList>> {
        self.shared.registry().lists()
    }

    /// Only locked (`true`) or only unlocked (`false`) lists.
    pub fn keyword_lists_filtered(&self, locked: bool) -> Vec<Arc<KeywordList>> {
        self.shared.registry().lists_filtered(locked)
    }

    pub fn keyword_list_names(&self) -> Vec<String> {
        self.shared.registry().list_names()
    }

    pub fn list_with_keyword(&self, query: &str) -> Option<Arc<KeywordList>> {
        self.shared.registry().list_with_keyword(query)
    }

    /// Returns `true` when the list exists, is unlocked, and is not in use by
    /// ingest.
    pub fn can_edit_list(&self, name: &str) -> bool {
        self.keyword_list(name)
            .map(|l| !l.is_locked() && !self.ingest.is_list_in_use(name))
            .unwrap_or(false)
    }

    // ── Keyword list mutation ─────────────────────────────────────────────────

    /// Adds `list`, replacing an unlocked list of the same name.
    ///
    /// # Errors
    ///
    /// [`ControllerError::ListInUse`] while ingest uses the name, or
    /// [`ListError::Locked`] when a locked list has the name.
    pub fn add_keyword_list(&self, list: Arc<KeywordList>) -> Result<(), ControllerError> {
        let name = list.name().to_string();
        self.ensure_not_in_use(&name)?;

        let replaced = {
            let mut registry = self.shared.registry();
            let replaced = registry.add_list(Arc::clone(&list))?;
            save_registry(registry.as_ref());
            replaced
        };
        if let Some(old) = replaced {
            self.detach(&old);
        }
        self.attach(&list);

        info!(list = %name, "keyword list added");
        self.shared
            .publish(ConfigChange::KeywordLists(ListsChange::Added { name }));
        Ok(())
    }

    /// Validates `keywords` and adds them as a new unlocked list.
    ///
    /// # Errors
    ///
    /// Any keyword validation error, plus the errors of
    /// [`add_keyword_list`](Self::add_keyword_list).
    pub fn add_keyword_list_with(
        &self,
        name: &str,
        keywords: Vec<Keyword>,
    ) -> Result<Arc<KeywordList>, ControllerError> {
        let list = KeywordList::new(name, Vec::new());
        for keyword in keywords {
            list.add_keyword(keyword)?;
        }
        let list = Arc::new(list);
        self.add_keyword_list(Arc::clone(&list))?;
        Ok(list)
    }

    /// Stops observing, deletes, saves, then notifies with the removed name.
    ///
    /// # Errors
    ///
    /// [`ControllerError::ListNotFound`], [`ControllerError::Locked`], or
    /// [`ControllerError::ListInUse`].
    pub fn remove_keyword_list(&self, name: &str) -> Result<(), ControllerError> {
        let list = self.require_list(name)?;
        if list.is_locked() {
            return Err(ControllerError::Locked(name.to_string()));
        }
        self.ensure_not_in_use(name)?;

        self.detach(&list);
        let deleted = {
            let mut registry = self.shared.registry();
            let deleted = registry.delete_list(name);
            if deleted.is_ok() {
                save_registry(registry.as_ref());
            }
            deleted
        };
        if let Err(e) = deleted {
            self.attach(&list);
            return Err(e.into());
        }

        info!(list = %name, "keyword list removed");
        self.shared
            .publish(ConfigChange::KeywordLists(ListsChange::Removed {
                name: name.to_string(),
            }));
        Ok(())
    }

    /// Adds a copy of `source`'s keywords as a new unlocked list.
    ///
    /// # Errors
    ///
    /// [`ControllerError::ListNotFound`] for an unknown source and
    /// [`ControllerError::ListExists`] when `new_name` is taken.
    pub fn copy_keyword_list(
        &self,
        source: &str,
        new_name: &str,
    ) -> Result<Arc<KeywordList>, ControllerError> {
        let source = self.require_list(source)?;
        if self.keyword_list(new_name).is_some() {
            return Err(ControllerError::ListExists(new_name.to_string()));
        }
        let copy = Arc::new(source.copy_as(new_name));
        self.add_keyword_list(Arc::clone(&copy))?;
        Ok(copy)
    }

    /// Appends a keyword to an editable list.
    pub fn add_keyword(&self, list: &str, keyword: Keyword) -> Result<(), ControllerError> {
        let list = self.editable_list(list)?;
        list.add_keyword(keyword)?;
        Ok(())
    }

    /// Removes a keyword from an editable list.
    pub fn remove_keyword(
        &self,
        list: &str,
        query: &str,
        literal: bool,
    ) -> Result<Keyword, ControllerError> {
        let list = self.editable_list(list)?;
        Ok(list.remove_keyword(query, literal)?)
    }

    /// Sets a list's use-for-ingest flag.  Locked lists are allowed.
    ///
    /// Returns `true` if the flag changed.
    pub fn set_use_for_ingest(&self, list: &str, enabled: bool) -> Result<bool, ControllerError> {
        let list = self.require_list(list)?;
        self.ensure_not_in_use(list.name())?;
        Ok(list.set_use_for_ingest(enabled))
    }

    /// Sets a list's ingest-messages flag.  Locked lists are allowed.
    ///
    /// Returns `true` if the flag changed.
    pub fn set_ingest_messages(&self, list: &str, enabled: bool) -> Result<bool, ControllerError> {
        let list = self.require_list(list)?;
        self.ensure_not_in_use(list.name())?;
        Ok(list.set_ingest_messages(enabled))
    }

    /// Writes one list to `path` in the registry's file format.
    pub fn export_keyword_list(&self, name: &str, path: &Path) -> Result<(), ControllerError> {
        self.require_list(name)?;
        self.shared
            .registry()
            .export_lists(&[name.to_string()], path)?;
        Ok(())
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn require_list(&self, name: &str) -> Result<Arc<KeywordList>, ControllerError> {
        self.keyword_list(name)
            .ok_or_else(|| ControllerError::ListNotFound(name.to_string()))
    }

    fn editable_list(&self, name: &str) -> Result<Arc<KeywordList>, ControllerError> {
        let list = self.require_list(name)?;
        if list.is_locked() {
            return Err(ControllerError::Locked(name.to_string()));
        }
        self.ensure_not_in_use(name)?;
        Ok(list)
    }

    fn ensure_not_in_use(&self, name: &str) -> Result<(), ControllerError> {
        if self.ingest.is_list_in_use(name) {
            Err(ControllerError::ListInUse(name.to_string()))
        } else {
            Ok(())
        }
    }

    fn subscriptions(&self) -> MutexGuard<'_, HashMap<String, SubscriptionId>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, list: &Arc<KeywordList>) {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let observed: Weak<KeywordList> = Arc::downgrade(list);
        let id = list.subscribe(move |event| {
            if let (Some(shared), Some(list)) = (shared.upgrade(), observed.upgrade()) {
                shared.on_list_event(&list, event);
            }
        });
        if let Some(stale) = self.subscriptions().insert(list.name().to_string(), id) {
            list.unsubscribe(stale);
        }
    }

    fn detach(&self, list: &KeywordList) {
        if let Some(id) = self.subscriptions().remove(list.name()) {
            list.unsubscribe(id);
        }
    }
}

impl Drop for ConfigController {
    fn drop(&mut self) {
        let lists = self.shared.registry().lists();
        for list in &lists {
            self.detach(list);
        }
    }
}

impl std::fmt::Debug for ConfigController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigController")
            .field("settings", &self.settings)
            .field("lists", &self.keyword_list_names())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
