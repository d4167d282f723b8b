//! Typed keyword search settings over three key/value stores.
//!
//! | Store module             | Keys                                          |
//! |--------------------------|-----------------------------------------------|
//! | `KeywordSearch_Options`  | `UpdateFrequency`, one key per extract option |
//! | `KeywordSearch_NSRL`     | `SkipKnown`                                   |
//! | `KeywordSearch_Scripts`  | one `true`/`false` key per script             |
//!
//! On construction every tracked value is read.  An absent value is replaced
//! by its default, which is written back so the files document themselves
//! after the first run.  A value that is present but does not parse is
//! reported as [`SettingsError::InvalidValue`]; the default is used in memory
//! and the bad text is left on disk.
//!
//! Setters write through to the store before updating memory.  A store that
//! cannot persist logs the failure and memory is updated anyway.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kwsearch_core::{ExtractOption, Script, UpdateFrequency};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::ports::{KeyValueStore, SettingsProvider};

pub const OPTIONS_MODULE: &str = "KeywordSearch_Options";
pub const NSRL_MODULE: &str = "KeywordSearch_NSRL";
pub const SCRIPTS_MODULE: &str = "KeywordSearch_Scripts";

pub const SKIP_KNOWN_KEY: &str = "SkipKnown";
pub const UPDATE_FREQUENCY_KEY: &str = "UpdateFrequency";

const DEFAULT_SKIP_KNOWN: bool = true;
const DEFAULT_SCRIPT: Script = Script::Latin1;

/// A stored value that does not parse as its expected type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("invalid configuration value {value:?} for key {key:?}")]
    InvalidValue { key: String, value: String },
}

/// Point-in-time copy of every typed setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsSnapshot {
    pub skip_known: bool,
    pub update_frequency: UpdateFrequency,
    /// Enabled scripts in declaration order.
    pub scripts: Vec<Script>,
    pub extract_options: BTreeSet<ExtractOption>,
}

/// Typed, write-through facade over the keyword search settings files.
pub struct FeatureSettings {
    options: Arc<dyn KeyValueStore>,
    nsrl: Arc<dyn KeyValueStore>,
    scripts: Arc<dyn KeyValueStore>,
    state: RwLock<SettingsSnapshot>,
    problems: Vec<SettingsError>,
}

impl FeatureSettings {
    /// Opens the three stores for `context` and applies defaults.
    pub fn new(provider: &dyn SettingsProvider, context: &str) -> Self {
        Self::with_stores(
            provider.store(OPTIONS_MODULE, context),
            provider.store(NSRL_MODULE, context),
            provider.store(SCRIPTS_MODULE, context),
        )
    }

    /// Builds the settings from explicit stores and applies defaults.
    pub fn with_stores(
        options: Arc<dyn KeyValueStore>,
        nsrl: Arc<dyn KeyValueStore>,
        scripts: Arc<dyn KeyValueStore>,
    ) -> Self {
        let mut problems = Vec::new();
        let snapshot = SettingsSnapshot {
            skip_known: load_skip_known(nsrl.as_ref(), &mut problems),
            update_frequency: load_update_frequency(options.as_ref(), &mut problems),
            scripts: load_scripts(scripts.as_ref(), &mut problems),
            extract_options: load_extract_options(options.as_ref(), &mut problems),
        };
        for problem in &problems {
            warn!(error = %problem, "using default for invalid configuration value");
        }
        debug!(?snapshot, "keyword search settings loaded");

        Self {
            options,
            nsrl,
            scripts,
            state: RwLock::new(snapshot),
            problems,
        }
    }

    /// Invalid values found while loading.
    pub fn problems(&self) -> &[SettingsError] {
        &self.problems
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        self.read().clone()
    }

    pub fn skip_known(&self) -> bool {
        self.read().skip_known
    }

    pub fn update_frequency(&self) -> UpdateFrequency {
        self.read().update_frequency
    }

    /// Copy of the enabled scripts.
    pub fn string_extract_scripts(&self) -> Vec<Script> {
        self.read().scripts.clone()
    }

    /// Copy of the enabled extract options.
    pub fn string_extract_options(&self) -> BTreeSet<ExtractOption> {
        self.read().extract_options.clone()
    }

    pub fn is_string_extract_option_set(&self, option: ExtractOption) -> bool {
        self.read().extract_options.contains(&option)
    }

    /// Extract options as `name -> "true"/"false"` for every option.
    pub fn string_extract_options_map(&self) -> BTreeMap<String, String> {
        let state = self.read();
        ExtractOption::ALL
            .iter()
            .map(|o| {
                (
                    o.name().to_string(),
                    state.extract_options.contains(o).to_string(),
                )
            })
            .collect()
    }

    /// Persists and applies `skip`.  Returns the previous value.
    pub fn set_skip_known(&self, skip: bool) -> bool {
        let mut state = self.write();
        self.nsrl.set(SKIP_KNOWN_KEY, &skip.to_string());
        std::mem::replace(&mut state.skip_known, skip)
    }

    /// Persists and applies `frequency`.  Returns the previous value.
    pub fn set_update_frequency(&self, frequency: UpdateFrequency) -> UpdateFrequency {
        let mut state = self.write();
        self.options.set(UPDATE_FREQUENCY_KEY, frequency.name());
        std::mem::replace(&mut state.update_frequency, frequency)
    }

    /// Replaces the enabled script set.  Returns the previous set.
    ///
    /// Every stored script key outside the new set is written `false` rather
    /// than removed, and every script in the new set is written `true`, in a
    /// single store write.  Keys that name no known script are left as they
    /// are.
    pub fn set_string_extract_scripts(&self, scripts: &[Script]) -> Vec<Script> {
        let enabled: BTreeSet<Script> = scripts.iter().copied().collect();
        let mut state = self.write();

        let mut updates: BTreeMap<String, String> = self
            .scripts
            .get_all()
            .into_keys()
            .filter(|key| key.parse::<Script>().is_ok())
            .chain(state.scripts.iter().map(|s| s.name().to_string()))
            .map(|key| (key, false.to_string()))
            .collect();
        for script in &enabled {
            updates.insert(script.name().to_string(), true.to_string());
        }
        self.scripts.set_all(&updates);

        std::mem::replace(&mut state.scripts, enabled.into_iter().collect())
    }

    /// Enables or disables one extract option.  Returns the previous value.
    ///
    /// Nothing is written when the option already has this value.
    pub fn set_string_extract_option(&self, option: ExtractOption, enabled: bool) -> bool {
        let mut state = self.write();
        let was_enabled = state.extract_options.contains(&option);
        if was_enabled == enabled {
            return was_enabled;
        }
        self.options.set(option.name(), &enabled.to_string());
        if enabled {
            state.extract_options.insert(option);
        } else {
            state.extract_options.remove(&option);
        }
        was_enabled
    }

    fn read(&self) -> RwLockReadGuard<'_, SettingsSnapshot> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SettingsSnapshot> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for FeatureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureSettings")
            .field("state", &*self.read())
            .field("problems", &self.problems)
            .finish()
    }
}

// ── Defaulting ────────────────────────────────────────────────────────────────

/// Parses `true`/`false`, ignoring ASCII case.
fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn invalid(key: &str, value: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn load_skip_known(store: &dyn KeyValueStore, problems: &mut Vec<SettingsError>) -> bool {
    match store.get(SKIP_KNOWN_KEY) {
        None => {
            store.set(SKIP_KNOWN_KEY, &DEFAULT_SKIP_KNOWN.to_string());
            DEFAULT_SKIP_KNOWN
        }
        Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
            problems.push(invalid(SKIP_KNOWN_KEY, &raw));
            DEFAULT_SKIP_KNOWN
        }),
    }
}

fn load_update_frequency(
    store: &dyn KeyValueStore,
    problems: &mut Vec<SettingsError>,
) -> UpdateFrequency {
    match store.get(UPDATE_FREQUENCY_KEY) {
        None => {
            let frequency = UpdateFrequency::default();
            store.set(UPDATE_FREQUENCY_KEY, frequency.name());
            frequency
        }
        Some(raw) => UpdateFrequency::from_str(&raw).unwrap_or_else(|_| {
            problems.push(invalid(UPDATE_FREQUENCY_KEY, &raw));
            UpdateFrequency::default()
        }),
    }
}

fn load_scripts(store: &dyn KeyValueStore, problems: &mut Vec<SettingsError>) -> Vec<Script> {
    let stored = store.get_all();
    if stored.is_empty() {
        let mut defaults = BTreeMap::new();
        defaults.insert(DEFAULT_SCRIPT.name().to_string(), true.to_string());
        store.set_all(&defaults);
        return vec![DEFAULT_SCRIPT];
    }

    let mut enabled = BTreeSet::new();
    for (key, raw) in &stored {
        let Ok(script) = Script::from_str(key) else {
            problems.push(invalid(key, raw));
            continue;
        };
        match parse_bool(raw) {
            Some(true) => {
                enabled.insert(script);
            }
            Some(false) => {}
            None => problems.push(invalid(key, raw)),
        }
    }
    enabled.into_iter().collect()
}

fn load_extract_options(
    store: &dyn KeyValueStore,
    problems: &mut Vec<SettingsError>,
) -> BTreeSet<ExtractOption> {
    let mut enabled = BTreeSet::new();
    let mut missing = BTreeMap::new();
    for option in ExtractOption::ALL {
        match store.get(option.name()) {
            None => {
                missing.insert(option.name().to_string(), false.to_string());
            }
            Some(raw) => match parse_bool(&raw) {
                Some(true) => {
                    enabled.insert(*option);
                }
                Some(false) => {}
                None => problems.push(invalid(option.name(), &raw)),
            },
        }
    }
    if !missing.is_empty() {
        store.set_all(&missing);
    }
    enabled
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store that counts writes.
    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<BTreeMap<String, String>>,
        writes: Mutex<usize>,
    }

    impl MemoryStore {
        fn with(pairs: &[(&str, &str)]) -> Arc<Self> {
            let store = Self::default();
            {
                let mut entries = store.entries.lock().unwrap();
                for (k, v) in pairs {
                    entries.insert(k.to_string(), v.to_string());
                }
            }
            Arc::new(store)
        }

        fn raw(&self, key: &str) -> Option<String> {
            self.entries.lock().unwrap().get(key).cloned()
        }

        fn write_count(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.raw(key)
        }
        fn get_all(&self) -> BTreeMap<String, String> {
            self.entries.lock().unwrap().clone()
        }
        fn set(&self, key: &str, value: &str) {
            *self.writes.lock().unwrap() += 1;
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }
        fn set_all(&self, entries: &BTreeMap<String, String>) {
            *self.writes.lock().unwrap() += 1;
            self.entries
                .lock()
                .unwrap()
                .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        fn remove(&self, key: &str) {
            *self.writes.lock().unwrap() += 1;
            self.entries.lock().unwrap().remove(key);
        }
    }

    struct Stores {
        options: Arc<MemoryStore>,
        nsrl: Arc<MemoryStore>,
        scripts: Arc<MemoryStore>,
    }

    impl Stores {
        fn empty() -> Self {
            Self {
                options: MemoryStore::with(&[]),
                nsrl: MemoryStore::with(&[]),
                scripts: MemoryStore::with(&[]),
            }
        }

        fn settings(&self) -> FeatureSettings {
            FeatureSettings::with_stores(
                self.options.clone(),
                self.nsrl.clone(),
                self.scripts.clone(),
            )
        }
    }

    #[test]
    fn test_defaults_are_applied_and_persisted_on_empty_stores() {
        // Arrange
        let stores = Stores::empty();

        // Act
        let settings = stores.settings();

        // Assert
        assert!(settings.skip_known());
        assert_eq!(settings.update_frequency(), UpdateFrequency::Avg);
        assert_eq!(settings.string_extract_scripts(), vec![Script::Latin1]);
        assert!(settings.string_extract_options().is_empty());
        assert!(settings.problems().is_empty());

        assert_eq!(stores.nsrl.raw("SkipKnown").as_deref(), Some("true"));
        assert_eq!(stores.options.raw("UpdateFrequency").as_deref(), Some("AVG"));
        assert_eq!(stores.scripts.raw("LATIN_1").as_deref(), Some("true"));
        assert_eq!(stores.options.raw("EXTRACT_UTF8").as_deref(), Some("false"));
        assert_eq!(stores.options.raw("EXTRACT_UTF16").as_deref(), Some("false"));
    }

    #[test]
    fn test_existing_values_are_loaded_without_rewrite() {
        let stores = Stores {
            options: MemoryStore::with(&[
                ("UpdateFrequency", "FAST"),
                ("EXTRACT_UTF8", "true"),
                ("EXTRACT_UTF16", "false"),
            ]),
            nsrl: MemoryStore::with(&[("SkipKnown", "false")]),
            scripts: MemoryStore::with(&[("GREEK", "true"), ("LATIN_1", "false")]),
        };

        let settings = stores.settings();

        assert!(!settings.skip_known());
        assert_eq!(settings.update_frequency(), UpdateFrequency::Fast);
        assert_eq!(settings.string_extract_scripts(), vec![Script::Greek]);
        assert!(settings.is_string_extract_option_set(ExtractOption::ExtractUtf8));
        assert!(!settings.is_string_extract_option_set(ExtractOption::ExtractUtf16));
        assert_eq!(stores.options.write_count(), 0);
        assert_eq!(stores.nsrl.write_count(), 0);
        assert_eq!(stores.scripts.write_count(), 0);
    }

    #[test]
    fn test_invalid_values_are_reported_defaulted_and_left_on_disk() {
        // Arrange
        let stores = Stores {
            options: MemoryStore::with(&[
                ("UpdateFrequency", "HOURLY"),
                ("EXTRACT_UTF8", "yes"),
                ("EXTRACT_UTF16", "false"),
            ]),
            nsrl: MemoryStore::with(&[("SkipKnown", "maybe")]),
            scripts: MemoryStore::with(&[("KLINGON", "true"), ("HAN", "true")]),
        };

        // Act
        let settings = stores.settings();

        // Assert
        assert!(settings.skip_known());
        assert_eq!(settings.update_frequency(), UpdateFrequency::Avg);
        assert_eq!(settings.string_extract_scripts(), vec![Script::Han]);
        assert!(settings.string_extract_options().is_empty());
        assert_eq!(settings.problems().len(), 4);
        assert!(settings.problems().contains(&SettingsError::InvalidValue {
            key: "UpdateFrequency".to_string(),
            value: "HOURLY".to_string(),
        }));
        assert_eq!(stores.options.raw("UpdateFrequency").as_deref(), Some("HOURLY"));
        assert_eq!(stores.nsrl.raw("SkipKnown").as_deref(), Some("maybe"));
    }

    #[test]
    fn test_set_scripts_writes_false_for_dropped_and_true_for_new() {
        // Arrange: A and B enabled.
        let stores = Stores {
            scripts: MemoryStore::with(&[("ARABIC", "true"), ("GREEK", "true")]),
            ..Stores::empty()
        };
        let settings = stores.settings();

        // Act: switch to B and C.
        let old = settings.set_string_extract_scripts(&[Script::Greek, Script::Han]);

        // Assert
        assert_eq!(old, vec![Script::Greek, Script::Arabic]);
        assert_eq!(stores.scripts.raw("ARABIC").as_deref(), Some("false"));
        assert_eq!(stores.scripts.raw("GREEK").as_deref(), Some("true"));
        assert_eq!(stores.scripts.raw("HAN").as_deref(), Some("true"));
        assert_eq!(
            settings.string_extract_scripts(),
            vec![Script::Greek, Script::Han]
        );
        assert_eq!(stores.scripts.write_count(), 1, "one batch write expected");
    }

    #[test]
    fn test_set_scripts_leaves_unknown_script_keys_untouched() {
        let stores = Stores {
            scripts: MemoryStore::with(&[("KLINGON", "true"), ("HAN", "true")]),
            ..Stores::empty()
        };
        let settings = stores.settings();

        settings.set_string_extract_scripts(&[Script::Greek]);

        assert_eq!(stores.scripts.raw("KLINGON").as_deref(), Some("true"));
        assert_eq!(stores.scripts.raw("HAN").as_deref(), Some("false"));
        assert_eq!(settings.string_extract_scripts(), vec![Script::Greek]);
    }

    #[test]
    fn test_set_extract_option_writes_only_on_change() {
        let stores = Stores::empty();
        let settings = stores.settings();
        let writes_before = stores.options.write_count();

        assert!(!settings.set_string_extract_option(ExtractOption::ExtractUtf16, false));
        assert_eq!(stores.options.write_count(), writes_before);

        assert!(!settings.set_string_extract_option(ExtractOption::ExtractUtf16, true));
        assert_eq!(stores.options.raw("EXTRACT_UTF16").as_deref(), Some("true"));
        assert_eq!(
            settings.string_extract_options_map()["EXTRACT_UTF16"],
            "true"
        );
    }

    #[test]
    fn test_setters_return_previous_value_and_write_through() {
        let stores = Stores::empty();
        let settings = stores.settings();

        assert!(settings.set_skip_known(false));
        assert_eq!(
            settings.set_update_frequency(UpdateFrequency::Never),
            UpdateFrequency::Avg
        );

        assert_eq!(stores.nsrl.raw("SkipKnown").as_deref(), Some("false"));
        assert_eq!(stores.options.raw("UpdateFrequency").as_deref(), Some("NONE"));
        assert_eq!(
            settings.snapshot(),
            SettingsSnapshot {
                skip_known: false,
                update_frequency: UpdateFrequency::Never,
                scripts: vec![Script::Latin1],
                extract_options: BTreeSet::new(),
            }
        );
    }

    #[test]
    fn test_returned_collections_are_copies() {
        let settings = Stores::empty().settings();

        let mut scripts = settings.string_extract_scripts();
        scripts.push(Script::Han);

        assert_eq!(settings.string_extract_scripts(), vec![Script::Latin1]);
    }
}
