//! TOML-backed keyword list registry.
//!
//! All lists for a context live in `keywords-<context>.toml`:
//!
//! ```toml
//! [[lists]]
//! name = "Suspects"
//! locked = false
//! use_for_ingest = true
//! ingest_messages = false
//!
//! [[lists.keywords]]
//! query = "mallory"
//! literal = true
//!
//! [[lists.keywords]]
//! query = "m4ll0ry-[0-9]+"
//! literal = false
//! kind = "TSK_EMAIL"
//! ```
//!
//! A set of locked built-in lists is always present.  They are seeded at load
//! when the file does not mention them; once saved, their ingest flags round
//! trip like any other list's.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kwsearch_core::{Keyword, KeywordList, KeywordType, ListError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::paths::keyword_lists_file_path;
use crate::application::ports::{KeywordListStore, StorageError};

// ── File schema ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct ListsFile {
    #[serde(default)]
    lists: Vec<ListRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ListRecord {
    name: String,
    #[serde(default)]
    locked: bool,
    #[serde(default)]
    use_for_ingest: bool,
    #[serde(default)]
    ingest_messages: bool,
    #[serde(default)]
    keywords: Vec<Keyword>,
}

impl ListRecord {
    fn from_list(list: &KeywordList) -> Self {
        Self {
            name: list.name().to_string(),
            locked: list.is_locked(),
            use_for_ingest: list.use_for_ingest(),
            ingest_messages: list.ingest_messages(),
            keywords: list.keywords(),
        }
    }

    /// Rebuilds the list, dropping keywords a user could not have added.
    fn into_list(self) -> KeywordList {
        let mut keywords: Vec<Keyword> = Vec::with_capacity(self.keywords.len());
        for stored in self.keywords {
            let keyword = Keyword::new(stored.query(), stored.is_literal(), stored.kind());
            if let Err(e) = keyword.validate() {
                warn!(list = %self.name, error = %e, "dropping invalid keyword");
                continue;
            }
            if keywords.iter().any(|k| k.is_duplicate_of(&keyword)) {
                warn!(list = %self.name, query = keyword.query(), "dropping duplicate keyword");
                continue;
            }
            keywords.push(keyword);
        }
        KeywordList::with_flags(
            self.name,
            keywords,
            self.locked,
            self.use_for_ingest,
            self.ingest_messages,
        )
    }
}

// ── Built-in lists ────────────────────────────────────────────────────────────

const BUILT_IN_LISTS: &[(&str, &str, KeywordType)] = &[
    (
        "Phone Numbers",
        r"(\([0-9]{3}\)|[0-9]{3})[ .-]?[0-9]{3}[ .-]?[0-9]{4}",
        KeywordType::PhoneNumber,
    ),
    (
        "IP Addresses",
        r"((25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])",
        KeywordType::IpAddress,
    ),
    (
        "Email Addresses",
        r"(?i)[a-z0-9%+_-]+(\.[a-z0-9%+_-]+)*@[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,}",
        KeywordType::Email,
    ),
    (
        "URLs",
        r"(?i)(https?|ftp)://([a-z0-9-]+\.)+[a-z]{2,}(:[0-9]+)?(/[^\s]*)?",
        KeywordType::Url,
    ),
    (
        "Credit Card Numbers",
        r"[1-9][0-9]{3}[ -]?[0-9]{4}[ -]?[0-9]{4}[ -]?[0-9]{4}",
        KeywordType::CardNumber,
    ),
];

/// Names of the locked lists every registry starts with.
pub fn built_in_list_names() -> impl Iterator<Item = &'static str> {
    BUILT_IN_LISTS.iter().map(|(name, _, _)| *name)
}

fn built_in_lists() -> Vec<KeywordList> {
    BUILT_IN_LISTS
        .iter()
        .map(|(name, pattern, kind)| {
            KeywordList::with_flags(
                *name,
                vec![Keyword::regex(*pattern).with_kind(*kind)],
                true,
                false,
                false,
            )
        })
        .collect()
}

// ── TomlKeywordListStore ──────────────────────────────────────────────────────

/// Keyword list registry persisted to one TOML file.
#[derive(Debug)]
pub struct TomlKeywordListStore {
    path: PathBuf,
    lists: Vec<Arc<KeywordList>>,
}

impl TomlKeywordListStore {
    /// Creates an empty registry for `<dir>/keywords-<context>.toml`.
    ///
    /// Call [`load`](KeywordListStore::load) or
    /// [`reload`](KeywordListStore::reload) to read the file.
    pub fn new(dir: &Path, context: &str) -> Self {
        Self::at_path(keyword_lists_file_path(dir, context))
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lists: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.lists.iter().position(|l| l.name() == name)
    }

    fn seed_built_ins(&mut self) {
        for list in built_in_lists() {
            if self.position(list.name()).is_none() {
                self.lists.push(Arc::new(list));
            }
        }
    }

    fn read_file(&self) -> Result<Vec<KeywordList>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no keyword lists file yet");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: ListsFile = toml::from_str(&content).map_err(|source| StorageError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(file.lists.into_iter().map(ListRecord::into_list).collect())
    }

    /// Replaces or appends without the locked check.
    fn upsert(&mut self, list: Arc<KeywordList>) -> Option<Arc<KeywordList>> {
        match self.position(list.name()) {
            Some(index) => Some(std::mem::replace(&mut self.lists[index], list)),
            None => {
                self.lists.push(list);
                None
            }
        }
    }
}

fn write_lists(path: &Path, lists: &[Arc<KeywordList>]) -> Result<(), StorageError> {
    let file = ListsFile {
        lists: lists.iter().map(|l| ListRecord::from_list(l)).collect(),
    };
    let content = toml::to_string_pretty(&file)?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl KeywordListStore for TomlKeywordListStore {
    fn load(&mut self) -> Result<(), StorageError> {
        let loaded = self.read_file();
        self.seed_built_ins();
        let loaded = loaded?;
        let count = loaded.len();
        for list in loaded {
            self.upsert(Arc::new(list));
        }
        info!(path = %self.path.display(), count, "loaded keyword lists");
        Ok(())
    }

    fn reload(&mut self) -> Result<(), StorageError> {
        self.lists.clear();
        self.load()
    }

    fn save(&self) -> Result<(), StorageError> {
        write_lists(&self.path, &self.lists)?;
        debug!(path = %self.path.display(), count = self.lists.len(), "saved keyword lists");
        Ok(())
    }

    fn lists(&self) -> Vec<Arc<KeywordList>> {
        self.lists.clone()
    }

    fn lists_filtered(&self, locked: bool) -> Vec<Arc<KeywordList>> {
        self.lists
            .iter()
            .filter(|l| l.is_locked() == locked)
            .cloned()
            .collect()
    }

    fn get(&self, name: &str) -> Option<Arc<KeywordList>> {
        self.position(name).map(|i| Arc::clone(&self.lists[i]))
    }

    fn list_with_keyword(&self, query: &str) -> Option<Arc<KeywordList>> {
        self.lists.iter().find(|l| l.contains_query(query)).cloned()
    }

    fn add_list(&mut self, list: Arc<KeywordList>) -> Result<Option<Arc<KeywordList>>, ListError> {
        if let Some(existing) = self.get(list.name()) {
            if existing.is_locked() {
                return Err(ListError::Locked(existing.name().to_string()));
            }
        }
        Ok(self.upsert(list))
    }

    fn delete_list(&mut self, name: &str) -> Result<Arc<KeywordList>, ListError> {
        let index = self
            .position(name)
            .ok_or_else(|| ListError::ListNotFound(name.to_string()))?;
        if self.lists[index].is_locked() {
            return Err(ListError::Locked(name.to_string()));
        }
        Ok(self.lists.remove(index))
    }

    fn export_lists(&self, names: &[String], path: &Path) -> Result<(), StorageError> {
        let selected = names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| StorageError::UnknownList(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        write_lists(path, &selected)?;
        info!(path = %path.display(), count = selected.len(), "exported keyword lists");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("kwsearch_lists_{}", Uuid::new_v4()))
    }

    #[test]
    fn test_built_in_patterns_compile() {
        for list in built_in_lists() {
            for keyword in list.keywords() {
                assert!(keyword.validate().is_ok(), "{} has a bad pattern", list.name());
            }
            assert!(list.is_locked());
        }
    }

    #[test]
    fn test_load_without_file_seeds_only_built_ins() {
        // Arrange
        let dir = temp_dir();
        let mut store = TomlKeywordListStore::new(&dir, "General");

        // Act
        store.load().unwrap();

        // Assert
        let names = store.list_names();
        let expected: Vec<String> = built_in_list_names().map(String::from).collect();
        assert_eq!(names, expected);
        assert!(store.lists_filtered(false).is_empty());
    }

    #[test]
    fn test_save_and_reload_round_trip_preserves_lists_and_flags() {
        // Arrange
        let dir = temp_dir();
        let mut store = TomlKeywordListStore::new(&dir, "General");
        store.load().unwrap();
        let list = store
            .add_list_with(
                "Suspects",
                vec![
                    Keyword::literal("mallory"),
                    Keyword::regex("m4ll0ry-[0-9]+").with_kind(KeywordType::Email),
                ],
            )
            .unwrap();
        list.set_use_for_ingest(true);
        store.get("URLs").unwrap().set_ingest_messages(true);

        // Act
        store.save().unwrap();
        let mut reloaded = TomlKeywordListStore::new(&dir, "General");
        reloaded.reload().unwrap();

        // Assert
        let suspects = reloaded.get("Suspects").expect("list must survive reload");
        assert_eq!(suspects.keywords(), list.keywords());
        assert!(suspects.use_for_ingest());
        assert!(!suspects.is_locked());
        assert!(reloaded.get("URLs").unwrap().ingest_messages());
        assert_eq!(reloaded.list_names(), store.list_names());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_add_list_replaces_unlocked_list_in_place() {
        let mut store = TomlKeywordListStore::at_path(temp_dir().join("k.toml"));
        store.add_list_with("a", vec![]).unwrap();
        store.add_list_with("b", vec![]).unwrap();

        let replaced = store
            .add_list(Arc::new(KeywordList::new("a", vec![Keyword::literal("x")])))
            .unwrap();

        assert!(replaced.is_some());
        assert_eq!(store.list_names(), vec!["a", "b"]);
        assert_eq!(store.get("a").unwrap().len(), 1);
    }

    #[test]
    fn test_add_list_refuses_to_replace_locked_list() {
        let mut store = TomlKeywordListStore::at_path(temp_dir().join("k.toml"));
        store.load().unwrap();

        let result = store.add_list_with("URLs", vec![]);

        assert_eq!(result.unwrap_err(), ListError::Locked("URLs".to_string()));
        assert!(store.get("URLs").unwrap().is_locked());
    }

    #[test]
    fn test_delete_list_refuses_locked_and_unknown() {
        let mut store = TomlKeywordListStore::at_path(temp_dir().join("k.toml"));
        store.load().unwrap();
        store.add_list_with("mine", vec![]).unwrap();

        assert_eq!(
            store.delete_list("URLs").unwrap_err(),
            ListError::Locked("URLs".to_string())
        );
        assert_eq!(
            store.delete_list("nope").unwrap_err(),
            ListError::ListNotFound("nope".to_string())
        );
        assert_eq!(store.delete_list("mine").unwrap().name(), "mine");
        assert!(store.get("mine").is_none());
    }

    #[test]
    fn test_list_with_keyword_finds_first_holder() {
        let mut store = TomlKeywordListStore::at_path(temp_dir().join("k.toml"));
        store
            .add_list_with("first", vec![Keyword::literal("alpha")])
            .unwrap();
        store
            .add_list_with("second", vec![Keyword::regex("alpha")])
            .unwrap();

        assert_eq!(store.list_with_keyword("alpha").unwrap().name(), "first");
        assert!(store.list_with_keyword("beta").is_none());
    }

    #[test]
    fn test_malformed_file_reports_parse_error_and_keeps_built_ins() {
        // Arrange
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = keyword_lists_file_path(&dir, "General");
        std::fs::write(&path, "[[[ not valid toml").unwrap();
        let mut store = TomlKeywordListStore::new(&dir, "General");

        // Act
        let result = store.reload();

        // Assert
        assert!(matches!(result, Err(StorageError::Parse { .. })));
        assert_eq!(store.lists().len(), BUILT_IN_LISTS.len());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_writes_only_named_lists() {
        let dir = temp_dir();
        let mut store = TomlKeywordListStore::new(&dir, "General");
        store.add_list_with("a", vec![Keyword::literal("x")]).unwrap();
        store.add_list_with("b", vec![]).unwrap();
        let out = dir.join("export.toml");

        store.export_lists(&["a".to_string()], &out).unwrap();

        let mut imported = TomlKeywordListStore::at_path(&out);
        imported.load().unwrap();
        assert!(imported.get("a").is_some());
        assert!(imported.get("b").is_none());
        assert!(matches!(
            store.export_lists(&["zzz".to_string()], &out),
            Err(StorageError::UnknownList(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_serialized_file_omits_kind_for_literal_keywords() {
        let dir = temp_dir();
        let mut store = TomlKeywordListStore::new(&dir, "General");
        store.add_list_with("a", vec![Keyword::literal("x")]).unwrap();

        store.save().unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("[[lists.keywords]]"), "got:\n{text}");
        assert!(!text.contains("kind"), "literal keyword must not carry a kind");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_hand_edited_file_drops_keywords_that_could_not_be_added() {
        // Arrange
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let mut store = TomlKeywordListStore::new(&dir, "General");
        std::fs::write(
            store.path(),
            r#"
[[lists]]
name = "Edited"

[[lists.keywords]]
query = "alice"
literal = true
kind = "TSK_EMAIL"

[[lists.keywords]]
query = "alice"
literal = true

[[lists.keywords]]
query = "(unclosed"
literal = false

[[lists.keywords]]
query = "   "
literal = true

[[lists.keywords]]
query = "alice"
literal = false
"#,
        )
        .unwrap();

        // Act
        store.load().unwrap();

        // Assert
        let edited = store.get("Edited").expect("list must load");
        assert_eq!(
            edited.keywords(),
            vec![Keyword::literal("alice"), Keyword::regex("alice")]
        );
        assert_eq!(edited.keywords()[0].kind(), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
