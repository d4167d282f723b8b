//! Keywords and keyword lists.
//!
//! A [`KeywordList`] is a named, ordered collection of [`Keyword`]s plus two
//! ingest flags.  Lists are shared as `Arc<KeywordList>` between the registry
//! that persists them and whoever edits them, so all state sits behind an
//! internal lock and every successful mutation is published to the list's own
//! listeners as a [`ListEvent`].
//!
//! # Locked lists
//!
//! Built-in lists are *locked*: their keywords cannot be added, removed or
//! replaced.  Their ingest flags can still be toggled, because choosing which
//! built-in lists run during ingest is a normal user action.
//!
//! # Keyword equality
//!
//! Two keywords are duplicates when their query text is identical **and**
//! they are of the same kind (both literal or both regex).  A literal `a.b`
//! and a regex `a.b` match different things and may live in the same list.
//! The optional [`KeywordType`] tag never participates in the comparison.

use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::observer::{Listeners, SubscriptionId};
use super::options::named_enum;

named_enum! {
    /// Semantic tag attached to regex keywords so matches can be classified.
    pub enum KeywordType {
        Email => "TSK_EMAIL",
        Url => "TSK_URL",
        IpAddress => "TSK_IP_ADDRESS",
        PhoneNumber => "TSK_PHONE_NUMBER",
        CardNumber => "TSK_CARD_NUMBER",
    }
}

/// Errors raised when editing a keyword list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListError {
    /// The list is built-in and its keywords cannot change.
    #[error("keyword list {0:?} is locked")]
    Locked(String),

    /// The keyword query is empty after trimming.
    #[error("keyword query is empty")]
    EmptyQuery,

    /// An equivalent keyword is already in the list.
    #[error("keyword {0:?} already exists in the list")]
    Duplicate(String),

    /// A regex keyword does not compile.
    #[error("invalid keyword pattern {query:?}: {reason}")]
    InvalidPattern { query: String, reason: String },

    /// No matching keyword exists in the list.
    #[error("keyword {0:?} not found in the list")]
    KeywordNotFound(String),

    /// No list with this name exists in the registry.
    #[error("keyword list {0:?} not found")]
    ListNotFound(String),
}

/// A single search pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    query: String,
    literal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<KeywordType>,
}

impl Keyword {
    /// A keyword matched as exact text.
    pub fn literal(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            literal: true,
            kind: None,
        }
    }

    /// A keyword matched as a regular expression.
    pub fn regex(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            literal: false,
            kind: None,
        }
    }

    /// Builds a keyword from its parts.  Literal keywords never keep a type tag.
    pub fn new(query: impl Into<String>, literal: bool, kind: Option<KeywordType>) -> Self {
        Self {
            query: query.into(),
            literal,
            kind: if literal { None } else { kind },
        }
    }

    /// Tags a regex keyword with `kind`.  Ignored for literal keywords.
    pub fn with_kind(mut self, kind: KeywordType) -> Self {
        if !self.literal {
            self.kind = Some(kind);
        }
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_literal(&self) -> bool {
        self.literal
    }

    pub fn kind(&self) -> Option<KeywordType> {
        self.kind
    }

    /// Returns `true` when `other` would be rejected as a duplicate of `self`.
    pub fn is_duplicate_of(&self, other: &Keyword) -> bool {
        self.query == other.query && self.literal == other.literal
    }

    /// Checks that the keyword can be searched for.
    ///
    /// # Errors
    ///
    /// [`ListError::EmptyQuery`] for blank queries and
    /// [`ListError::InvalidPattern`] for regex keywords that do not compile.
    pub fn validate(&self) -> Result<(), ListError> {
        if self.query.trim().is_empty() {
            return Err(ListError::EmptyQuery);
        }
        if !self.literal {
            regex::Regex::new(&self.query).map_err(|e| ListError::InvalidPattern {
                query: self.query.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// What changed in a keyword list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEventKind {
    KeywordAdded(Keyword),
    KeywordRemoved(Keyword),
    KeywordsReplaced,
    UseForIngest(bool),
    IngestMessages(bool),
}

/// Notification published by a [`KeywordList`] after each successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEvent {
    /// Name of the list that changed.
    pub list: String,
    pub kind: ListEventKind,
}

#[derive(Debug, Clone)]
struct ListState {
    keywords: Vec<Keyword>,
    use_for_ingest: bool,
    ingest_messages: bool,
}

/// A named, ordered, observable keyword list.
pub struct KeywordList {
    name: String,
    locked: bool,
    state: RwLock<ListState>,
    listeners: Listeners<ListEvent>,
}

impl KeywordList {
    /// Creates an unlocked list with both ingest flags cleared.
    pub fn new(name: impl Into<String>, keywords: Vec<Keyword>) -> Self {
        Self::with_flags(name, keywords, false, false, false)
    }

    /// Creates a list with every flag spelled out.
    pub fn with_flags(
        name: impl Into<String>,
        keywords: Vec<Keyword>,
        locked: bool,
        use_for_ingest: bool,
        ingest_messages: bool,
    ) -> Self {
        Self {
            name: name.into(),
            locked,
            state: RwLock::new(ListState {
                keywords,
                use_for_ingest,
                ingest_messages,
            }),
            listeners: Listeners::new(),
        }
    }

    /// Returns an unlocked copy of this list's keywords under `new_name`.
    ///
    /// Listeners and ingest flags are not copied.
    pub fn copy_as(&self, new_name: impl Into<String>) -> Self {
        Self::new(new_name, self.keywords())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Snapshot of the keywords in list order.
    pub fn keywords(&self) -> Vec<Keyword> {
        self.read().keywords.clone()
    }

    pub fn len(&self) -> usize {
        self.read().keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn use_for_ingest(&self) -> bool {
        self.read().use_for_ingest
    }

    pub fn ingest_messages(&self) -> bool {
        self.read().ingest_messages
    }

    /// Returns `true` if a duplicate of `keyword` is already in the list.
    pub fn has_keyword(&self, keyword: &Keyword) -> bool {
        self.read().keywords.iter().any(|k| k.is_duplicate_of(keyword))
    }

    /// Returns `true` if any keyword, literal or regex, has this query text.
    pub fn contains_query(&self, query: &str) -> bool {
        self.read().keywords.iter().any(|k| k.query == query)
    }

    /// Appends a validated keyword.
    ///
    /// # Errors
    ///
    /// [`ListError::Locked`], [`ListError::Duplicate`], or any error from
    /// [`Keyword::validate`].
    pub fn add_keyword(&self, keyword: Keyword) -> Result<(), ListError> {
        self.ensure_unlocked()?;
        keyword.validate()?;
        {
            let mut state = self.write();
            if state.keywords.iter().any(|k| k.is_duplicate_of(&keyword)) {
                return Err(ListError::Duplicate(keyword.query));
            }
            state.keywords.push(keyword.clone());
        }
        self.publish(ListEventKind::KeywordAdded(keyword));
        Ok(())
    }

    /// Removes the keyword with this query text and kind.
    ///
    /// # Errors
    ///
    /// [`ListError::Locked`] or [`ListError::KeywordNotFound`].
    pub fn remove_keyword(&self, query: &str, literal: bool) -> Result<Keyword, ListError> {
        self.ensure_unlocked()?;
        let removed = {
            let mut state = self.write();
            let position = state
                .keywords
                .iter()
                .position(|k| k.query == query && k.literal == literal)
                .ok_or_else(|| ListError::KeywordNotFound(query.to_string()))?;
            state.keywords.remove(position)
        };
        self.publish(ListEventKind::KeywordRemoved(removed.clone()));
        Ok(removed)
    }

    /// Replaces every keyword at once.
    ///
    /// # Errors
    ///
    /// [`ListError::Locked`].
    pub fn set_keywords(&self, keywords: Vec<Keyword>) -> Result<(), ListError> {
        self.ensure_unlocked()?;
        self.write().keywords = keywords;
        self.publish(ListEventKind::KeywordsReplaced);
        Ok(())
    }

    /// Sets whether the list participates in ingest.  Returns `true` if the
    /// flag changed; unchanged values publish nothing.
    pub fn set_use_for_ingest(&self, enabled: bool) -> bool {
        let changed = {
            let mut state = self.write();
            std::mem::replace(&mut state.use_for_ingest, enabled) != enabled
        };
        if changed {
            self.publish(ListEventKind::UseForIngest(enabled));
        }
        changed
    }

    /// Sets whether hits on this list post ingest messages.  Returns `true`
    /// if the flag changed.
    pub fn set_ingest_messages(&self, enabled: bool) -> bool {
        let changed = {
            let mut state = self.write();
            std::mem::replace(&mut state.ingest_messages, enabled) != enabled
        };
        if changed {
            self.publish(ListEventKind::IngestMessages(enabled));
        }
        changed
    }

    /// Registers a listener for this list's mutations.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ListEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn ensure_unlocked(&self) -> Result<(), ListError> {
        if self.locked {
            Err(ListError::Locked(self.name.clone()))
        } else {
            Ok(())
        }
    }

    // Called with no lock held so listeners can read the list back.
    fn publish(&self, kind: ListEventKind) {
        self.listeners.notify(&ListEvent {
            list: self.name.clone(),
            kind,
        });
    }

    fn read(&self) -> RwLockReadGuard<'_, ListState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ListState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for KeywordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("KeywordList")
            .field("name", &self.name)
            .field("locked", &self.locked)
            .field("keywords", &state.keywords)
            .field("use_for_ingest", &state.use_for_ingest)
            .field("ingest_messages", &state.ingest_messages)
            .finish()
    }
}
