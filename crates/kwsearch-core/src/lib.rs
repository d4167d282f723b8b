//! # kwsearch-core
//!
//! Shared domain types for keyword search configuration, plus the codec for
//! the line-oriented `key=value` settings files.
//!
//! This crate has no file-system access of its own.  Persistence lives in
//! `kwsearch-settings`; everything here can be unit-tested in memory.
//!
//! # Overview
//!
//! - **`domain`** – The typed vocabulary of the feature: update frequencies,
//!   extractable scripts, extract options, keywords and keyword lists, the
//!   change notifications published to observers, and the listener hub used
//!   to deliver them.
//!
//! - **`properties`** – How a settings file looks on disk.  A file is an
//!   ordered set of `key=value` string pairs with an optional leading comment
//!   header; the codec parses and serializes that text.

pub mod domain;
pub mod properties;

pub use domain::change::{ChangeKind, ConfigChange, ListsChange};
pub use domain::keyword::{Keyword, KeywordList, KeywordType, ListError, ListEvent, ListEventKind};
pub use domain::observer::{Listener, Listeners, SubscriptionId};
pub use domain::options::{ExtractOption, ParseEnumError, Script, UpdateFrequency};
pub use properties::codec::{parse_properties, write_properties, PropertiesError};
