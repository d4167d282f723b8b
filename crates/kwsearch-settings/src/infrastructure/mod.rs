//! Infrastructure layer: file-system and ingest adapters.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `kwsearch_core`, but MUST NOT be imported by the `application` layer.

pub mod ingest;
pub mod storage;
