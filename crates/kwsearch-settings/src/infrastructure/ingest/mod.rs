//! Ingest-side bookkeeping: which keyword lists a running job searches with.
//!
//! The ingest pipeline itself lives elsewhere.  It reports the lists it picked
//! up when a job starts and clears them when the job ends; the configuration
//! controller queries [`IngestRegistry`] through the
//! [`IngestMonitor`](crate::application::ports::IngestMonitor) port before
//! allowing a list to be edited.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::application::ports::IngestMonitor;

/// Thread-safe set of keyword list names in use by ingest.
#[derive(Debug, Default)]
pub struct IngestRegistry {
    in_use: Mutex<HashSet<String>>,
}

impl IngestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every list in `names` as in use by a running job.
    pub fn start_job<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut in_use = self.in_use.lock().unwrap_or_else(PoisonError::into_inner);
        for name in names {
            let name = name.into();
            debug!(list = %name, "keyword list in use by ingest");
            in_use.insert(name);
        }
    }

    /// Clears every in-use mark.
    pub fn finish_jobs(&self) {
        self.in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Names currently in use, in no particular order.
    pub fn lists_in_use(&self) -> Vec<String> {
        self.in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl IngestMonitor for IngestRegistry {
    fn is_list_in_use(&self, name: &str) -> bool {
        self.in_use
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_tracks_lists_until_jobs_finish() {
        // Arrange
        let registry = IngestRegistry::new();

        // Act
        registry.start_job(["Suspects", "URLs"]);

        // Assert
        assert!(registry.is_list_in_use("Suspects"));
        assert!(!registry.is_list_in_use("Other"));
        assert_eq!(registry.lists_in_use().len(), 2);

        registry.finish_jobs();
        assert!(!registry.is_list_in_use("Suspects"));
    }
}
