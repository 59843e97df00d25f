//! Append-only resolved values.

use crate::errors::DataConflictError;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A thread-safe, append-only bag of values produced during a run.
///
/// Stages publish values here (for example `ReleaseURL`) for later stages and
/// templates to read. Writing to an existing key raises a `DataConflictError`.
#[derive(Debug, Default)]
pub struct ContextValues {
    data: RwLock<BTreeMap<String, String>>,
}

impl ContextValues {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Sets a value.
    ///
    /// # Errors
    ///
    /// Returns `DataConflictError` if the key already exists.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), DataConflictError> {
        let key = key.into();
        let mut data = self.data.write();

        if data.contains_key(&key) {
            return Err(DataConflictError::new(key));
        }

        data.insert(key, value.into());
        Ok(())
    }

    /// Returns a copy of all values.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.data.read().clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
