//! Environment snapshot.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A frozen copy of environment variables.
///
/// Templates read this snapshot, never the live process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env {
    vars: BTreeMap<String, String>,
}

impl Env {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the current process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Parses `KEY=VALUE` entries. The value may be empty or contain `=`.
    pub fn parse_overrides(entries: &[String]) -> Result<Vec<(String, String)>, ConfigError> {
        entries
            .iter()
            .map(|entry| match entry.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    Ok((key.trim().to_string(), value.to_string()))
                }
                _ => Err(ConfigError::InvalidEnv(entry.clone())),
            })
            .collect()
    }

    /// Returns a copy with the overrides applied on top.
    #[must_use]
    pub fn merged(&self, overrides: &[(String, String)]) -> Self {
        let mut vars = self.vars.clone();
        for (key, value) in overrides {
            vars.insert(key.clone(), value.clone());
        }
        Self { vars }
    }

    /// Sets a variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Gets a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Returns true if the variable is present, even when empty.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns true if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Env {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
