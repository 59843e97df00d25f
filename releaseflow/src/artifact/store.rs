//! Append-only, thread-safe artifact store.

use super::{Artifact, Selection};
use crate::errors::ArtifactError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Whether the store accepts the same identifier twice on one platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Duplicates are accepted.
    #[default]
    Allow,
    /// Identifiers must be unique per platform.
    UniquePerPlatform,
}

/// Holds every artifact registered during a run.
///
/// Registration happens under a single write guard, so a concurrent reader
/// sees an artifact fully registered or not at all.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    artifacts: RwLock<Vec<Arc<Artifact>>>,
    policy: DuplicatePolicy,
}

impl ArtifactStore {
    /// Creates an empty store that accepts duplicates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given duplicate policy.
    #[must_use]
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            artifacts: RwLock::new(Vec::new()),
            policy,
        }
    }

    /// Returns the duplicate policy.
    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Appends an artifact.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError::Duplicate` under `UniquePerPlatform` when an
    /// artifact with the same id and platform is already registered.
    pub fn register(&self, artifact: Artifact) -> Result<Arc<Artifact>, ArtifactError> {
        let mut artifacts = self.artifacts.write();

        if self.policy == DuplicatePolicy::UniquePerPlatform
            && artifacts
                .iter()
                .any(|a| a.id == artifact.id && a.platform == artifact.platform)
        {
            return Err(ArtifactError::duplicate(
                artifact.id,
                artifact.platform.to_string(),
            ));
        }

        debug!(id = %artifact.id, name = %artifact.name, platform = %artifact.platform, "artifact registered");
        let artifact = Arc::new(artifact);
        artifacts.push(Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Returns every matching artifact in insertion order.
    #[must_use]
    pub fn query(&self, selection: &Selection) -> Vec<Arc<Artifact>> {
        self.artifacts
            .read()
            .iter()
            .filter(|a| selection.matches(a))
            .cloned()
            .collect()
    }

    /// Returns every artifact in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Arc<Artifact>> {
        self.artifacts.read().clone()
    }

    /// Returns the number of artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    /// Returns true if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.read().is_empty()
    }

    /// Groups matching artifacts by platform.
    ///
    /// Groups are keyed by the platform's display form and ordered by first appearance.
    #[must_use]
    pub fn group_by_platform(&self, selection: &Selection) -> Vec<(String, Vec<Arc<Artifact>>)> {
        let mut groups: Vec<(String, Vec<Arc<Artifact>>)> = Vec::new();
        for artifact in self.query(selection) {
            let key = artifact.platform.to_string();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, items)) => items.push(artifact),
                None => groups.push((key, vec![artifact])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactKind, Platform, PlatformFilter};
    use pretty_assertions::assert_eq;

    fn binary(id: &str, os: &str, arch: &str) -> Artifact {
        Artifact::new(id, format!("{id}_{os}_{arch}"), "dist/bin", ArtifactKind::Binary)
            .with_platform(Platform::new(os, arch))
    }

    fn names(artifacts: &[Arc<Artifact>]) -> Vec<String> {
        artifacts.iter().map(|a| a.name.clone()).collect()
    }

    #[test]
    fn test_query_preserves_insertion_order() {
        let store = ArtifactStore::new();
        store.register(binary("app", "linux", "amd64")).unwrap();
        store.register(binary("cli", "linux", "amd64")).unwrap();
        store.register(binary("app", "darwin", "arm64")).unwrap();

        let found = store.query(&Selection::all().with_ids(["app"]));
        assert_eq!(names(&found), vec!["app_linux_amd64", "app_darwin_arm64"]);
    }

    fn linux_and_windows() -> ArtifactStore {
        let store = ArtifactStore::new();
        store.register(binary("a", "linux", "amd64")).unwrap();
        store.register(binary("b", "windows", "amd64")).unwrap();
        store.register(binary("c", "linux", "arm64")).unwrap();
        store
    }

    #[test]
    fn test_query_by_id_returns_only_that_id() {
        let store = linux_and_windows();
        let found = store.query(&Selection::all().with_ids(["a"]));
        assert_eq!(names(&found), vec!["a_linux_amd64"]);
    }

    #[test]
    fn test_query_by_os_without_ids_returns_every_match() {
        let store = linux_and_windows();
        let found = store.query(&Selection::all().with_platform(PlatformFilter::any().os("linux")));
        assert_eq!(names(&found), vec!["a_linux_amd64", "c_linux_arm64"]);
    }

    #[test]
    fn test_query_unknown_id_is_empty() {
        let store = linux_and_windows();
        assert!(store.query(&Selection::all().with_ids(["zzz"])).is_empty());
    }

    #[test]
    fn test_query_with_no_match_is_empty() {
        let store = ArtifactStore::new();
        store.register(binary("app", "linux", "amd64")).unwrap();

        let found = store.query(&Selection::all().with_platform(PlatformFilter::any().os("windows")));
        assert!(found.is_empty());
    }

    #[test]
    fn test_duplicates_allowed_by_default() {
        let store = ArtifactStore::new();
        store.register(binary("app", "linux", "amd64")).unwrap();
        store.register(binary("app", "linux", "amd64")).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_unique_per_platform_rejects_duplicate() {
        let store = ArtifactStore::with_policy(DuplicatePolicy::UniquePerPlatform);
        store.register(binary("app", "linux", "amd64")).unwrap();
        store.register(binary("app", "darwin", "amd64")).unwrap();

        let err = store.register(binary("app", "linux", "amd64")).unwrap_err();
        assert!(matches!(err, ArtifactError::Duplicate { .. }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_registers_are_all_kept() {
        let store = Arc::new(ArtifactStore::new());
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.register(binary(&format!("app{i}"), "linux", "amd64")).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 32);
        let mut ids: Vec<_> = store.list().iter().map(|a| a.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 32);
    }

    #[test]
    fn test_group_by_platform() {
        let store = ArtifactStore::new();
        store.register(binary("app", "linux", "amd64")).unwrap();
        store.register(binary("app", "darwin", "arm64")).unwrap();
        store.register(binary("cli", "linux", "amd64")).unwrap();

        let groups = store.group_by_platform(&Selection::all());
        let keys: Vec<_> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["linux_amd64", "darwin_arm64"]);
        assert_eq!(groups[0].1.len(), 2);
    }
}
