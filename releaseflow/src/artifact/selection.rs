//! Selection criteria for artifact queries.

use super::{Artifact, ArtifactKind, Platform};
use serde::{Deserialize, Serialize};

/// Platform filter; every `None` field is a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFilter {
    /// Wanted operating system.
    #[serde(default)]
    pub os: Option<String>,
    /// Wanted architecture.
    #[serde(default)]
    pub arch: Option<String>,
    /// Wanted ARM variant.
    #[serde(default)]
    pub arm: Option<String>,
    /// Wanted amd64 level.
    #[serde(default)]
    pub amd64: Option<String>,
}

impl PlatformFilter {
    /// Creates a filter matching every platform.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Sets the operating system.
    #[must_use]
    pub fn os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    /// Sets the architecture.
    #[must_use]
    pub fn arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    /// Sets the ARM variant.
    #[must_use]
    pub fn arm(mut self, arm: impl Into<String>) -> Self {
        self.arm = Some(arm.into());
        self
    }

    /// Sets the amd64 level.
    #[must_use]
    pub fn amd64(mut self, amd64: impl Into<String>) -> Self {
        self.amd64 = Some(amd64.into());
        self
    }

    /// Returns true if every set field equals the platform's field.
    #[must_use]
    pub fn matches(&self, platform: &Platform) -> bool {
        fn field(want: Option<&String>, have: &str) -> bool {
            want.map_or(true, |w| w == have)
        }
        fn opt_field(want: Option<&String>, have: Option<&String>) -> bool {
            want.map_or(true, |w| have == Some(w))
        }

        field(self.os.as_ref(), &platform.os)
            && field(self.arch.as_ref(), &platform.arch)
            && opt_field(self.arm.as_ref(), platform.arm.as_ref())
            && opt_field(self.amd64.as_ref(), platform.amd64.as_ref())
    }
}

/// Which artifacts a stage acts on.
///
/// Matching is conjunctive: identifier, kind and platform must all match.
/// Empty `ids` and `kinds` mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Wanted identifiers.
    #[serde(default)]
    pub ids: Vec<String>,
    /// Wanted kinds.
    #[serde(default)]
    pub kinds: Vec<ArtifactKind>,
    /// Platform filter.
    #[serde(default)]
    pub platform: PlatformFilter,
}

impl Selection {
    /// Creates a selection matching every artifact.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to the given identifiers.
    #[must_use]
    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts to the given kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ArtifactKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    /// Sets the platform filter.
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformFilter) -> Self {
        self.platform = platform;
        self
    }

    /// Returns true if the artifact satisfies every criterion.
    #[must_use]
    pub fn matches(&self, artifact: &Artifact) -> bool {
        (self.ids.is_empty() || self.ids.iter().any(|id| *id == artifact.id))
            && (self.kinds.is_empty() || self.kinds.contains(&artifact.kind))
            && self.platform.matches(&artifact.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(id: &str, platform: Platform) -> Artifact {
        Artifact::new(id, id, format!("dist/{id}"), ArtifactKind::Binary).with_platform(platform)
    }

    #[test]
    fn test_empty_selection_matches_everything() {
        let a = binary("app", Platform::new("linux", "amd64"));
        assert!(Selection::all().matches(&a));
    }

    #[test]
    fn test_arm_variant_must_match_exactly() {
        let v6 = binary("app", Platform::new("linux", "arm").with_arm("6"));
        let v7 = binary("app", Platform::new("linux", "arm").with_arm("7"));
        let sel = Selection::all().with_platform(PlatformFilter::any().arch("arm").arm("7"));

        assert!(!sel.matches(&v6));
        assert!(sel.matches(&v7));
    }

    #[test]
    fn test_set_filter_does_not_match_unset_field() {
        let plain = binary("app", Platform::new("linux", "amd64"));
        let sel = Selection::all().with_platform(PlatformFilter::any().amd64("v3"));
        assert!(!sel.matches(&plain));
    }

    #[test]
    fn test_ids_and_kinds_are_conjunctive() {
        let deb = Artifact::new("pkg", "app.deb", "dist/app.deb", ArtifactKind::PlatformPackage);
        let sel = Selection::all()
            .with_ids(["pkg"])
            .with_kinds([ArtifactKind::Binary]);
        assert!(!sel.matches(&deb));

        let sel = Selection::all()
            .with_ids(["pkg"])
            .with_kinds([ArtifactKind::PlatformPackage]);
        assert!(sel.matches(&deb));
    }
}
