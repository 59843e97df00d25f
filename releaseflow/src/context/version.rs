//! Parsed release version.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The version tuple of a release.
///
/// Parsed with `semver` after stripping a leading `v`; `raw` keeps the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// The input as given, e.g. `v1.2.3-rc.1`.
    pub raw: String,
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Pre-release, without the leading `-`; empty when absent.
    pub prerelease: String,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            raw: "0.0.0".to_string(),
            major: 0,
            minor: 0,
            patch: 0,
            prerelease: String::new(),
        }
    }
}

impl Version {
    /// Parses a version string.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let stripped = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let parsed = semver::Version::parse(stripped).map_err(|e| ConfigError::InvalidVersion {
            value: raw.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            raw: trimmed.to_string(),
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            prerelease: parsed.pre.to_string(),
        })
    }

    /// Returns the next major version, e.g. `2.0.0`, or `None` on overflow.
    #[must_use]
    pub fn inc_major(&self) -> Option<String> {
        Some(format!("{}.0.0", self.major.checked_add(1)?))
    }

    /// Returns the next minor version, e.g. `1.3.0`, or `None` on overflow.
    #[must_use]
    pub fn inc_minor(&self) -> Option<String> {
        Some(format!("{}.{}.0", self.major, self.minor.checked_add(1)?))
    }

    /// Returns the next patch version, or `None` on overflow.
    ///
    /// A pre-release already denotes the upcoming patch, so `1.2.3-rc.1` becomes `1.2.3`.
    #[must_use]
    pub fn inc_patch(&self) -> Option<String> {
        let patch = if self.prerelease.is_empty() {
            self.patch.checked_add(1)?
        } else {
            self.patch
        };
        Some(format!("{}.{}.{}", self.major, self.minor, patch))
    }
}

impl fmt::Display for Version {
    /// Formats without the leading `v`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_v() {
        let v = Version::parse("v1.2.3-rc.1").unwrap();
        assert_eq!((v.major, v.minor, v.patch), (1, 2, 3));
        assert_eq!(v.prerelease, "rc.1");
        assert_eq!(v.raw, "v1.2.3-rc.1");
        assert_eq!(v.to_string(), "1.2.3-rc.1");
    }

    #[test]
    fn test_parse_invalid() {
        let err = Version::parse("latest").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion { .. }));
    }

    #[test]
    fn test_increments() {
        let v = Version::parse("1.2.3").unwrap();
        assert_eq!(v.inc_major().as_deref(), Some("2.0.0"));
        assert_eq!(v.inc_minor().as_deref(), Some("1.3.0"));
        assert_eq!(v.inc_patch().as_deref(), Some("1.2.4"));

        let pre = Version::parse("1.2.3-beta").unwrap();
        assert_eq!(pre.inc_patch().as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_increments_overflow() {
        let max = u64::MAX;
        let v = Version::parse(&format!("{max}.{max}.{max}")).unwrap();
        assert_eq!(v.inc_major(), None);
        assert_eq!(v.inc_minor(), None);
        assert_eq!(v.inc_patch(), None);

        let pre = Version::parse(&format!("1.2.{max}-rc.1")).unwrap();
        assert_eq!(pre.inc_patch(), Some(format!("1.2.{max}")));
    }
}
