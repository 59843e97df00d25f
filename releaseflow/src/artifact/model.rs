//! Artifact model types.

use crate::errors::ArtifactError;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// What kind of file an artifact is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A compiled binary.
    Binary,
    /// An OS package such as a deb, rpm or apk.
    PlatformPackage,
    /// A checksums file.
    Checksum,
    /// Anything else.
    Other,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary => write!(f, "binary"),
            Self::PlatformPackage => write!(f, "platform_package"),
            Self::Checksum => write!(f, "checksum"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// The target platform of an artifact.
///
/// An empty `os` and `arch` means the artifact is platform independent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system, e.g. `linux`.
    pub os: String,
    /// Architecture, e.g. `amd64` or `arm64`.
    pub arch: String,
    /// ARM variant, e.g. `7`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arm: Option<String>,
    /// amd64 microarchitecture level, e.g. `v3`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amd64: Option<String>,
}

impl Platform {
    /// Creates a platform from os and arch.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            arm: None,
            amd64: None,
        }
    }

    /// Sets the ARM variant.
    #[must_use]
    pub fn with_arm(mut self, arm: impl Into<String>) -> Self {
        self.arm = Some(arm.into());
        self
    }

    /// Sets the amd64 microarchitecture level.
    #[must_use]
    pub fn with_amd64(mut self, amd64: impl Into<String>) -> Self {
        self.amd64 = Some(amd64.into());
        self
    }

    /// Returns true if the platform is unset.
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.os.is_empty() && self.arch.is_empty()
    }
}

impl fmt::Display for Platform {
    /// Formats as `os_arch`, then `v<arm>` or `_<amd64>` when set; `all` when unset.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return write!(f, "all");
        }
        write!(f, "{}_{}", self.os, self.arch)?;
        if let Some(arm) = &self.arm {
            write!(f, "v{arm}")?;
        }
        if let Some(amd64) = &self.amd64 {
            write!(f, "_{amd64}")?;
        }
        Ok(())
    }
}

/// Hash algorithm for artifact checksums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// SHA-256.
    #[default]
    Sha256,
    /// SHA-512.
    Sha512,
    /// MD5.
    Md5,
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
            Self::Md5 => write!(f, "md5"),
        }
    }
}

impl ChecksumAlgorithm {
    /// Hashes a byte slice and returns lower-case hex.
    #[must_use]
    pub fn digest_hex(self, bytes: &[u8]) -> String {
        match self {
            Self::Sha256 => hex::encode(Sha256::digest(bytes)),
            Self::Sha512 => hex::encode(Sha512::digest(bytes)),
            Self::Md5 => hex::encode(Md5::digest(bytes)),
        }
    }
}

/// A produced file tagged with an identifier and target platform.
///
/// Artifacts are immutable once registered; the store hands them out as `Arc<Artifact>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Stage-assigned identifier, not globally unique.
    pub id: String,
    /// File name.
    pub name: String,
    /// Path on disk.
    pub path: PathBuf,
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Target platform.
    #[serde(default)]
    pub platform: Platform,
    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Artifact {
    /// Creates a platform-independent artifact.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        kind: ArtifactKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
            kind,
            platform: Platform::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Sets the target platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Returns the path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hashes the artifact file and returns lower-case hex.
    pub fn checksum(&self, algorithm: ChecksumAlgorithm) -> Result<String, ArtifactError> {
        let bytes = std::fs::read(&self.path).map_err(|source| ArtifactError::Io {
            name: self.name.clone(),
            source,
        })?;
        Ok(algorithm.digest_hex(&bytes))
    }
}
