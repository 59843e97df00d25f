//! Artifacts, the append-only artifact store and selection criteria.
//!
//! Upstream stages register artifacts; downstream stages pick the ones they act
//! on with a [`Selection`]. Results always come back in insertion order.

mod model;
mod selection;
mod store;

pub use model::{Artifact, ArtifactKind, ChecksumAlgorithm, Platform};
pub use selection::{PlatformFilter, Selection};
pub use store::{ArtifactStore, DuplicatePolicy};
