//! Shared release state.
//!
//! This module provides:
//! - The [`ReleaseContext`] handed by reference to every stage
//! - The environment snapshot templates resolve against
//! - The parsed version tuple
//! - The append-only resolved-values bag

#[cfg(test)]
mod context_tests;
mod env;
mod identity;
mod release;
mod values;
mod version;

pub use env::Env;
pub use identity::RunIdentity;
pub use release::ReleaseContext;
pub use values::ContextValues;
pub use version::Version;
