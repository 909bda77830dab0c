//! IPA handling module.
//!
//! Provides extraction of IPA archives into per-run scratch workspaces.

pub mod extract;
pub mod workspace;

pub use extract::{extract_archive, extract_ipa, ExtractLimits, ExtractSummary};
pub use workspace::Workspace;
