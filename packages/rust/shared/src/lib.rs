//! Shared types, error model, and configuration for Termweave.
//!
//! This crate is the foundation depended on by all other Termweave crates.
//! It provides:
//! - [`TermweaveError`] — the unified error type
//! - Domain types ([`XrefRecord`], [`ResolvedTerm`], [`TermIndex`], [`XrefDataset`])
//! - Configuration ([`SpecsConfig`], [`RunConfig`], owner/repo derivation)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    DEFAULT_INDEX_TTL_SECS, ExternalSpecRepo, RunConfig, SPECS_FILE_NAME, SpecConfig,
    SpecsConfig, parse_owner_repo,
};
pub use error::{Result, TermweaveError};
pub use types::{ResolvedTerm, TermEntry, TermIndex, XrefDataset, XrefRecord};
