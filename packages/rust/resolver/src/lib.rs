//! Term resolution against external repositories.
//!
//! Two mutually exclusive strategies exist per external spec:
//!
//! - [`SearchResolver`] locates the defining file by full-text code
//!   search for a definition marker, then downloads its content. Used
//!   when the configuration names a `terms_dir` for the repository.
//! - [`IndexResolver`] scrapes the repository's already-rendered
//!   specification index page and extracts the full term → definition
//!   map in one pass. Used when no raw-source location is known.
//!
//! Both are read-through/write-through over the [`CacheStore`]. Their
//! error contract: `Err` carries only [`TermweaveError::RateLimited`]
//! (so callers can abandon remote work for the run); every other
//! failure is logged and collapses to `Ok(None)`.

mod index;
mod search;

use termweave_cache::CacheStore;
use termweave_github::GithubClient;
use termweave_shared::{ResolvedTerm, Result, RunConfig, XrefRecord};
use tracing::warn;

pub use index::IndexResolver;
pub use search::SearchResolver;

/// A line declaring a term's canonical definition in a source file.
pub fn is_definition_line(line: &str) -> bool {
    line.trim_start().starts_with("[[def:")
}

/// Strategy-tagged resolver, selected by available repository metadata.
pub enum TermResolver {
    /// Raw-source code search (a `terms_dir` is configured).
    Search(SearchResolver),
    /// Rendered-index scraping (no raw-source location known).
    Index(IndexResolver),
}

impl TermResolver {
    /// Pick the strategy for one reference record.
    pub fn for_record(record: &XrefRecord, client: &GithubClient, cache: &CacheStore, config: &RunConfig) -> Self {
        if record.terms_dir.is_some() {
            Self::Search(SearchResolver::new(client.clone(), cache.clone()))
        } else {
            Self::Index(IndexResolver::new(
                client.clone(),
                cache.clone(),
                config.index_ttl,
            ))
        }
    }

    /// Resolve one reference record. Records without derived owner/repo
    /// metadata cannot be looked up and resolve to absent.
    pub async fn resolve(&self, record: &XrefRecord) -> Result<Option<ResolvedTerm>> {
        let (Some(owner), Some(repo)) = (record.owner.as_deref(), record.repo.as_deref()) else {
            warn!(
                external_spec = %record.external_spec,
                term = %record.term,
                "record has no owner/repo, skipping resolution"
            );
            return Ok(None);
        };

        match self {
            Self::Search(resolver) => {
                let subdirectory = record.terms_dir.as_deref().unwrap_or_default();
                resolver.resolve(&record.term, owner, repo, subdirectory).await
            }
            Self::Index(resolver) => resolver.resolve_one(&record.term, owner, repo).await,
        }
    }
}
