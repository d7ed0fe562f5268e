//! Search-based term resolution.
//!
//! Finds the file defining a term by full-text code search for its
//! definition marker, picks the first file whose match fragments
//! contain a definition line (item order, then fragment order, then
//! line order — first match wins, ties broken by the search API's
//! ordering), and downloads that file's full content.

use termweave_cache::CacheStore;
use termweave_github::{GithubClient, SearchItem, SearchResponse};
use termweave_shared::{ResolvedTerm, Result, TermweaveError};
use tracing::{info, warn};

use crate::is_definition_line;

/// Resolver backed by GitHub code search over raw term files.
pub struct SearchResolver {
    client: GithubClient,
    cache: CacheStore,
}

impl SearchResolver {
    pub fn new(client: GithubClient, cache: CacheStore) -> Self {
        Self { client, cache }
    }

    /// Locate and download the file defining `term`.
    ///
    /// `Err` is reserved for rate-limit exhaustion; every other failure
    /// is logged and returns `Ok(None)`.
    pub async fn resolve(
        &self,
        term: &str,
        owner: &str,
        repo: &str,
        subdirectory: &str,
    ) -> Result<Option<ResolvedTerm>> {
        match self.try_resolve(term, owner, repo, subdirectory).await {
            Ok(resolved) => Ok(resolved),
            Err(e) if e.is_rate_limited() => Err(e),
            Err(e) => {
                warn!(term, owner, repo, error = %e, "search resolution failed");
                Ok(None)
            }
        }
    }

    async fn try_resolve(
        &self,
        term: &str,
        owner: &str,
        repo: &str,
        subdirectory: &str,
    ) -> Result<Option<ResolvedTerm>> {
        let search_string = format!("[[def: {term}");
        info!(%search_string, "searching for '{search_string}' in {owner}/{repo}/{subdirectory}");

        let response = self
            .cached_search(&search_string, owner, repo, subdirectory)
            .await?;

        info!(total = response.total_count, "search found {} results", response.total_count);
        if response.total_count == 0 {
            info!(term, "no matches found - check if term exists in repository");
            return Ok(None);
        }

        // Each item is a file containing the search string one or more
        // times; each fragment is a snippet around one occurrence, not
        // the entire file.
        for item in &response.items {
            for text_match in &item.text_matches {
                for line in text_match.fragment.split('\n') {
                    if is_definition_line(line) {
                        let content = self.fetch_file_content(item).await?;
                        return Ok(Some(self.build_resolved(term, item, content).await));
                    }
                }
            }
        }

        Ok(None)
    }

    /// Search response, read-through cached. A present cache file is
    /// valid indefinitely.
    async fn cached_search(
        &self,
        search_string: &str,
        owner: &str,
        repo: &str,
        subdirectory: &str,
    ) -> Result<SearchResponse> {
        let key =
            CacheStore::generate_key(&["search", search_string, owner, repo, subdirectory]);

        if let Some(raw) = self.cache.get_text(&key) {
            return serde_json::from_str(&raw)
                .map_err(|e| TermweaveError::parse(format!("cached search response: {e}")));
        }

        let response = self
            .client
            .search_code(search_string, owner, repo, subdirectory)
            .await?;

        let raw = serde_json::to_string(&response)
            .map_err(|e| TermweaveError::parse(format!("search response: {e}")))?;
        self.cache.put_text(&key, &raw)?;

        Ok(response)
    }

    /// Full file content for the winning item, read-through cached.
    /// Content fetch failures (other than rate limiting) degrade to an
    /// empty string, matching the known oversized-file capability gap.
    async fn fetch_file_content(&self, item: &SearchItem) -> Result<String> {
        let owner = &item.repository.owner.login;
        let repo = &item.repository.name;
        let key = CacheStore::generate_key(&["file", owner, repo, &item.path]);

        if let Some(content) = self.cache.get_text(&key) {
            return Ok(content);
        }

        let content = match self.client.get_content(owner, repo, &item.path).await {
            Ok(content) => content,
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                warn!(path = %item.path, error = %e, "error fetching content");
                String::new()
            }
        };

        if !content.is_empty() {
            self.cache.put_text(&key, &content)?;
        }

        Ok(content)
    }

    async fn build_resolved(&self, term: &str, item: &SearchItem, content: String) -> ResolvedTerm {
        let owner = item.repository.owner.login.clone();
        let repo = item.repository.name.clone();
        let commit_hash = self.client.latest_commit(&owner, &repo, &item.path).await;

        ResolvedTerm {
            term: term.to_string(),
            content,
            repo_url: format!("https://github.com/{owner}/{repo}"),
            avatar_url: item.repository.owner.avatar_url.clone(),
            owner,
            repo,
            commit_hash,
        }
    }
}
