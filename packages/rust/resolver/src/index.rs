//! Index-based term resolution.
//!
//! For repositories with no configured raw-source location, the term
//! definitions are scraped from the already-rendered specification page:
//! `specs.json` at the repository root names the publish directory, and
//! `<publish dir>/index.html` on the default branch carries a
//! `<dl class="terms-and-definitions-list">` with one `<dt>` per term
//! and one or more `<dd>` elements per definition. The whole page is
//! parsed into a [`TermIndex`] once and cached with a TTL, so a run
//! touching many terms of one repository costs a single page fetch.

use std::time::Duration;

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use termweave_cache::CacheStore;
use termweave_github::GithubClient;
use termweave_shared::{ResolvedTerm, Result, TermEntry, TermIndex, TermweaveError};
use tracing::{info, warn};

/// Resolver backed by the repository's rendered specification index.
pub struct IndexResolver {
    client: GithubClient,
    cache: CacheStore,
    ttl: Duration,
}

impl IndexResolver {
    pub fn new(client: GithubClient, cache: CacheStore, ttl: Duration) -> Self {
        Self { client, cache, ttl }
    }

    /// Look up one term in the repository's term index.
    ///
    /// `Err` is reserved for rate-limit exhaustion; every other failure
    /// is logged and returns `Ok(None)`.
    pub async fn resolve_one(
        &self,
        term: &str,
        owner: &str,
        repo: &str,
    ) -> Result<Option<ResolvedTerm>> {
        let index = match self.resolve_all(owner, repo).await {
            Ok(index) => index,
            Err(e) if e.is_rate_limited() => return Err(e),
            Err(e) => {
                warn!(owner, repo, error = %e, "term index unavailable");
                return Ok(None);
            }
        };

        let Some(entry) = index.find(term) else {
            info!(term, owner, repo, "term not present in rendered index");
            return Ok(None);
        };

        Ok(Some(ResolvedTerm {
            term: entry.term.clone(),
            content: entry.definition.clone(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            repo_url: format!("https://github.com/{owner}/{repo}"),
            commit_hash: index.sha.clone(),
            avatar_url: index.avatar_url.clone(),
        }))
    }

    /// The repository's term index, rebuilt from the rendered page when
    /// the cached copy is older than the configured TTL.
    pub async fn resolve_all(&self, owner: &str, repo: &str) -> Result<TermIndex> {
        let key = CacheStore::generate_key(&[owner, repo, "index"]);
        if let Some(index) = self.cache.get_json::<TermIndex>(&key, self.ttl) {
            return Ok(index);
        }

        let index = self.build_index(owner, repo).await?;
        self.cache.put_json(&key, &index)?;
        Ok(index)
    }

    async fn build_index(&self, owner: &str, repo: &str) -> Result<TermIndex> {
        let remote = self.client.fetch_specs_json(owner, repo).await?;
        let output_path = remote
            .specs
            .first()
            .and_then(|s| s.output_path.as_deref())
            .ok_or_else(|| {
                TermweaveError::parse(format!("{owner}/{repo} specs.json names no output_path"))
            })?;

        let rendered_path = rendered_index_path(output_path);
        let rendered_url = self.client.raw_url(owner, repo, &rendered_path);
        if !self.client.url_exists(&rendered_url).await {
            return Err(TermweaveError::Network(format!(
                "{rendered_url}: rendered index not reachable"
            )));
        }
        let html = self.client.fetch_raw(owner, repo, &rendered_path).await?;

        let terms = parse_rendered_terms(&html);
        if terms.is_empty() {
            warn!(owner, repo, "rendered index has no term definition list");
        }

        let timestamp = Utc::now().timestamp_millis();
        let output_file_name = format!("{timestamp}-{owner}-{repo}-terms.json");
        let sha = self.client.latest_commit(owner, repo, &rendered_path).await;

        let index = TermIndex {
            timestamp,
            repository: format!("{owner}/{repo}"),
            terms,
            sha,
            avatar_url: None,
            output_file_name: output_file_name.clone(),
        };

        // Timestamped audit copy alongside the keyed cache entry, so
        // successive builds remain inspectable after overwrites.
        match serde_json::to_string_pretty(&index) {
            Ok(json) => {
                if let Err(e) = self.cache.put_named(&output_file_name, &json) {
                    warn!(error = %e, "could not write term index audit file");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize term index audit file"),
        }

        info!(
            owner,
            repo,
            count = index.terms.len(),
            "built term index from rendered page"
        );
        Ok(index)
    }
}

/// Path of the rendered index document relative to the default branch
/// root. `output_path` values come in as `./docs/`, `docs`, etc.
fn rendered_index_path(output_path: &str) -> String {
    let trimmed = output_path
        .trim()
        .trim_start_matches("./")
        .trim_end_matches('/');
    if trimmed.is_empty() {
        "index.html".to_string()
    } else {
        format!("{trimmed}/index.html")
    }
}

/// Extract every term and its definition from a rendered page.
///
/// A term is a `<dt>` carrying a `span[id^="term:"]`; its definition is
/// the HTML of all `<dd>` siblings up to the next `<dt>`, joined in
/// document order.
fn parse_rendered_terms(html: &str) -> Vec<TermEntry> {
    let doc = Html::parse_document(html);
    let dl_selector =
        Selector::parse("dl.terms-and-definitions-list").expect("valid selector");
    let term_span_selector = Selector::parse(r#"span[id^="term:"]"#).expect("valid selector");

    let mut terms = Vec::new();

    for dl in doc.select(&dl_selector) {
        let mut current: Option<TermEntry> = None;

        for child in dl.children() {
            let Some(el) = ElementRef::wrap(child) else {
                continue;
            };

            match el.value().name() {
                "dt" => {
                    if let Some(entry) = current.take() {
                        terms.push(entry);
                    }

                    let label = el
                        .select(&term_span_selector)
                        .next()
                        .map(|span| span_label(&span))
                        .filter(|text| !text.is_empty());

                    if let Some(term) = label {
                        current = Some(TermEntry {
                            term,
                            definition: String::new(),
                        });
                    }
                }
                "dd" => {
                    if let Some(entry) = current.as_mut() {
                        if !entry.definition.is_empty() {
                            entry.definition.push('\n');
                        }
                        entry.definition.push_str(&el.html());
                    }
                }
                _ => {}
            }
        }

        if let Some(entry) = current.take() {
            terms.push(entry);
        }
    }

    terms
}

/// Term label: the span's concatenated direct text children, trimmed,
/// falling back to the full descendant text for nested markup.
fn span_label(span: &ElementRef) -> String {
    let direct: String = span
        .children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect();
    let direct = direct.trim();
    if !direct.is_empty() {
        return direct.to_string();
    }
    span.text().collect::<String>().trim().to_string()
}
