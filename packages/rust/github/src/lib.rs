//! GitHub API client for term resolution.
//!
//! Wraps the four remote surfaces the resolvers consume: code search,
//! file contents, per-path commit history, and raw rendered pages.
//! Rate-limit exhaustion (HTTP 403 with a zeroed remaining-quota
//! header) is detected explicitly and surfaced as
//! [`TermweaveError::RateLimited`] so callers can abandon further
//! remote calls for the run instead of burning the quota on failures.

mod types;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode, header};
use tracing::{debug, info, warn};

use termweave_shared::{Result, RunConfig, TermweaveError};

pub use types::{
    CommitEntry, ContentResponse, OwnerInfo, RemoteSpecEntry, RemoteSpecsJson, RepoInfo,
    SearchItem, SearchResponse, TextMatch,
};

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("Termweave/", env!("CARGO_PKG_VERSION"));

/// Media type that makes code search include `text_matches` fragments.
const TEXT_MATCH_MEDIA_TYPE: &str = "application/vnd.github.v3.text-match+json";

/// Default media type for REST endpoints.
const JSON_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

/// Timeout for regular API requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the lightweight HEAD existence probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Branch the rendered index is fetched from.
const DEFAULT_BRANCH: &str = "main";

// ---------------------------------------------------------------------------
// GithubClient
// ---------------------------------------------------------------------------

/// HTTP client for the GitHub API and raw-content host.
///
/// Once quota exhaustion is detected the client remembers the reset
/// time and fails API calls fast without issuing requests, so cache
/// reads elsewhere keep working while live lookups stand down for the
/// run. Clones share this state.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    token: Option<String>,
    api_base: String,
    raw_base: String,
    exhausted: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl GithubClient {
    /// Create a client from the run configuration. Anonymous requests
    /// are allowed when no token is configured, at a lower rate limit.
    pub fn new(config: &RunConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TermweaveError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token: config.github_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            raw_base: config.raw_base.trim_end_matches('/').to_string(),
            exhausted: Arc::new(Mutex::new(None)),
        })
    }

    /// Reset time recorded after quota exhaustion, if any.
    pub fn quota_exhausted(&self) -> Option<DateTime<Utc>> {
        *self
            .exhausted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_quota(&self) -> Result<()> {
        match self.quota_exhausted() {
            Some(reset) => Err(TermweaveError::RateLimited { reset }),
            None => Ok(()),
        }
    }

    fn check_quota(&self, response: Response) -> Result<Response> {
        let checked = check_rate_limit(response);
        if let Err(TermweaveError::RateLimited { reset }) = &checked {
            warn!(%reset, "rate limit exhausted, suppressing further API calls this run");
            *self
                .exhausted
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(*reset);
        }
        checked
    }

    // -----------------------------------------------------------------
    // Code search
    // -----------------------------------------------------------------

    /// Full-text code search scoped to one repository subdirectory.
    pub async fn search_code(
        &self,
        search_string: &str,
        owner: &str,
        repo: &str,
        subdirectory: &str,
    ) -> Result<SearchResponse> {
        self.ensure_quota()?;
        let query = format!("{search_string} repo:{owner}/{repo} path:{subdirectory}");
        let url = format!("{}/search/code", self.api_base);
        debug!(%query, "searching code");

        let response = self
            .request(&url, TEXT_MATCH_MEDIA_TYPE)
            .query(&[("q", query.as_str())])
            .send()
            .await
            .map_err(|e| TermweaveError::Network(format!("{url}: {e}")))?;

        let response = self.check_quota(response)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TermweaveError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<SearchResponse>()
            .await
            .map_err(|e| TermweaveError::parse(format!("search response: {e}")))
    }

    // -----------------------------------------------------------------
    // File contents
    // -----------------------------------------------------------------

    /// Fetch a file's content via the contents API, decoded from base64.
    ///
    /// Files above the API's inline-content threshold come back with no
    /// `content`, only a download URL; those yield an empty string and
    /// a logged pointer rather than an error.
    pub async fn get_content(&self, owner: &str, repo: &str, path: &str) -> Result<String> {
        self.ensure_quota()?;
        let url = format!("{}/repos/{owner}/{repo}/contents/{path}", self.api_base);
        debug!(%url, "fetching file content");

        let response = self
            .request(&url, JSON_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| TermweaveError::Network(format!("{url}: {e}")))?;

        let response = self.check_quota(response)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TermweaveError::Network(format!("{url}: HTTP {status}")));
        }

        let body: ContentResponse = response
            .json()
            .await
            .map_err(|e| TermweaveError::parse(format!("contents response: {e}")))?;

        match body.content {
            Some(encoded) => decode_base64_content(&encoded),
            None => {
                info!(
                    download_url = body.download_url.as_deref().unwrap_or("none"),
                    "file too large for inline content"
                );
                Ok(String::new())
            }
        }
    }

    // -----------------------------------------------------------------
    // Commit provenance
    // -----------------------------------------------------------------

    /// Latest commit hash for one file path, or `None` when the path has
    /// no commits or the endpoint reports a failure. Advisory only:
    /// callers drop provenance metadata instead of failing resolution.
    pub async fn latest_commit(&self, owner: &str, repo: &str, path: &str) -> Option<String> {
        let normalized = path.trim_start_matches('/');
        if let Some(reset) = self.quota_exhausted() {
            debug!(path = normalized, %reset, "skipping commit lookup, quota exhausted");
            return None;
        }
        let url = format!("{}/repos/{owner}/{repo}/commits", self.api_base);
        debug!(%url, path = normalized, "fetching latest commit");

        let response = self
            .request(&url, JSON_MEDIA_TYPE)
            .query(&[("path", normalized), ("per_page", "1")])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(path = normalized, error = %e, "commit lookup failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                path = normalized,
                status = %response.status(),
                "could not find commit information"
            );
            return None;
        }

        let commits: Vec<CommitEntry> = match response.json().await {
            Ok(commits) => commits,
            Err(e) => {
                warn!(path = normalized, error = %e, "malformed commit response");
                return None;
            }
        };

        match commits.first() {
            Some(entry) => Some(entry.sha.clone()),
            None => {
                info!(path = normalized, "no commits found for path");
                None
            }
        }
    }

    // -----------------------------------------------------------------
    // Raw content and remote specs.json
    // -----------------------------------------------------------------

    /// URL of a file on the repository's default branch via the raw host.
    pub fn raw_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/{owner}/{repo}/{DEFAULT_BRANCH}/{path}", self.raw_base)
    }

    /// GET a file off the repository's default branch via the raw host.
    pub async fn fetch_raw(&self, owner: &str, repo: &str, path: &str) -> Result<String> {
        let url = self.raw_url(owner, repo, path);
        debug!(%url, "fetching raw content");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TermweaveError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TermweaveError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| TermweaveError::Network(format!("{url}: body read failed: {e}")))
    }

    /// Fetch and parse an external repository's published `specs.json`.
    pub async fn fetch_specs_json(&self, owner: &str, repo: &str) -> Result<RemoteSpecsJson> {
        let content = self.get_content(owner, repo, "specs.json").await?;
        serde_json::from_str(&content)
            .map_err(|e| TermweaveError::parse(format!("{owner}/{repo} specs.json: {e}")))
    }

    /// HEAD probe: does `url` answer with a success status?
    pub async fn url_exists(&self, url: &str) -> bool {
        match self
            .client
            .head(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!(%url, error = %e, "existence probe failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    fn request(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url).header(header::ACCEPT, accept);
        if let Some(token) = &self.token {
            builder = builder.header(header::AUTHORIZATION, format!("token {token}"));
        }
        builder
    }
}

// ---------------------------------------------------------------------------
// Rate-limit detection
// ---------------------------------------------------------------------------

/// Detect quota exhaustion: HTTP 403 together with
/// `x-ratelimit-remaining: 0` means the run should stop issuing remote
/// calls on this path until the advertised reset time.
fn check_rate_limit(response: Response) -> Result<Response> {
    if response.status() != StatusCode::FORBIDDEN {
        return Ok(response);
    }

    let remaining = header_str(&response, "x-ratelimit-remaining");
    if remaining != Some("0") {
        return Ok(response);
    }

    let reset = header_str(&response, "x-ratelimit-reset")
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    Err(TermweaveError::RateLimited { reset })
}

fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Decode the contents API's base64 payload, which is line-wrapped.
fn decode_base64_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| TermweaveError::parse(format!("base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| TermweaveError::parse(format!("utf-8 content: {e}")))
}
