//! Response shapes consumed from the GitHub REST API.
//!
//! Only the fields the resolvers actually read are modeled; everything
//! else in the API payloads is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Code search response (`GET /search/code`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Number of files containing the search string.
    pub total_count: u64,
    /// One item per matching file.
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// One matching file in a code search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
    /// Path of the file inside the repository.
    pub path: String,
    /// Owning repository metadata.
    pub repository: RepoInfo,
    /// Snippets around each occurrence of the search string. Requires
    /// the `text-match` media type; can be empty.
    #[serde(default)]
    pub text_matches: Vec<TextMatch>,
}

/// Repository metadata embedded in search items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    /// Repository name.
    pub name: String,
    /// Repository owner.
    pub owner: OwnerInfo,
}

/// Repository owner metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerInfo {
    /// Owner login.
    pub login: String,
    /// Owner avatar URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// One text-match fragment: a snippet of file content around a match,
/// not the entire file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMatch {
    /// Snippet of the file content around the matched search string.
    pub fragment: String,
}

/// Contents API response (`GET /repos/{owner}/{repo}/contents/{path}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResponse {
    /// Base64-encoded file content. Absent for files above the API's
    /// inline-content size threshold.
    #[serde(default)]
    pub content: Option<String>,
    /// Direct download URL, the only option for oversized files.
    #[serde(default)]
    pub download_url: Option<String>,
}

/// One entry of the commit-history endpoint
/// (`GET /repos/{owner}/{repo}/commits?path=...&per_page=1`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitEntry {
    /// Commit hash.
    pub sha: String,
}

/// Minimal view of an external repository's published `specs.json`,
/// read only to locate its rendered output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSpecsJson {
    /// Specification entries.
    pub specs: Vec<RemoteSpecEntry>,
}

/// One entry of a remote `specs.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSpecEntry {
    /// Directory the rendered `index.html` is published under.
    #[serde(default)]
    pub output_path: Option<String>,
}
