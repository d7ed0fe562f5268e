//! Configuration for Termweave.
//!
//! The document corpus is described by a `specs.json` file (the same
//! contract external repositories publish); runtime knobs live in
//! [`RunConfig`], which is passed explicitly into stores and resolvers
//! so nothing depends on hidden process-wide state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TermweaveError};

/// Default specs configuration file name.
pub const SPECS_FILE_NAME: &str = "specs.json";

/// Default time-to-live for the repository term-index cache.
///
/// The historic behavior was a zero TTL, which made every index cache
/// entry immediately stale; that is treated as a defect here.
pub const DEFAULT_INDEX_TTL_SECS: u64 = 24 * 60 * 60;

// ---------------------------------------------------------------------------
// specs.json model
// ---------------------------------------------------------------------------

/// Top-level `specs.json` structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecsConfig {
    /// Specification entries; consumers read `specs[0]` for output paths.
    pub specs: Vec<SpecConfig>,
}

/// One specification entry in `specs.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecConfig {
    /// Directory containing the spec's Markdown sources.
    pub spec_directory: String,

    /// Subdirectory of `spec_directory` holding term definition files.
    pub spec_terms_directory: String,

    /// Rendered-output directory (external repositories publish this so
    /// their `index.html` can be located).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// Mapping of external-spec short names to source repositories.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_specs_repos: Vec<ExternalSpecRepo>,

    /// Mapping of external-spec short names to display site URLs.
    /// Each map holds a single `{short_name: url}` pair.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_specs: Vec<HashMap<String, String>>,
}

/// One `external_specs_repos` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSpecRepo {
    /// Short name referenced by `[[xref: <name>, <term>]]` markers.
    pub external_spec: String,
    /// Repository URL, e.g. `https://github.com/owner/repo`.
    pub url: String,
    /// Subdirectory inside the repository that holds term files.
    pub terms_dir: String,
}

impl SpecConfig {
    /// Directory that holds this spec's term definition files.
    pub fn terms_directory(&self) -> PathBuf {
        Path::new(&self.spec_directory).join(&self.spec_terms_directory)
    }
}

impl SpecsConfig {
    /// Load and parse a `specs.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TermweaveError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            TermweaveError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// All term directories across specs, in declaration order.
    pub fn term_directories(&self) -> Vec<PathBuf> {
        self.specs.iter().map(SpecConfig::terms_directory).collect()
    }

    /// Repository mapping for an external spec short name, if configured.
    pub fn repo_for(&self, external_spec: &str) -> Option<&ExternalSpecRepo> {
        self.specs
            .iter()
            .flat_map(|s| s.external_specs_repos.iter())
            .find(|r| r.external_spec == external_spec)
    }

    /// Display site URL for an external spec short name, if configured.
    pub fn site_for(&self, external_spec: &str) -> Option<&str> {
        self.specs
            .iter()
            .flat_map(|s| s.external_specs.iter())
            .find_map(|m| m.get(external_spec))
            .map(String::as_str)
    }
}

/// Derive `(owner, repo)` from a repository URL's path segments.
pub fn parse_owner_repo(repo_url: &str) -> Option<(String, String)> {
    let url = Url::parse(repo_url).ok()?;
    let mut segments = url.path_segments()?;
    let owner = segments.next()?.to_string();
    let repo = segments.next()?.to_string();
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner, repo))
}

// ---------------------------------------------------------------------------
// Runtime configuration
// ---------------------------------------------------------------------------

/// Runtime configuration passed into stores and resolvers.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory for the content-addressed cache files.
    pub cache_dir: PathBuf,
    /// Directory for the consolidated dataset outputs.
    pub output_dir: PathBuf,
    /// GitHub API token; anonymous requests are allowed but rate-limited.
    pub github_token: Option<String>,
    /// Freshness window for the repository term-index cache.
    pub index_ttl: Duration,
    /// GitHub API base URL (overridable for tests).
    pub api_base: String,
    /// Raw-content base URL (overridable for tests).
    pub raw_base: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache/termweave"),
            output_dir: PathBuf::from("output"),
            github_token: None,
            index_ttl: Duration::from_secs(DEFAULT_INDEX_TTL_SECS),
            api_base: "https://api.github.com".into(),
            raw_base: "https://raw.githubusercontent.com".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "specs": [
            {
                "spec_directory": "./spec",
                "spec_terms_directory": "term-definitions",
                "output_path": "./docs",
                "external_specs_repos": [
                    {
                        "external_spec": "PE",
                        "url": "https://github.com/decentralized-identity/presentation-exchange",
                        "terms_dir": "spec"
                    }
                ],
                "external_specs": [
                    { "PE": "https://identity.foundation/presentation-exchange" }
                ]
            }
        ]
    }"#;

    #[test]
    fn specs_config_parses_sample() {
        let config: SpecsConfig = serde_json::from_str(SAMPLE).expect("parse");
        assert_eq!(config.specs.len(), 1);
        assert_eq!(
            config.term_directories(),
            vec![PathBuf::from("./spec/term-definitions")]
        );

        let repo = config.repo_for("PE").expect("PE repo");
        assert_eq!(repo.terms_dir, "spec");
        assert!(config.repo_for("unknown").is_none());

        assert_eq!(
            config.site_for("PE"),
            Some("https://identity.foundation/presentation-exchange")
        );
        assert!(config.site_for("unknown").is_none());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SPECS_FILE_NAME);
        std::fs::write(&path, SAMPLE).expect("write");

        let config = SpecsConfig::load(&path).expect("load");
        assert_eq!(config.specs[0].output_path.as_deref(), Some("./docs"));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(SPECS_FILE_NAME);
        std::fs::write(&path, "{ not json").expect("write");

        let err = SpecsConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn owner_repo_from_url_path() {
        let parsed = parse_owner_repo("https://github.com/blockchainbird/spec-up-xref-test-1");
        assert_eq!(
            parsed,
            Some(("blockchainbird".into(), "spec-up-xref-test-1".into()))
        );
        assert!(parse_owner_repo("not a url").is_none());
    }

    #[test]
    fn run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.index_ttl, Duration::from_secs(DEFAULT_INDEX_TTL_SECS));
        assert_eq!(config.api_base, "https://api.github.com");
    }
}
