//! Core domain types for external term reference resolution.
//!
//! Serialized field names follow the on-disk dataset contract
//! (`xrefs-data.json`), which downstream rendered pages consume.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// XrefRecord
// ---------------------------------------------------------------------------

/// One external term reference extracted from the document corpus.
///
/// Identity is the `(external_spec, term)` pair, case-sensitive as
/// extracted. The record is created by the extractor and enriched in
/// place by the resolvers and the aggregator; once a run's dataset is
/// written the record is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefRecord {
    /// Short name of the external spec, e.g. `PE`.
    #[serde(rename = "externalSpec")]
    pub external_spec: String,

    /// The referenced term, trimmed as extracted.
    pub term: String,

    /// Source repository URL from the configuration mapping.
    #[serde(rename = "repoUrl", default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    /// Subdirectory inside the repository that holds term files.
    #[serde(rename = "terms_dir", default, skip_serializing_if = "Option::is_none")]
    pub terms_dir: Option<String>,

    /// Repository owner, derived from `repo_url` path segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Repository name, derived from `repo_url` path segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Display site URL for the external spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    /// Latest commit hash of the term's source file (provenance only).
    #[serde(rename = "commitHash", default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,

    /// Raw definition content fetched from the external repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Avatar URL of the repository owner, when the lookup provided one.
    #[serde(rename = "avatarUrl", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl XrefRecord {
    /// A bare record as produced by the extractor, before config enrichment.
    pub fn new(external_spec: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            external_spec: external_spec.into(),
            term: term.into(),
            repo_url: None,
            terms_dir: None,
            owner: None,
            repo: None,
            site: None,
            commit_hash: None,
            content: None,
            avatar_url: None,
        }
    }

    /// Filename slug for the term's source file: spaces to dashes, lowercase.
    pub fn term_slug(&self) -> String {
        self.term.replace(' ', "-").to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// ResolvedTerm
// ---------------------------------------------------------------------------

/// A term definition located in an external repository, the unit
/// consumed by the transclusion renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedTerm {
    /// The term label as it appears in the external source.
    pub term: String,
    /// Definition content (Markdown from the search path, HTML fragment
    /// from the index path).
    pub content: String,
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Repository URL.
    #[serde(rename = "repoUrl")]
    pub repo_url: String,
    /// Latest commit hash of the defining file, when available.
    #[serde(rename = "commitHash", default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    /// Owner avatar URL, when available.
    #[serde(rename = "avatarUrl", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// TermIndex
// ---------------------------------------------------------------------------

/// One term and its definition extracted from a rendered index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    /// Visible term label.
    pub term: String,
    /// Definition as an HTML fragment (the `<dd>` markup, joined).
    pub definition: String,
}

/// The full term → definition map extracted from one external
/// repository's rendered specification page. Built once per cache miss
/// and reused for every lookup against that repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermIndex {
    /// Build time, epoch milliseconds.
    pub timestamp: i64,
    /// `owner/repo` of the external repository.
    pub repository: String,
    /// All extracted terms, in document order.
    pub terms: Vec<TermEntry>,
    /// Commit hash of the scraped index document, when available.
    pub sha: Option<String>,
    /// Owner avatar URL (not derivable from the rendered page).
    #[serde(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
    /// Name of the timestamped audit file this index was persisted to.
    #[serde(rename = "outputFileName")]
    pub output_file_name: String,
}

impl TermIndex {
    /// Case-insensitive exact lookup of a term label. No fuzzy matching.
    pub fn find(&self, term: &str) -> Option<&TermEntry> {
        let wanted = term.to_lowercase();
        self.terms.iter().find(|t| t.term.to_lowercase() == wanted)
    }
}

// ---------------------------------------------------------------------------
// XrefDataset
// ---------------------------------------------------------------------------

/// The consolidated dataset: every reference record with whatever
/// enrichment its resolvers managed to attach.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XrefDataset {
    /// All reference records for the run.
    pub xrefs: Vec<XrefRecord>,
}

impl XrefDataset {
    /// First record whose term matches `label`, case-insensitively.
    pub fn find_term(&self, label: &str) -> Option<&XrefRecord> {
        let wanted = label.to_lowercase();
        self.xrefs.iter().find(|x| x.term.to_lowercase() == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xref_record_serializes_with_contract_field_names() {
        let mut record = XrefRecord::new("PE", "Holder");
        record.repo_url = Some("https://github.com/example/presentation-exchange".into());
        record.commit_hash = Some("f66951f".into());

        let json = serde_json::to_string(&record).expect("serialize");
        assert!(json.contains("\"externalSpec\":\"PE\""));
        assert!(json.contains("\"repoUrl\""));
        assert!(json.contains("\"commitHash\""));
        // Unset optional fields are omitted entirely
        assert!(!json.contains("terms_dir"));
        assert!(!json.contains("avatarUrl"));
    }

    #[test]
    fn term_slug_dashes_and_lowercases() {
        let record = XrefRecord::new("PE", "Presentation Definition");
        assert_eq!(record.term_slug(), "presentation-definition");
    }

    #[test]
    fn term_index_lookup_is_case_insensitive() {
        let index = TermIndex {
            timestamp: 0,
            repository: "example/spec".into(),
            terms: vec![TermEntry {
                term: "Holder".into(),
                definition: "<dd>An entity.</dd>".into(),
            }],
            sha: None,
            avatar_url: None,
            output_file_name: "0-example-spec-terms.json".into(),
        };

        assert!(index.find("holder").is_some());
        assert!(index.find("HOLDER").is_some());
        assert_eq!(index.find("Holder"), index.find("holder"));
        assert!(index.find("Issuer").is_none());
    }

    #[test]
    fn dataset_find_term_returns_first_match() {
        let mut a = XrefRecord::new("PE", "Holder");
        a.owner = Some("first".into());
        let mut b = XrefRecord::new("TM", "holder");
        b.owner = Some("second".into());

        let dataset = XrefDataset { xrefs: vec![a, b] };
        let found = dataset.find_term("HOLDER").expect("match");
        assert_eq!(found.owner.as_deref(), Some("first"));
    }
}
