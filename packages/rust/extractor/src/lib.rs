//! Reference extraction from the Markdown document corpus.
//!
//! Scans every `.md` file under the configured term directories for
//! `[[xref: spec, term]]` markers, collapses duplicates across
//! documents, and enriches each record with the repository mapping
//! from `specs.json`. A referenced spec with no configuration entry is
//! kept (and later skipped with a warning) rather than aborting the run.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use termweave_shared::{Result, SpecsConfig, TermweaveError, XrefRecord, parse_owner_repo};

/// Marker grammar: spec and term split on the first comma, both trimmed.
static XREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[xref:(.*?)\]\]").expect("valid regex"));

/// Extract all xref markers from one Markdown document.
///
/// Returns `(external_spec, term)` pairs in document order. Markers
/// without a comma separator are malformed and skipped with a warning.
pub fn extract_markers(markdown: &str) -> Vec<(String, String)> {
    let mut markers = Vec::new();

    for caps in XREF_RE.captures_iter(markdown) {
        let inner = &caps[1];
        match inner.split_once(',') {
            Some((spec, term)) => {
                markers.push((spec.trim().to_string(), term.trim().to_string()));
            }
            None => {
                warn!(marker = %&caps[0], "malformed xref marker, skipping");
            }
        }
    }

    markers
}

/// Scan the corpus described by `config` and produce the deduplicated,
/// config-enriched list of reference records.
pub fn extract_references(config: &SpecsConfig, base_dir: &Path) -> Result<Vec<XrefRecord>> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut records: Vec<XrefRecord> = Vec::new();

    for dir in config.term_directories() {
        let dir = base_dir.join(dir);
        debug!(?dir, "scanning term directory");

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(?dir, error = %e, "term directory unreadable, skipping");
                continue;
            }
        };

        for entry in entries {
            let entry = entry.map_err(|e| TermweaveError::io(&dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }

            let markdown =
                std::fs::read_to_string(&path).map_err(|e| TermweaveError::io(&path, e))?;

            for (spec, term) in extract_markers(&markdown) {
                if seen.insert((spec.clone(), term.clone())) {
                    debug!(%spec, %term, file = %path.display(), "xref found");
                    records.push(XrefRecord::new(spec, term));
                }
            }
        }
    }

    for record in &mut records {
        enrich_from_config(record, config);
    }

    info!(count = records.len(), "extracted reference records");
    Ok(records)
}

/// Attach repository URL, terms directory, owner/repo, and display site
/// from the configuration mapping. Missing mapping is not fatal.
fn enrich_from_config(record: &mut XrefRecord, config: &SpecsConfig) {
    match config.repo_for(&record.external_spec) {
        Some(repo) => {
            record.repo_url = Some(repo.url.clone());
            record.terms_dir = Some(repo.terms_dir.clone());

            match parse_owner_repo(&repo.url) {
                Some((owner, name)) => {
                    record.owner = Some(owner);
                    record.repo = Some(name);
                }
                None => {
                    warn!(
                        external_spec = %record.external_spec,
                        url = %repo.url,
                        "repository URL has no owner/repo path segments"
                    );
                }
            }
        }
        None => {
            warn!(
                external_spec = %record.external_spec,
                term = %record.term,
                "no repository configured for external spec"
            );
        }
    }

    record.site = config.site_for(&record.external_spec).map(String::from);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> SpecsConfig {
        serde_json::from_str(
            r#"{
                "specs": [{
                    "spec_directory": "spec",
                    "spec_terms_directory": "term-definitions",
                    "external_specs_repos": [{
                        "external_spec": "PE",
                        "url": "https://github.com/example/presentation-exchange",
                        "terms_dir": "spec"
                    }],
                    "external_specs": [
                        { "PE": "https://identity.example.com/presentation-exchange" }
                    ]
                }]
            }"#,
        )
        .expect("config")
    }

    #[test]
    fn markers_are_trimmed_on_both_sides() {
        let markers = extract_markers("See [[xref:  PE ,  Holder  ]] for details.");
        assert_eq!(markers, vec![("PE".into(), "Holder".into())]);
    }

    #[test]
    fn first_comma_splits_spec_and_term() {
        let markers = extract_markers("[[xref: TM, holder, of credentials]]");
        assert_eq!(
            markers,
            vec![("TM".into(), "holder, of credentials".into())]
        );
    }

    #[test]
    fn malformed_marker_without_comma_is_skipped() {
        let markers = extract_markers("[[xref: no-comma-here]] then [[xref: A, b]]");
        assert_eq!(markers, vec![("A".into(), "b".into())]);
    }

    #[test]
    fn multiple_markers_in_one_line() {
        let markers = extract_markers("[[xref: A, x]] and [[xref: B, y]]");
        assert_eq!(markers.len(), 2);
    }

    #[test]
    fn duplicate_markers_across_documents_collapse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let terms = dir.path().join("spec").join("term-definitions");
        std::fs::create_dir_all(&terms).expect("dirs");

        std::fs::write(terms.join("a.md"), "[[xref: PE, Holder]]").expect("write");
        std::fs::write(
            terms.join("b.md"),
            "[[xref: PE, Holder]]\n[[xref: PE, Issuer]]",
        )
        .expect("write");
        std::fs::write(terms.join("notes.txt"), "[[xref: PE, Ignored]]").expect("write");

        let records = extract_references(&sample_config(), dir.path()).expect("extract");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].term, "Holder");
        assert_eq!(records[1].term, "Issuer");
    }

    #[test]
    fn records_enriched_from_config_mapping() {
        let dir = tempfile::tempdir().expect("tempdir");
        let terms = dir.path().join("spec").join("term-definitions");
        std::fs::create_dir_all(&terms).expect("dirs");
        std::fs::write(terms.join("a.md"), "[[xref: PE, Holder]]").expect("write");

        let records = extract_references(&sample_config(), dir.path()).expect("extract");
        let record = &records[0];
        assert_eq!(record.external_spec, "PE");
        assert_eq!(
            record.repo_url.as_deref(),
            Some("https://github.com/example/presentation-exchange")
        );
        assert_eq!(record.terms_dir.as_deref(), Some("spec"));
        assert_eq!(record.owner.as_deref(), Some("example"));
        assert_eq!(record.repo.as_deref(), Some("presentation-exchange"));
        assert_eq!(
            record.site.as_deref(),
            Some("https://identity.example.com/presentation-exchange")
        );
    }

    #[test]
    fn unconfigured_spec_keeps_bare_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let terms = dir.path().join("spec").join("term-definitions");
        std::fs::create_dir_all(&terms).expect("dirs");
        std::fs::write(terms.join("a.md"), "[[xref: UNKNOWN, Widget]]").expect("write");

        let records = extract_references(&sample_config(), dir.path()).expect("extract");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_spec, "UNKNOWN");
        assert!(records[0].repo_url.is_none());
        assert!(records[0].owner.is_none());
    }

    #[test]
    fn missing_term_directory_is_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let records = extract_references(&sample_config(), dir.path()).expect("extract");
        assert!(records.is_empty());
    }
}
