//! End-to-end `collect` pipeline: corpus scan → resolution → dataset.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};

use termweave_cache::CacheStore;
use termweave_extractor::extract_references;
use termweave_github::GithubClient;
use termweave_resolver::TermResolver;
use termweave_shared::{
    Result, RunConfig, SPECS_FILE_NAME, SpecsConfig, XrefDataset, XrefRecord,
};

use crate::dataset::write_dataset;

/// Configuration for the `collect` pipeline.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// Directory containing `specs.json` and the document corpus.
    pub base_dir: PathBuf,
    /// Runtime knobs shared with stores and resolvers.
    pub run: RunConfig,
}

/// Result of the `collect` pipeline.
#[derive(Debug)]
pub struct CollectResult {
    /// Path of the written snapshot file.
    pub dataset_path: PathBuf,
    /// Number of reference records in the dataset.
    pub record_count: usize,
    /// How many of them resolved to definition content.
    pub resolved_count: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Run the full collection pipeline.
///
/// References are processed sequentially, each to completion before
/// the next; the dataset is written strictly after every resolution
/// and enrichment attempt has finished. Unresolvable references stay
/// in the dataset without content. After quota exhaustion the client
/// stops issuing live API calls, but every remaining reference still
/// gets its resolution attempt so cached lookups keep succeeding.
/// The pipeline itself fails only on configuration or output I/O
/// problems, never on remote lookups.
#[instrument(skip(config), fields(base_dir = %config.base_dir.display()))]
pub async fn collect(config: CollectConfig) -> Result<CollectResult> {
    let started = Instant::now();

    let specs = SpecsConfig::load(&config.base_dir.join(SPECS_FILE_NAME))?;
    let mut records = extract_references(&specs, &config.base_dir)?;

    let client = GithubClient::new(&config.run)?;
    let cache = CacheStore::new(&config.run.cache_dir);

    let mut resolved_count = 0;
    let mut rate_limited = false;

    for record in &mut records {
        if record.repo_url.is_none() {
            warn!(
                external_spec = %record.external_spec,
                term = %record.term,
                "no repository configured, leaving unresolved"
            );
            continue;
        }

        let resolver = TermResolver::for_record(record, &client, &cache, &config.run);
        match resolver.resolve(record).await {
            Ok(Some(resolved)) => {
                record.content = Some(resolved.content);
                record.commit_hash = resolved.commit_hash;
                if record.avatar_url.is_none() {
                    record.avatar_url = resolved.avatar_url;
                }
                resolved_count += 1;
                info!(term = %record.term, "resolved");
            }
            Ok(None) => {
                info!(
                    external_spec = %record.external_spec,
                    term = %record.term,
                    "term not found in external repository"
                );
            }
            Err(e) => {
                if !rate_limited {
                    warn!(error = %e, "quota exhausted, remaining references resolve from cache only");
                    rate_limited = true;
                }
            }
        }

        enrich_commit_hash(record, &client).await;
    }

    let dataset = XrefDataset { xrefs: records };
    let paths = write_dataset(&config.run.output_dir, &dataset)?;

    let result = CollectResult {
        dataset_path: paths.json,
        record_count: dataset.xrefs.len(),
        resolved_count,
        elapsed: started.elapsed(),
    };
    info!(
        records = result.record_count,
        resolved = result.resolved_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "collection finished"
    );
    Ok(result)
}

/// Overwrite the record's commit hash with the newest commit of its
/// conventional term file, `{terms_dir}/{term-slug}.md`. Only applies
/// to repositories with a known raw-source layout; lookup failure
/// keeps whatever hash resolution already attached.
async fn enrich_commit_hash(record: &mut XrefRecord, client: &GithubClient) {
    let (Some(terms_dir), Some(owner), Some(repo)) = (
        record.terms_dir.as_deref(),
        record.owner.as_deref(),
        record.repo.as_deref(),
    ) else {
        return;
    };

    let path = format!("{terms_dir}/{}.md", record.term_slug());
    if let Some(sha) = client.latest_commit(owner, repo, &path).await {
        record.commit_hash = Some(sha);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::load_dataset;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn encode(content: &str) -> String {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        STANDARD.encode(content.as_bytes())
    }

    /// Corpus with one `[[xref: PE, Holder]]` marker and a PE → repo
    /// mapping pointing at the mock server for API calls.
    fn corpus(dir: &std::path::Path) {
        let terms = dir.join("spec").join("term-definitions");
        std::fs::create_dir_all(&terms).expect("dirs");
        std::fs::write(
            terms.join("overview.md"),
            "The [[xref: PE, Holder]] presents credentials.\n",
        )
        .expect("write md");

        std::fs::write(
            dir.join(SPECS_FILE_NAME),
            r#"{
                "specs": [{
                    "spec_directory": "spec",
                    "spec_terms_directory": "term-definitions",
                    "external_specs_repos": [{
                        "external_spec": "PE",
                        "url": "https://github.com/example/glossary",
                        "terms_dir": "spec"
                    }],
                    "external_specs": [
                        { "PE": "https://identity.example.com/glossary" }
                    ]
                }]
            }"#,
        )
        .expect("write specs.json");
    }

    fn config_for(dir: &std::path::Path, server: &MockServer) -> CollectConfig {
        CollectConfig {
            base_dir: dir.to_path_buf(),
            run: RunConfig {
                cache_dir: dir.join("cache"),
                output_dir: dir.join("output"),
                api_base: server.uri(),
                raw_base: server.uri(),
                ..RunConfig::default()
            },
        }
    }

    async fn mount_happy_path(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/search/code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 1,
                "items": [{
                    "path": "spec/holder.md",
                    "repository": {
                        "name": "glossary",
                        "owner": {
                            "login": "example",
                            "avatar_url": "https://avatars.example.com/u/1"
                        }
                    },
                    "text_matches": [{ "fragment": "[[def: holder, Holder]]\n~ An entity." }]
                }]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/example/glossary/contents/spec/holder.md"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": encode("[[def: holder, Holder]]\n~ An entity that holds credentials.\n")
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/example/glossary/commits"))
            .and(query_param("per_page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "sha": "f66951f" }
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn collect_resolves_and_writes_dataset() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        corpus(dir.path());
        mount_happy_path(&server).await;

        let result = collect(config_for(dir.path(), &server)).await.expect("collect");
        assert_eq!(result.record_count, 1);
        assert_eq!(result.resolved_count, 1);
        assert!(result.dataset_path.exists());

        let dataset = load_dataset(&dir.path().join("output")).expect("load");
        let record = &dataset.xrefs[0];
        assert_eq!(record.external_spec, "PE");
        assert_eq!(record.term, "Holder");
        assert_eq!(record.owner.as_deref(), Some("example"));
        assert_eq!(record.repo.as_deref(), Some("glossary"));
        assert_eq!(record.commit_hash.as_deref(), Some("f66951f"));
        assert!(
            record
                .content
                .as_deref()
                .is_some_and(|c| c.contains("holds credentials"))
        );
        assert_eq!(
            record.site.as_deref(),
            Some("https://identity.example.com/glossary")
        );
    }

    #[tokio::test]
    async fn unresolvable_term_stays_in_dataset_without_content() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        corpus(dir.path());

        Mock::given(method("GET"))
            .and(path("/search/code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 0,
                "items": []
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/example/glossary/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "sha": "f66951f" }
            ])))
            .mount(&server)
            .await;

        let result = collect(config_for(dir.path(), &server)).await.expect("collect");
        assert_eq!(result.record_count, 1);
        assert_eq!(result.resolved_count, 0);

        let dataset = load_dataset(&dir.path().join("output")).expect("load");
        assert!(dataset.xrefs[0].content.is_none());
        // Enrichment still ran for the configured repository.
        assert_eq!(dataset.xrefs[0].commit_hash.as_deref(), Some("f66951f"));
    }

    #[tokio::test]
    async fn rate_limit_abandons_remaining_lookups_but_completes() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        corpus(dir.path());

        // Second marker so there is a remaining record to abandon.
        let terms = dir.path().join("spec").join("term-definitions");
        std::fs::write(terms.join("more.md"), "[[xref: PE, Issuer]]\n").expect("write");

        Mock::given(method("GET"))
            .and(path("/search/code"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1767225600"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = collect(config_for(dir.path(), &server)).await.expect("collect");
        assert_eq!(result.record_count, 2);
        assert_eq!(result.resolved_count, 0);
        // Mock::expect(1) verifies the second record's lookup failed
        // fast client-side instead of issuing another search.

        let dataset = load_dataset(&dir.path().join("output")).expect("load");
        assert_eq!(dataset.xrefs.len(), 2);
        assert!(dataset.xrefs.iter().all(|x| x.content.is_none()));
    }

    #[tokio::test]
    async fn rate_limited_run_still_resolves_cached_references() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        corpus(dir.path());

        // A second, uncached marker that will hit the exhausted quota.
        let terms = dir.path().join("spec").join("term-definitions");
        std::fs::write(terms.join("more.md"), "[[xref: PE, Issuer]]\n").expect("write");

        // Pre-seed the cache with Holder's search response and file
        // content, as a previous run would have left them.
        let cache = termweave_cache::CacheStore::new(dir.path().join("cache"));
        let search_key = termweave_cache::CacheStore::generate_key(&[
            "search",
            "[[def: Holder",
            "example",
            "glossary",
            "spec",
        ]);
        cache
            .put_text(
                &search_key,
                &serde_json::json!({
                    "total_count": 1,
                    "items": [{
                        "path": "spec/holder.md",
                        "repository": {
                            "name": "glossary",
                            "owner": {
                                "login": "example",
                                "avatar_url": "https://avatars.example.com/u/1"
                            }
                        },
                        "text_matches": [{ "fragment": "[[def: holder, Holder]]" }]
                    }]
                })
                .to_string(),
            )
            .expect("seed search");
        let file_key = termweave_cache::CacheStore::generate_key(&[
            "file",
            "example",
            "glossary",
            "spec/holder.md",
        ]);
        cache
            .put_text(
                &file_key,
                "[[def: holder, Holder]]\n~ An entity that holds credentials.\n",
            )
            .expect("seed file");

        // Every live search exhausts the quota.
        Mock::given(method("GET"))
            .and(path("/search/code"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("x-ratelimit-reset", "1767225600"),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/repos/example/glossary/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "sha": "f66951f" }
            ])))
            .mount(&server)
            .await;

        let result = collect(config_for(dir.path(), &server)).await.expect("collect");
        assert_eq!(result.record_count, 2);
        assert_eq!(result.resolved_count, 1);

        let dataset = load_dataset(&dir.path().join("output")).expect("load");
        let holder = dataset
            .xrefs
            .iter()
            .find(|x| x.term == "Holder")
            .expect("holder record");
        assert!(
            holder
                .content
                .as_deref()
                .is_some_and(|c| c.contains("holds credentials")),
            "cached reference must resolve after the quota is exhausted"
        );

        let issuer = dataset
            .xrefs
            .iter()
            .find(|x| x.term == "Issuer")
            .expect("issuer record");
        assert!(issuer.content.is_none());
    }

    #[tokio::test]
    async fn unconfigured_spec_is_kept_but_never_looked_up() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");
        corpus(dir.path());

        let terms = dir.path().join("spec").join("term-definitions");
        std::fs::write(terms.join("stray.md"), "[[xref: UNKNOWN, Widget]]\n").expect("write");
        mount_happy_path(&server).await;

        let result = collect(config_for(dir.path(), &server)).await.expect("collect");
        assert_eq!(result.record_count, 2);
        assert_eq!(result.resolved_count, 1);

        let dataset = load_dataset(&dir.path().join("output")).expect("load");
        let stray = dataset
            .xrefs
            .iter()
            .find(|x| x.external_spec == "UNKNOWN")
            .expect("kept");
        assert!(stray.repo_url.is_none());
        assert!(stray.content.is_none());
    }

    #[tokio::test]
    async fn missing_specs_json_fails_the_pipeline() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("tempdir");

        let err = collect(config_for(dir.path(), &server)).await.unwrap_err();
        assert!(matches!(err, termweave_shared::TermweaveError::Io { .. }));
    }
}
