//! Transclusion of resolved term definitions into rendered HTML.
//!
//! The rendered document marks externally defined terms with
//! `<dt><span class="transcluded-xref-term">label</span></dt>`
//! placeholders inside its glossary definition list. For every
//! placeholder with a matching dataset record, two `<dd>` siblings are
//! inserted directly after the `<dt>`: a provenance block first, the
//! definition content second. Placeholders without a match are left
//! untouched.

mod cleanup;
mod render;

use scraper::{ElementRef, Html, Selector};
use termweave_shared::{XrefDataset, XrefRecord};
use tracing::{debug, info};

pub use render::render;

const META_DD_CLASS: &str = "transcluded-xref-term meta-info-content-wrapper";
const CONTENT_DD_CLASS: &str = "transcluded-xref-term transcluded-xref-term-embedded";

/// Inject definition and provenance blocks for every matched
/// placeholder in `html`. Term matching is case-insensitive, the same
/// policy the resolvers use.
pub fn transclude(html: &str, dataset: &XrefDataset) -> String {
    let doc = Html::parse_document(html);
    let dt_selector = Selector::parse("dt").expect("valid selector");
    let span_selector = Selector::parse("span.transcluded-xref-term").expect("valid selector");

    // Work on the parser's normalized serialization so the outer HTML
    // of each `dt` is a guaranteed substring. The cursor only ever
    // moves forward, so byte-identical placeholders (the same term
    // twice in a glossary) each receive their own insertion instead of
    // stacking after the first occurrence.
    let mut result = doc.html();
    let mut cursor = 0usize;
    let mut injected = 0usize;

    for dt in doc.select(&dt_selector) {
        let dt_html = dt.html();
        let Some(found) = result[cursor..].find(&dt_html) else {
            continue;
        };
        let after_dt = cursor + found + dt_html.len();
        cursor = after_dt;

        let Some(span) = dt.select(&span_selector).next() else {
            continue;
        };

        let label = element_label(&span);
        if label.is_empty() {
            continue;
        }

        let Some(record) = dataset.find_term(&label) else {
            debug!(%label, "no dataset record for placeholder");
            continue;
        };
        let Some(content) = record.content.as_deref() else {
            debug!(%label, "dataset record carries no definition content");
            continue;
        };

        let insertion = format!("{}{}", meta_info_block(record), definition_block(content));
        result.insert_str(after_dt, &insertion);
        cursor = after_dt + insertion.len();
        injected += 1;
    }

    info!(injected, "transclusion finished");
    result
}

/// Placeholder label: the concatenated direct text children, trimmed,
/// falling back to the full descendant text.
fn element_label(el: &ElementRef) -> String {
    let direct: String = el
        .children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect();
    let direct = direct.trim();
    if !direct.is_empty() {
        return direct.to_string();
    }
    el.text().collect::<String>().trim().to_string()
}

/// Definition `<dd>`: cleaned source Markdown rendered to HTML.
fn definition_block(content: &str) -> String {
    let cleaned = cleanup::run_pipeline(content);
    format!(
        "<dd class=\"{CONTENT_DD_CLASS}\">{}</dd>",
        render(&cleaned)
    )
}

/// Provenance `<dd>`: a rendered table of the record's origin. Missing
/// values show the literal `Unknown` rather than dropping the row.
fn meta_info_block(record: &XrefRecord) -> String {
    let owner = record.owner.as_deref().unwrap_or("Unknown");
    let owner_cell = match record.avatar_url.as_deref() {
        Some(url) => format!(r#"<img src="{url}" alt="avatar" width="20" /> {owner}"#),
        None => owner.to_string(),
    };

    let repo_cell = match (record.repo.as_deref(), record.repo_url.as_deref()) {
        (Some(repo), Some(url)) => format!("[{repo}]({url})"),
        (Some(repo), None) => repo.to_string(),
        _ => "Unknown".to_string(),
    };

    let commit_cell = record.commit_hash.as_deref().unwrap_or("Unknown");

    let table = format!(
        "| Property | Value |\n\
         | --- | --- |\n\
         | Owner | {owner_cell} |\n\
         | Repo | {repo_cell} |\n\
         | Commit hash | {commit_cell} |\n"
    );

    format!("<dd class=\"{META_DD_CLASS}\">{}</dd>", render(&table))
}
