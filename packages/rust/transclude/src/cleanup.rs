//! Cleanup pipeline for fetched definition Markdown.
//!
//! Each pass is a function `&str -> String` applied in sequence. The
//! passes strip the source repository's own marker syntax so only the
//! definition prose reaches the renderer.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw definition Markdown.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = md.to_string();

    result = strip_def_markers(&result);
    result = strip_leading_tildes(&result);
    result = strip_ref_tokens(&result);

    result
}

/// Remove `[[def: …]]` declaration markers entirely.
fn strip_def_markers(md: &str) -> String {
    static DEF_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\[def:.*?\]\]").expect("valid regex"));
    DEF_RE.replace_all(md, "").into_owned()
}

/// Strip one leading `~` (and surrounding spaces) per line, the
/// definition-list shorthand used in term source files.
fn strip_leading_tildes(md: &str) -> String {
    static TILDE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^[ \t]*~[ \t]*").expect("valid regex"));
    TILDE_RE.replace_all(md, "").into_owned()
}

/// Unwrap `[[ref: …]]` links to their bare label.
fn strip_ref_tokens(md: &str) -> String {
    md.replace("[[ref:", "").replace("]]", "")
}
