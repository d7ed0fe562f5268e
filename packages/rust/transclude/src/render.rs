//! Markdown → HTML rendering via comrak.

use comrak::Options;

/// Render Markdown to HTML with the GFM table extension and raw-HTML
/// passthrough enabled. Index-resolved definitions arrive as HTML
/// fragments and must survive rendering untouched.
pub fn render(markdown: &str) -> String {
    let mut options = Options::default();
    options.extension.table = true;
    options.render.unsafe_ = true;
    comrak::markdown_to_html(markdown, &options)
}
