//! Markdown to HTML fragment rendering with GitHub Flavored Markdown extensions.

use comrak::Options;

/// Converts markdown into an HTML fragment.
///
/// Raw HTML embedded in the markdown is passed through untouched; callers are trusted.
///
/// Only the extension flags are stored. `comrak::Options` carries a non-`Send`
/// link callback slot, so it is built per call to keep the renderer shareable
/// across request tasks.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    strikethrough: bool,
    table: bool,
    autolink: bool,
    tasklist: bool,
    footnotes: bool,
    allow_raw_html: bool,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            strikethrough: true,
            table: true,
            autolink: true,
            tasklist: true,
            footnotes: true,
            allow_raw_html: true,
        }
    }

    /// Renders `markdown` into an HTML fragment.
    ///
    /// # Arguments
    /// * `markdown` - GitHub Flavored Markdown source
    ///
    /// # Returns
    /// The HTML fragment, without any surrounding document.
    pub fn render(&self, markdown: &str) -> String {
        comrak::markdown_to_html(markdown, &self.options())
    }

    fn options(&self) -> Options<'static> {
        let mut options = Options::default();

        options.extension.strikethrough = self.strikethrough;
        options.extension.table = self.table;
        options.extension.autolink = self.autolink;
        options.extension.tasklist = self.tasklist;
        options.extension.footnotes = self.footnotes;

        options.render.unsafe_ = self.allow_raw_html;

        options
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_renderer_is_shareable_across_tasks() {
        assert_send_sync::<MarkdownRenderer>();
    }

    #[test]
    fn test_heading() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.render("# Hello"), "<h1>Hello</h1>\n");
    }

    #[test]
    fn test_gfm_table() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_raw_html_passes_through() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("<div class=\"note\">kept</div>\n");
        assert!(html.contains("<div class=\"note\">kept</div>"));
    }

    #[test]
    fn test_strikethrough() {
        let renderer = MarkdownRenderer::new();
        assert!(renderer.render("~~gone~~").contains("<del>gone</del>"));
    }
}
