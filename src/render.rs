//! Markdown rendering.
//!
//! The generator only needs `markdown -> html fragment`; [`MarkdownRenderer`]
//! keeps that seam swappable. [`PulldownRenderer`] is the default, with
//! GitHub-flavored tables, strikethrough and task lists, and heading anchors.

use crate::paths::DocumentPath;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+?)[ \t#]*$").expect("valid regex"));

static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

/// Converts Markdown to an HTML fragment
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// `pulldown-cmark` based renderer
#[derive(Debug, Clone)]
pub struct PulldownRenderer {
    strip_comments: bool,
    heading_anchors: bool,
}

impl Default for PulldownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PulldownRenderer {
    pub fn new() -> Self {
        Self {
            strip_comments: true,
            heading_anchors: true,
        }
    }

    /// Drop `<!-- ... -->` blocks (front-matter style metadata) before rendering
    pub fn with_strip_comments(mut self, enabled: bool) -> Self {
        self.strip_comments = enabled;
        self
    }

    /// Give headings a slug `id` so they can be linked to
    pub fn with_heading_anchors(mut self, enabled: bool) -> Self {
        self.heading_anchors = enabled;
        self
    }

    pub fn parser_options(&self) -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_HEADING_ATTRIBUTES
    }
}

impl MarkdownRenderer for PulldownRenderer {
    fn render(&self, markdown: &str) -> String {
        let source = if self.strip_comments {
            strip_comments(markdown)
        } else {
            Cow::Borrowed(markdown)
        };

        let parser = Parser::new_ext(&source, self.parser_options());
        let mut out = String::with_capacity(source.len() * 3 / 2);

        if self.heading_anchors {
            html::push_html(&mut out, with_heading_ids(parser.collect()).into_iter());
        } else {
            html::push_html(&mut out, parser);
        }

        out
    }
}

/// Assign slug ids to headings that don't declare one.
///
/// Repeated slugs get a numeric suffix (`usage`, `usage-1`, ...).
fn with_heading_ids(mut events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut used: HashMap<String, usize> = HashMap::new();

    for index in 0..events.len() {
        let needs_id = matches!(&events[index], Event::Start(Tag::Heading { id: None, .. }));
        if !needs_id {
            continue;
        }

        let text: String = events[index + 1..]
            .iter()
            .take_while(|event| !matches!(event, Event::End(TagEnd::Heading(_))))
            .filter_map(|event| match event {
                Event::Text(text) | Event::Code(text) => Some(text.as_ref()),
                _ => None,
            })
            .collect();

        let base = slugify(&text);
        if base.is_empty() {
            continue;
        }
        let count = used.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;

        if let Event::Start(Tag::Heading { id, .. }) = &mut events[index] {
            *id = Some(CowStr::from(slug));
        }
    }

    events
}

/// Remove HTML comments from Markdown source
pub fn strip_comments(markdown: &str) -> Cow<'_, str> {
    COMMENT_RE.replace_all(markdown, "")
}

/// Text of the first level-1 heading outside code blocks
pub fn extract_title(markdown: &str) -> Option<String> {
    let without_comments = strip_comments(markdown);
    let without_code = CODE_BLOCK_RE.replace_all(&without_comments, "");
    H1_RE
        .captures(&without_code)
        .and_then(|caps| caps.get(1))
        .map(|title| title.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Page title: first H1, otherwise the last segment of the document path
pub fn document_title(markdown: &str, path: &DocumentPath) -> String {
    extract_title(markdown).unwrap_or_else(|| path.name().to_string())
}

/// Convert text to URL-friendly slug
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(markdown: &str) -> String {
        PulldownRenderer::new().render(markdown)
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What is a Warp?"), "what-is-a-warp");
        assert_eq!(slugify("  spaced  out  "), "spaced-out");
        assert_eq!(slugify("libcuda.so"), "libcuda-so");
    }

    #[test]
    fn test_render_basic_markdown() {
        let html = render("Some *emphasis* and a [link](/gpu-glossary/perf/occupancy).");
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains(r#"<a href="/gpu-glossary/perf/occupancy">link</a>"#));
    }

    #[test]
    fn test_render_tables() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_render_fenced_code() {
        let html = render("```cuda\n__global__ void k() {}\n```\n");
        assert!(html.contains(r#"<code class="language-cuda">"#));
        assert!(html.contains("__global__ void k() {}"));
    }

    #[test]
    fn test_heading_ids() {
        let html = render("# What is a Warp?\n\n## Usage\n\n## Usage\n");
        assert!(html.contains(r#"<h1 id="what-is-a-warp">What is a Warp?</h1>"#));
        assert!(html.contains(r#"<h2 id="usage">Usage</h2>"#));
        assert!(html.contains(r#"<h2 id="usage-1">Usage</h2>"#));
    }

    #[test]
    fn test_explicit_heading_id_is_kept() {
        let html = render("## Occupancy {#occ}\n");
        assert!(html.contains(r#"<h2 id="occ">Occupancy</h2>"#));
    }

    #[test]
    fn test_heading_anchors_can_be_disabled() {
        let html = PulldownRenderer::new()
            .with_heading_anchors(false)
            .render("# Title\n");
        assert_eq!(html.trim(), "<h1>Title</h1>");
    }

    #[test]
    fn test_comments_are_stripped() {
        let markdown = "<!--\nsource: upstream\n-->\n# Title\n\nBody\n";
        let html = render(markdown);
        assert!(!html.contains("source: upstream"));
        assert!(html.contains("Body"));

        let kept = PulldownRenderer::new()
            .with_strip_comments(false)
            .render(markdown);
        assert!(kept.contains("source: upstream"));
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title("intro\n\n# What is Occupancy? #\n\ntext").as_deref(),
            Some("What is Occupancy?")
        );
        assert_eq!(extract_title("## Only a subheading\n"), None);
        assert_eq!(extract_title("```\n# not a title\n```\n"), None);
        assert_eq!(extract_title("<!-- # hidden -->\n# Shown\n").as_deref(), Some("Shown"));
    }

    #[test]
    fn test_document_title_falls_back_to_name() {
        let path = DocumentPath::parse("perf/occupancy").unwrap();
        assert_eq!(document_title("no heading here", &path), "occupancy");
        assert_eq!(document_title("# Occupancy\n", &path), "Occupancy");
    }

    #[test]
    fn test_empty_markdown_renders_empty_fragment() {
        assert_eq!(render(""), "");
    }
}
