// Template engine and page assembly

use crate::config::SiteConfig;
use crate::error::Result;
use crate::navigation::RenderedNav;
use crate::paths::{href_for, DocumentPath};
use std::collections::HashMap;
use tera::{Context, Tera, Value};

/// Stylesheet inlined into every page so each page is self-contained
const STYLESHEET: &str = include_str!("../../assets/style.css");

/// Template engine wrapping Tera with the embedded site templates
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Create a new template engine with embedded templates
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("page.html", include_str!("../../templates/page.html.tera")),
            ("nav.html", include_str!("../../templates/nav.html.tera")),
            ("redirect.html", include_str!("../../templates/redirect.html.tera")),
        ])?;

        // Tera's own escaping turns '/' into an entity, which garbles hrefs
        tera.autoescape_on(vec![]);
        tera.register_filter("html_escape", html_escape_filter);

        Ok(Self { tera })
    }

    /// Render the sidebar list for one page
    pub fn render_nav(&self, nav: &RenderedNav) -> Result<String> {
        let mut context = Context::new();
        context.insert("items", &nav.items);

        Ok(self.tera.render("nav.html", &context)?)
    }

    /// Render a custom template with context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Composes full pages from a title, navigation and content
pub struct PageAssembler {
    engine: TemplateEngine,
    site: SiteConfig,
    page_extension: String,
}

impl PageAssembler {
    pub fn new(site: SiteConfig, page_extension: impl Into<String>) -> Result<Self> {
        Ok(Self {
            engine: TemplateEngine::new()?,
            site,
            page_extension: page_extension.into(),
        })
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Full HTML document: head, sidebar with `nav_html`, main area with
    /// `content_html`, footer.
    ///
    /// `nav_html` and `content_html` are inserted verbatim; `title` is escaped.
    pub fn assemble(&self, title: &str, nav_html: &str, content_html: &str) -> Result<String> {
        let mut context = self.site_context();
        context.insert("title", title);
        context.insert("nav_html", nav_html);
        context.insert("content_html", content_html);
        context.insert("stylesheet", STYLESHEET);
        context.insert("version", env!("CARGO_PKG_VERSION"));

        self.engine.render("page.html", &context)
    }

    /// Root page that immediately redirects to `target`'s generated page
    pub fn build_root_redirect(&self, target: &DocumentPath) -> Result<String> {
        let mut context = self.site_context();
        context.insert("target", &href_for(target, 0, &self.page_extension));

        self.engine.render("redirect.html", &context)
    }

    fn site_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site_title", &self.site.title);
        context.insert("subtitle", &self.site.subtitle);
        context.insert("lang", &self.site.lang);
        context.insert("footer_links", &self.site.footer_links);
        context
    }
}

fn html_escape_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = match value {
        Value::String(s) => html_escape(s),
        Value::Null => String::new(),
        other => html_escape(&other.to_string()),
    };
    Ok(Value::String(s))
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{NavEntry, NavigationTree};

    fn doc(raw: &str) -> DocumentPath {
        DocumentPath::parse(raw).unwrap()
    }

    fn assembler() -> PageAssembler {
        PageAssembler::new(SiteConfig::default(), "html").unwrap()
    }

    fn tree() -> NavigationTree {
        NavigationTree::from_entries(vec![
            NavEntry::page("Home", doc("readme")),
            NavEntry::section(
                "Performance",
                doc("perf"),
                vec![NavEntry::page("Occupancy", doc("perf/occupancy"))],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<div>"), "&lt;div&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
        assert_eq!(html_escape("../perf/occupancy.html"), "../perf/occupancy.html");
    }

    #[test]
    fn test_render_nav_sections_and_pages() {
        let nav = tree().resolve(&doc("perf/occupancy"), "html");
        let html = assembler().engine().render_nav(&nav).unwrap();

        assert!(html.contains(r#"<li><a href="../readme.html">Home</a></li>"#));
        assert!(html.contains(r#"<li class="section">"#));
        assert!(html.contains(r#"<a href="../perf.html">Performance</a>"#));
        assert!(html.contains(
            r#"<a href="../perf/occupancy.html" class="current" aria-current="page">Occupancy</a>"#
        ));
        assert_eq!(html.matches("aria-current").count(), 1);
    }

    #[test]
    fn test_render_nav_without_current() {
        let nav = tree().resolve(&doc("elsewhere"), "html");
        let html = assembler().engine().render_nav(&nav).unwrap();
        assert!(!html.contains("current"));
    }

    #[test]
    fn test_render_nav_escapes_titles() {
        let tree = NavigationTree::from_entries(vec![NavEntry::page("Q&A <new>", doc("qa"))]).unwrap();
        let nav = tree.resolve(&doc("qa"), "html");
        let html = assembler().engine().render_nav(&nav).unwrap();
        assert!(html.contains("Q&amp;A &lt;new&gt;"));
    }

    #[test]
    fn test_assemble_places_inputs() {
        let page = assembler()
            .assemble("Occupancy", "<ul><li>NAV</li></ul>", "<h1>Occupancy</h1><p>BODY</p>")
            .unwrap();

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Occupancy - GPU Glossary</title>"));
        assert!(page.contains("<ul><li>NAV</li></ul>"));
        assert!(page.contains("<h1>Occupancy</h1><p>BODY</p>"));
        assert!(page.contains(r#"<a href="https://modal.com/gpu-glossary" target="_blank" rel="noopener">Modal GPU Glossary</a>"#));
        assert!(page.contains(".sidebar"));

        let nav_at = page.find("NAV").unwrap();
        let body_at = page.find("BODY").unwrap();
        assert!(nav_at < body_at);
    }

    #[test]
    fn test_assemble_escapes_title() {
        let page = assembler().assemble("<script>", "", "").unwrap();
        assert!(page.contains("<title>&lt;script&gt; - GPU Glossary</title>"));
    }

    #[test]
    fn test_assemble_empty_content() {
        let page = assembler().assemble("Empty", "", "").unwrap();
        assert!(page.contains(r#"<main class="content">"#));
        assert!(page.contains("</main>"));
    }

    #[test]
    fn test_subtitle_rendered_when_set() {
        let site = SiteConfig {
            subtitle: Some("Translated edition".to_string()),
            ..SiteConfig::default()
        };
        let page = PageAssembler::new(site, "html")
            .unwrap()
            .assemble("Home", "", "")
            .unwrap();
        assert!(page.contains(r#"<p class="subtitle">Translated edition</p>"#));

        let plain = assembler().assemble("Home", "", "").unwrap();
        assert!(!plain.contains("subtitle\">"));
    }

    #[test]
    fn test_root_redirect_targets_home() {
        let html = assembler().build_root_redirect(&doc("readme")).unwrap();
        assert!(html.contains(r#"<meta http-equiv="refresh" content="0; url=readme.html">"#));
        assert!(html.contains(r#"<a href="readme.html">"#));
    }

    #[test]
    fn test_root_redirect_nested_home() {
        let assembler = PageAssembler::new(SiteConfig::default(), "htm").unwrap();
        let html = assembler.build_root_redirect(&doc("guide/intro")).unwrap();
        assert!(html.contains("url=guide/intro.htm\""));
    }
}
