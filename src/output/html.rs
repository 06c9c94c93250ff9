// HTML site generator
//
// Turns every source document into a page at its mirrored output location
// and writes the root redirect. Each document goes through
// render -> rewrite links -> resolve navigation -> assemble -> write on its
// own, so pages are generated in parallel; the navigation tree, rewriter and
// templates are shared read-only.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::navigation::NavigationTree;
use crate::output::templates::PageAssembler;
use crate::paths::{output_location_for, DocumentPath, OutputLocation};
use crate::render::{document_title, MarkdownRenderer, PulldownRenderer};
use crate::rewrite::LinkRewriter;
use crate::source::{ContentSource, SourceDocument};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration for HTML generation
#[derive(Debug, Clone)]
pub struct HtmlConfig {
    /// Output directory
    pub output_dir: PathBuf,
    /// Extension of generated pages, without the dot
    pub page_extension: String,
    /// Document the root index redirects to
    pub home: DocumentPath,
    /// Worker threads; 0 lets rayon decide
    pub jobs: usize,
    /// Remove the output directory first
    pub clean: bool,
    /// Show a progress bar while writing pages
    pub show_progress: bool,
}

impl HtmlConfig {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            output_dir: config.output.directory.clone(),
            page_extension: config.links.page_extension.clone(),
            home: config.home()?,
            jobs: config.output.jobs,
            clean: config.output.clean,
            show_progress: false,
        })
    }
}

/// A fully assembled page, not yet written
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub path: DocumentPath,
    pub location: OutputLocation,
    pub title: String,
    pub html: String,
    /// Documents referenced by rewritten links
    pub link_targets: Vec<DocumentPath>,
}

/// HTML site generator
pub struct HtmlGenerator {
    config: HtmlConfig,
    navigation: NavigationTree,
    rewriter: LinkRewriter,
    assembler: PageAssembler,
    renderer: Box<dyn MarkdownRenderer>,
}

impl HtmlGenerator {
    /// Create a generator using the default Markdown renderer
    pub fn new(
        config: HtmlConfig,
        navigation: NavigationTree,
        rewriter: LinkRewriter,
        assembler: PageAssembler,
    ) -> Self {
        Self {
            config,
            navigation,
            rewriter,
            assembler,
            renderer: Box::new(PulldownRenderer::new()),
        }
    }

    /// Build every component from a validated [`Config`]
    pub fn from_config(config: &Config) -> Result<Self> {
        let html_config = HtmlConfig::from_config(config)?;
        let assembler = PageAssembler::new(config.site.clone(), &html_config.page_extension)?;
        let renderer = PulldownRenderer::new()
            .with_strip_comments(config.content.strip_comments)
            .with_heading_anchors(config.content.heading_anchors);

        Ok(Self::new(
            html_config,
            config.navigation_tree()?,
            config.link_rewriter()?,
            assembler,
        )
        .with_renderer(renderer))
    }

    /// Replace the Markdown renderer
    pub fn with_renderer(mut self, renderer: impl MarkdownRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.config.show_progress = show_progress;
        self
    }

    pub fn navigation(&self) -> &NavigationTree {
        &self.navigation
    }

    /// Get the output directory
    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Generate the complete static site from a content source
    pub fn generate(&self, source: &dyn ContentSource) -> Result<GenerationReport> {
        if let Some(root) = source.content_root() {
            self.check_output_separate(root)?;
        }
        let documents = source.documents()?;
        self.generate_documents(&documents)
    }

    /// Generate the complete static site from already loaded documents
    pub fn generate_documents(&self, documents: &[SourceDocument]) -> Result<GenerationReport> {
        let available = unique_paths(documents)?;

        if self.config.clean && self.config.output_dir.exists() {
            info!(dir = %self.config.output_dir.display(), "removing previous output");
            fs::remove_dir_all(&self.config.output_dir)?;
        }
        fs::create_dir_all(&self.config.output_dir)?;

        let progress = self.progress_bar(documents.len());
        let pool = self.thread_pool()?;

        let pages = pool.install(|| {
            documents
                .par_iter()
                .map(|document| {
                    let page = self.render_page(document)?;
                    self.write_page(&page)?;
                    if let Some(pb) = &progress {
                        pb.set_message(page.path.to_string());
                        pb.inc(1);
                    }
                    Ok((page.path, page.link_targets))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        if let Some(pb) = progress {
            pb.finish_with_message("Pages written");
        }

        let mut report = GenerationReport {
            pages_generated: pages.len(),
            ..Default::default()
        };

        for (path, targets) in &pages {
            report.links_rewritten += targets.len();
            for target in targets {
                if !available.contains(target) {
                    warn!(page = %path, target = %target, "link target has no source document");
                    report.dangling_links.push((path.clone(), target.clone()));
                }
            }
        }
        report.dangling_links.sort();
        report.dangling_links.dedup();

        let paths: Vec<DocumentPath> = documents.iter().map(|doc| doc.path.clone()).collect();
        for missing in self.navigation.missing_from(&paths) {
            warn!(path = %missing, "navigation entry has no source document");
            report.missing_nav_entries.push(missing.clone());
        }

        if !available.contains(&self.config.home) {
            warn!(home = %self.config.home, "home document not found; index will redirect to a missing page");
        }
        self.write_redirect()?;
        report.redirect_written = true;

        info!(
            pages = report.pages_generated,
            links = report.links_rewritten,
            "site generated"
        );

        Ok(report)
    }

    /// Fail unless the output directory and `content_root` are disjoint.
    ///
    /// Cleaning an output directory that contains the sources would delete
    /// them, and pages written inside the content root mix with it.
    pub fn check_output_separate(&self, content_root: &Path) -> Result<()> {
        let content = content_root.canonicalize()?;
        let output = resolve_existing(&self.config.output_dir)?;

        if content.starts_with(&output) {
            return Err(Error::config_validation(format!(
                "output directory '{}' contains the content directory '{}'",
                self.config.output_dir.display(),
                content_root.display()
            )));
        }
        if output.starts_with(&content) {
            return Err(Error::config_validation(format!(
                "output directory '{}' is inside the content directory '{}'",
                self.config.output_dir.display(),
                content_root.display()
            )));
        }

        Ok(())
    }

    /// Render, rewrite and assemble one document
    pub fn render_page(&self, document: &SourceDocument) -> Result<RenderedPage> {
        let current = &document.path;

        let fragment = self.renderer.render(&document.text);
        let outcome = self.rewriter.rewrite_with_targets(&fragment, current)?;

        let nav = self.navigation.resolve(current, &self.config.page_extension);
        let nav_html = self.assembler.engine().render_nav(&nav)?;

        let title = document_title(&document.text, current);
        let html = self.assembler.assemble(&title, &nav_html, &outcome.html)?;

        Ok(RenderedPage {
            path: current.clone(),
            location: output_location_for(current, &self.config.page_extension),
            title,
            html,
            link_targets: outcome.targets,
        })
    }

    fn write_page(&self, page: &RenderedPage) -> Result<()> {
        let path = page.location.to_path(&self.config.output_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &page.html)?;
        debug!(page = %page.path, file = %path.display(), "wrote page");
        Ok(())
    }

    /// Write `index.<ext>` redirecting to the home document
    fn write_redirect(&self) -> Result<()> {
        let html = self.assembler.build_root_redirect(&self.config.home)?;
        let path = self
            .config
            .output_dir
            .join(format!("index.{}", self.config.page_extension));
        fs::write(&path, html)?;
        Ok(())
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if self.config.jobs > 0 {
            builder = builder.num_threads(self.config.jobs);
        }
        Ok(builder.build()?)
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.config.show_progress {
            return None;
        }

        let pb = ProgressBar::new(len as u64);
        match ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            Ok(style) => pb.set_style(style.progress_chars("#>-")),
            Err(err) => debug!(%err, "falling back to default progress style"),
        }
        Some(pb)
    }
}

/// Canonical form of `path`, which need not exist yet: the deepest existing
/// ancestor is canonicalized and the missing tail appended.
fn resolve_existing(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut missing = Vec::new();
    let mut existing = absolute.as_path();

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return Ok(missing
                .into_iter()
                .rev()
                .fold(canonical, |path, segment| path.join(segment)));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }
}

/// Document paths of `documents`, failing if two documents share one
fn unique_paths(documents: &[SourceDocument]) -> Result<HashSet<DocumentPath>> {
    let mut paths = HashSet::with_capacity(documents.len());
    for document in documents {
        if !paths.insert(document.path.clone()) {
            return Err(Error::malformed_path(
                document.path.as_str(),
                "more than one source document maps to this path",
            ));
        }
    }
    Ok(paths)
}

/// Report of what was generated
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub pages_generated: usize,
    pub links_rewritten: usize,
    pub redirect_written: bool,
    /// (page, target) pairs whose target has no source document
    pub dangling_links: Vec<(DocumentPath, DocumentPath)>,
    /// Navigation entries with no source document
    pub missing_nav_entries: Vec<DocumentPath>,
}

impl GenerationReport {
    pub fn summary(&self) -> String {
        format!(
            "Generated {} pages, {} links rewritten, index: {}, dangling links: {}, missing nav entries: {}",
            self.pages_generated,
            self.links_rewritten,
            if self.redirect_written { "yes" } else { "no" },
            self.dangling_links.len(),
            self.missing_nav_entries.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::navigation::NavEntry;
    use crate::source::DirectorySource;
    use tempfile::TempDir;

    fn doc(raw: &str) -> DocumentPath {
        DocumentPath::parse(raw).unwrap()
    }

    fn source(path: &str, text: &str) -> SourceDocument {
        SourceDocument {
            path: doc(path),
            text: text.to_string(),
        }
    }

    fn generator(output_dir: &Path) -> HtmlGenerator {
        let config = HtmlConfig {
            output_dir: output_dir.to_path_buf(),
            page_extension: "html".to_string(),
            home: doc("readme"),
            jobs: 2,
            clean: false,
            show_progress: false,
        };
        let navigation = NavigationTree::from_entries(vec![
            NavEntry::page("Home", doc("readme")),
            NavEntry::section(
                "Performance",
                doc("perf"),
                vec![NavEntry::page("Occupancy", doc("perf/occupancy"))],
            ),
        ])
        .unwrap();
        let rewriter = LinkRewriter::new(["/gpu-glossary/"], "html").unwrap();
        let assembler = PageAssembler::new(SiteConfig::default(), "html").unwrap();
        HtmlGenerator::new(config, navigation, rewriter, assembler)
    }

    #[test]
    fn test_render_page_rewrites_and_marks_nav() {
        let dir = TempDir::new().unwrap();
        let page = generator(dir.path())
            .render_page(&source(
                "perf/occupancy",
                "# Occupancy\n\nSee the [home page](/gpu-glossary/readme).\n",
            ))
            .unwrap();

        assert_eq!(page.title, "Occupancy");
        assert_eq!(page.location.as_str(), "perf/occupancy.html");
        assert!(page.html.contains(r#"<a href="../readme.html">home page</a>"#));
        assert!(page.html.contains(r#"class="current" aria-current="page">Occupancy</a>"#));
        assert_eq!(page.link_targets, vec![doc("readme")]);
    }

    #[test]
    fn test_generate_writes_pages_and_index() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("site");
        let report = generator(&out)
            .generate_documents(&[
                source("readme", "# Home\n\n[Occupancy](/gpu-glossary/perf/occupancy)\n"),
                source("perf/occupancy", "# Occupancy\n"),
            ])
            .unwrap();

        assert_eq!(report.pages_generated, 2);
        assert_eq!(report.links_rewritten, 1);
        assert!(report.redirect_written);
        assert!(report.dangling_links.is_empty());
        assert_eq!(report.missing_nav_entries, vec![doc("perf")]);

        assert!(out.join("readme.html").exists());
        assert!(out.join("perf/occupancy.html").exists());
        let index = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(index.contains("url=readme.html"));
    }

    #[test]
    fn test_generate_reports_dangling_links() {
        let dir = TempDir::new().unwrap();
        let report = generator(dir.path())
            .generate_documents(&[source("readme", "[gone](/gpu-glossary/perf/missing)\n")])
            .unwrap();

        assert_eq!(report.dangling_links, vec![(doc("readme"), doc("perf/missing"))]);
    }

    #[test]
    fn test_generate_rejects_colliding_documents() {
        let dir = TempDir::new().unwrap();
        let result = generator(dir.path())
            .generate_documents(&[source("readme", "a"), source("readme", "b")]);
        assert!(matches!(result, Err(Error::MalformedPath { .. })));
    }

    #[test]
    fn test_generate_fails_on_malformed_link() {
        let dir = TempDir::new().unwrap();
        let result = generator(dir.path())
            .generate_documents(&[source("readme", "[bad](/gpu-glossary/perf//x)\n")]);
        assert!(matches!(result, Err(Error::MalformedPath { .. })));
    }

    #[test]
    fn test_empty_document_still_emits_page() {
        let dir = TempDir::new().unwrap();
        generator(dir.path())
            .generate_documents(&[source("readme", "")])
            .unwrap();

        let page = fs::read_to_string(dir.path().join("readme.html")).unwrap();
        assert!(page.contains("<title>readme - GPU Glossary</title>"));
        assert!(page.contains("</main>"));
    }

    #[test]
    fn test_clean_removes_stale_output() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stale.html"), "old").unwrap();

        let mut site = generator(dir.path());
        site.config.clean = true;
        site.generate_documents(&[source("readme", "# Home\n")]).unwrap();

        assert!(!dir.path().join("stale.html").exists());
        assert!(dir.path().join("readme.html").exists());
    }

    #[test]
    fn test_clean_refuses_output_containing_content() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(content.join("perf")).unwrap();
        fs::write(content.join("readme.md"), "# Home\n").unwrap();
        fs::write(content.join("perf/occupancy.md"), "# Occupancy\n").unwrap();

        let mut site = generator(dir.path());
        site.config.clean = true;
        let result = site.generate(&DirectorySource::new(&content).unwrap());

        assert!(matches!(result, Err(Error::ConfigValidation(_))));
        assert!(content.join("readme.md").exists());
        assert!(content.join("perf/occupancy.md").exists());
    }

    #[test]
    fn test_output_equal_to_content_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.md"), "# Home\n").unwrap();

        let result = generator(dir.path()).generate(&DirectorySource::new(dir.path()).unwrap());
        assert!(matches!(result, Err(Error::ConfigValidation(_))));
        assert!(!dir.path().join("readme.html").exists());
    }

    #[test]
    fn test_output_inside_content_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.md"), "# Home\n").unwrap();

        let site = generator(&dir.path().join("site/out"));
        let result = site.generate(&DirectorySource::new(dir.path()).unwrap());
        assert!(matches!(result, Err(Error::ConfigValidation(_))));
    }

    #[test]
    fn test_sibling_output_is_accepted() {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        fs::create_dir_all(&content).unwrap();
        fs::write(content.join("readme.md"), "# Home\n").unwrap();

        // Shares a name prefix with the content directory but is not inside it
        let report = generator(&dir.path().join("content-site"))
            .generate(&DirectorySource::new(&content).unwrap())
            .unwrap();
        assert_eq!(report.pages_generated, 1);
    }

    #[test]
    fn test_non_ascii_link_targets_are_not_dangling() {
        let dir = TempDir::new().unwrap();
        let report = generator(dir.path())
            .generate_documents(&[
                source("readme", "[thread](/gpu-glossary/术语/线程)\n"),
                source("术语/线程", "# 线程\n"),
            ])
            .unwrap();

        assert_eq!(report.links_rewritten, 1);
        assert!(report.dangling_links.is_empty(), "{:?}", report.dangling_links);
        assert!(dir.path().join("术语/线程.html").exists());
    }

    #[test]
    fn test_generation_report_summary() {
        let report = GenerationReport {
            pages_generated: 5,
            links_rewritten: 12,
            redirect_written: true,
            ..Default::default()
        };

        let summary = report.summary();
        assert!(summary.contains("5 pages"));
        assert!(summary.contains("12 links rewritten"));
        assert!(summary.contains("index: yes"));
    }
}
