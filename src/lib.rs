//! mdsite - Generate a navigable static HTML site from Markdown documents
//!
//! Renders a tree of Markdown files into mirrored HTML pages with a fixed
//! sidebar navigation, rewriting content-root links into page-relative
//! paths, plus an index page redirecting to the home document.

pub mod cli;
pub mod config;
pub mod error;
pub mod navigation;
pub mod output;
pub mod paths;
pub mod render;
pub mod rewrite;
pub mod source;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use navigation::{NavEntry, NavigationTree, RenderedNav, RenderedNavItem};
pub use output::{GenerationReport, HtmlConfig, HtmlGenerator, PageAssembler, TemplateEngine};
pub use paths::{href_for, output_location_for, relative_prefix, DocumentPath, OutputLocation};
pub use render::{MarkdownRenderer, PulldownRenderer};
pub use rewrite::{LinkRewriter, RewriteOutcome};
pub use source::{ContentSource, DirectorySource, SourceDocument};
