use crate::error::{Error, Result};
use crate::navigation::{NavEntry, NavigationTree};
use crate::paths::{DocumentPath, DEFAULT_PAGE_EXTENSION};
use crate::rewrite::LinkRewriter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "mdsite.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub links: LinkConfig,
    pub content: ContentConfig,
    pub output: OutputConfig,
    /// Custom navigation; the builtin glossary tree is used when empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub navigation: Vec<NavEntry>,
}

/// Site metadata shown on every page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: String,
    pub subtitle: Option<String>,
    pub lang: String,
    /// Document the root `index` page redirects to
    pub home: String,
    pub footer_links: Vec<FooterLink>,
}

/// External link rendered in the page footer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterLink {
    pub label: String,
    pub url: String,
}

/// Link rewriting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Href prefixes that denote a document of this site
    pub prefixes: Vec<String>,
    /// Extension of generated pages, without the dot
    pub page_extension: String,
}

/// Content discovery and rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub exclude: Vec<String>,
    pub strip_comments: bool,
    pub heading_anchors: bool,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    /// Worker threads; 0 lets rayon decide
    pub jobs: usize,
    /// Remove the output directory before generating
    pub clean: bool,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub prefixes: Vec<String>,
    pub page_extension: Option<String>,
    pub home: Option<String>,
    pub jobs: Option<usize>,
    pub clean: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "GPU Glossary".to_string(),
            subtitle: None,
            lang: "en".to_string(),
            home: "readme".to_string(),
            footer_links: vec![
                FooterLink {
                    label: "Modal GPU Glossary".to_string(),
                    url: "https://modal.com/gpu-glossary".to_string(),
                },
                FooterLink {
                    label: "modal-labs/gpu-glossary".to_string(),
                    url: "https://github.com/modal-labs/gpu-glossary".to_string(),
                },
            ],
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            prefixes: vec![
                "/gpu-glossary/".to_string(),
                "https://modal.com/gpu-glossary/".to_string(),
            ],
            page_extension: DEFAULT_PAGE_EXTENSION.to_string(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            strip_comments: true,
            heading_anchors: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./site"),
            jobs: 0,
            clean: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file, or return defaults if the file doesn't exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(&mut self, overrides: CliOverrides) {
        if let Some(out) = overrides.output {
            self.output.directory = out;
        }

        if !overrides.exclude.is_empty() {
            self.content.exclude.extend(overrides.exclude);
        }

        if !overrides.prefixes.is_empty() {
            self.links.prefixes = overrides.prefixes;
        }

        if let Some(ext) = overrides.page_extension {
            self.links.page_extension = ext.trim_start_matches('.').to_string();
        }

        if let Some(home) = overrides.home {
            self.site.home = home;
        }

        if let Some(jobs) = overrides.jobs {
            self.output.jobs = jobs;
        }

        if overrides.clean {
            self.output.clean = true;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let ext = &self.links.page_extension;
        if ext.is_empty() {
            return Err(Error::config_validation("page_extension must not be empty"));
        }
        if ext.contains(['.', '/', '\\']) {
            return Err(Error::config_validation(format!(
                "page_extension '{}' must not contain '.', '/' or '\\'",
                ext
            )));
        }

        if self.links.prefixes.is_empty() {
            return Err(Error::config_validation("at least one link prefix required"));
        }
        self.link_rewriter()?;

        self.home()?;
        self.navigation_tree()?;

        Ok(())
    }

    /// Home document of the site
    pub fn home(&self) -> Result<DocumentPath> {
        DocumentPath::parse(&self.site.home)
    }

    /// Navigation tree from config, or the builtin tree
    pub fn navigation_tree(&self) -> Result<NavigationTree> {
        if self.navigation.is_empty() {
            NavigationTree::builtin()
        } else {
            NavigationTree::from_entries(self.navigation.clone())
        }
    }

    pub fn link_rewriter(&self) -> Result<LinkRewriter> {
        LinkRewriter::new(
            self.links.prefixes.iter().cloned(),
            self.links.page_extension.clone(),
        )
    }
}
