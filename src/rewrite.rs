//! Cross-document link rewriting.
//!
//! Rendered Markdown refers to other documents through canonical
//! content-root URLs such as `/gpu-glossary/perf/occupancy`. Those only work
//! on the original host, so every `href` that starts with a recognized
//! prefix is turned into a path relative to the page being generated:
//! `../perf/occupancy.html` from `device-hardware/core`. All other hrefs are
//! left alone.

use crate::error::{Error, Result};
use crate::paths::{href_for, DocumentPath};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::debug;

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).expect("valid regex"));

/// Result of rewriting one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub html: String,
    /// Number of hrefs that were rewritten
    pub rewritten: usize,
    /// Documents the rewritten hrefs point at, in order of appearance
    pub targets: Vec<DocumentPath>,
}

/// Rewrites content-root links to page-relative links
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    prefixes: Vec<String>,
    page_extension: String,
}

impl LinkRewriter {
    /// Create a rewriter for the given content-root prefixes.
    ///
    /// A prefix is either root-relative (`/gpu-glossary/`) or absolute
    /// (`https://modal.com/gpu-glossary/`) and must end with `/`.
    pub fn new<I, S>(prefixes: I, page_extension: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes: Vec<String> = prefixes.into_iter().map(Into::into).collect();
        for prefix in &prefixes {
            validate_prefix(prefix)?;
        }
        // Longest first so a more specific prefix wins
        prefixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        prefixes.dedup();

        Ok(Self {
            prefixes,
            page_extension: page_extension.into(),
        })
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn page_extension(&self) -> &str {
        &self.page_extension
    }

    /// Rewrite every recognized href in `fragment` relative to `current`.
    pub fn rewrite(&self, fragment: &str, current: &DocumentPath) -> Result<String> {
        self.rewrite_with_targets(fragment, current)
            .map(|outcome| outcome.html)
    }

    /// Like [`LinkRewriter::rewrite`], also reporting what was rewritten.
    pub fn rewrite_with_targets(
        &self,
        fragment: &str,
        current: &DocumentPath,
    ) -> Result<RewriteOutcome> {
        let depth = current.depth();
        let mut html = String::with_capacity(fragment.len());
        let mut targets = Vec::new();
        let mut last = 0;

        for caps in HREF_RE.captures_iter(fragment) {
            let value = match caps.get(1) {
                Some(value) => value,
                None => continue,
            };

            match self.rewrite_href(value.as_str(), depth)? {
                Some((href, target)) => {
                    html.push_str(&fragment[last..value.start()]);
                    html.push_str(&href);
                    last = value.end();
                    targets.push(target);
                }
                None => debug!(href = value.as_str(), page = %current, "leaving href unchanged"),
            }
        }
        html.push_str(&fragment[last..]);

        Ok(RewriteOutcome {
            html,
            rewritten: targets.len(),
            targets,
        })
    }

    /// New href and its target document, or `None` if `href` is not a
    /// content-root link.
    fn rewrite_href(&self, href: &str, depth: usize) -> Result<Option<(String, DocumentPath)>> {
        let remainder = match self.strip_prefix(href) {
            Some(remainder) => remainder,
            None => return Ok(None),
        };

        let (path, suffix) = match remainder.find(['#', '?']) {
            Some(pos) => remainder.split_at(pos),
            None => (remainder, ""),
        };
        let path = path.strip_suffix('/').unwrap_or(path);
        if path.is_empty() {
            return Ok(None);
        }

        let in_link = DocumentPath::parse(path).map_err(|err| with_href(err, href))?;
        let rewritten = format!("{}{}", href_for(&in_link, depth, &self.page_extension), suffix);

        // The renderer percent-encodes non-ASCII paths; the target is the
        // document as named on disk, the href keeps the encoded form.
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        let target = match decoded {
            Cow::Borrowed(_) => in_link,
            Cow::Owned(decoded) => {
                DocumentPath::parse(&decoded).map_err(|err| with_href(err, href))?
            }
        };

        Ok(Some((rewritten, target)))
    }

    fn strip_prefix<'a>(&self, href: &'a str) -> Option<&'a str> {
        self.prefixes
            .iter()
            .find_map(|prefix| href.strip_prefix(prefix.as_str()))
    }
}

fn validate_prefix(prefix: &str) -> Result<()> {
    if !prefix.ends_with('/') {
        return Err(Error::config_validation(format!(
            "link prefix '{}' must end with '/'",
            prefix
        )));
    }
    if !(prefix.starts_with('/') || prefix.contains("://")) {
        return Err(Error::config_validation(format!(
            "link prefix '{}' must be root-relative or an absolute URL",
            prefix
        )));
    }
    Ok(())
}

fn with_href(err: Error, href: &str) -> Error {
    match err {
        Error::MalformedPath { reason, .. } => Error::malformed_path(href, reason),
        other => other,
    }
}
