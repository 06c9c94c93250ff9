//! Document path arithmetic.
//!
//! A [`DocumentPath`] names a source document relative to the content root,
//! without extension (`device-hardware/core`). Every generated page lives at
//! the mirrored [`OutputLocation`] under the output root, so the number of
//! `../` hops needed to reach the root from a page depends only on the depth
//! of the page's own path. All relative URL construction goes through
//! [`relative_prefix`] and [`href_for`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Default extension of generated pages
pub const DEFAULT_PAGE_EXTENSION: &str = "html";

/// Parent-directory segment used in relative prefixes
const PARENT_SEGMENT: &str = "../";

/// Repository-relative document identifier, extension stripped
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Parse a `/`-separated path such as `perf/occupancy`.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::malformed_path(raw, "path is empty"));
        }
        if raw.starts_with('/') {
            return Err(Error::malformed_path(raw, "path must be relative"));
        }
        if raw.contains('\\') {
            return Err(Error::malformed_path(raw, "segments must be separated by '/'"));
        }

        for segment in raw.split('/') {
            match segment {
                "" => return Err(Error::malformed_path(raw, "empty segment")),
                "." | ".." => {
                    return Err(Error::malformed_path(
                        raw,
                        format!("'{}' is not allowed as a segment", segment),
                    ))
                }
                _ => {}
            }
        }

        Ok(Self(raw.to_string()))
    }

    /// Derive the document path of `file` relative to the content `root`.
    ///
    /// The extension of the last segment is dropped: `root/perf/occupancy.md`
    /// becomes `perf/occupancy`.
    pub fn from_file(root: &Path, file: &Path) -> Result<Self> {
        let display = file.display().to_string();
        let relative = file
            .strip_prefix(root)
            .map_err(|_| Error::malformed_path(&display, "file is outside the content root"))?;
        let relative = relative.with_extension("");

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part
                        .to_str()
                        .ok_or_else(|| Error::malformed_path(&display, "path is not valid UTF-8"))?;
                    segments.push(part);
                }
                _ => return Err(Error::malformed_path(&display, "unexpected path component")),
            }
        }

        Self::parse(&segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments in order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Number of segments minus one; a top-level document has depth 0
    pub fn depth(&self) -> usize {
        self.0.matches('/').count()
    }

    /// Last segment of the path
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Everything before the last segment, if the path is nested
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.0
    }
}

impl AsRef<str> for DocumentPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Location of a generated page, relative to the output root
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OutputLocation {
    relative: String,
    depth: usize,
}

impl OutputLocation {
    /// Relative path with the page extension, e.g. `perf/occupancy.html`
    pub fn as_str(&self) -> &str {
        &self.relative
    }

    /// Same as the depth of the source document
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Concrete file path under `output_root`
    pub fn to_path(&self, output_root: &Path) -> PathBuf {
        self.relative
            .split('/')
            .fold(output_root.to_path_buf(), |path, segment| path.join(segment))
    }

    /// Resolve a relative `href` found on this page to an output-root
    /// relative path.
    ///
    /// Returns `None` for absolute or scheme-qualified hrefs, pure fragment
    /// links, and hrefs that climb above the output root.
    pub fn resolve_href(&self, href: &str) -> Option<String> {
        let target = href.split(['#', '?']).next().unwrap_or("");
        if target.is_empty() || target.starts_with('/') || has_scheme(target) {
            return None;
        }

        let mut stack: Vec<&str> = self.relative.split('/').collect();
        stack.pop();

        for segment in target.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    stack.pop()?;
                }
                other => stack.push(other),
            }
        }

        Some(stack.join("/"))
    }
}

impl fmt::Display for OutputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relative)
    }
}

/// Output location of a document: same segments, page extension appended.
pub fn output_location_for(doc: &DocumentPath, page_extension: &str) -> OutputLocation {
    OutputLocation {
        relative: format!("{}.{}", doc.as_str(), page_extension),
        depth: doc.depth(),
    }
}

/// `"../"` repeated `depth` times.
///
/// This is the only prefix formula in the crate. It depends on the depth of
/// the page that *contains* a link, never on the link target.
pub fn relative_prefix(depth: usize) -> String {
    PARENT_SEGMENT.repeat(depth)
}

/// Relative href from a page at `from_depth` to the page generated for `target`.
pub fn href_for(target: &DocumentPath, from_depth: usize, page_extension: &str) -> String {
    format!(
        "{}{}.{}",
        relative_prefix(from_depth),
        target.as_str(),
        page_extension
    )
}

fn has_scheme(href: &str) -> bool {
    match href.find(':') {
        Some(colon) => !href[..colon].contains('/'),
        None => false,
    }
}
