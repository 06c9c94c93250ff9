// Content sources
//
// A content source yields every Markdown document of the site together with
// its document path. Only the local directory source lives here; fetching
// from a remote repository is left to whoever fills the directory.

use crate::error::{Error, Result};
use crate::paths::DocumentPath;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// File extensions treated as Markdown documents
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// One source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: DocumentPath,
    pub text: String,
}

/// Supplies the documents to generate
pub trait ContentSource {
    fn documents(&self) -> Result<Vec<SourceDocument>>;

    /// Directory the documents are read from, if they live on disk
    fn content_root(&self) -> Option<&Path> {
        None
    }
}

/// Markdown files below a local directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    exclude: Vec<Pattern>,
}

impl DirectorySource {
    /// Create a source rooted at `root`, which must be an existing directory
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::PathNotFound(root));
        }

        Ok(Self {
            root,
            exclude: Vec::new(),
        })
    }

    /// Skip files whose root-relative path matches one of the glob patterns
    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        for pattern in patterns {
            self.exclude.push(Pattern::new(pattern)?);
        }
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Markdown files below the root, sorted by path
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }
            if self.should_exclude(entry.path()) {
                debug!(path = %entry.path().display(), "excluded");
                continue;
            }
            files.push(entry.into_path());
        }

        files.sort();
        Ok(files)
    }

    fn should_exclude(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        self.exclude.iter().any(|pattern| pattern.matches(&relative))
    }
}

impl ContentSource for DirectorySource {
    fn content_root(&self) -> Option<&Path> {
        Some(&self.root)
    }

    fn documents(&self) -> Result<Vec<SourceDocument>> {
        self.discover()?
            .into_iter()
            .map(|file| {
                let path = DocumentPath::from_file(&self.root, &file)?;
                let text = fs::read_to_string(&file)?;
                Ok(SourceDocument { path, text })
            })
            .collect()
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| MARKDOWN_EXTENSIONS.contains(&ext))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map_or(false, |name| name.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "readme.md", "# Home\n");
        write(dir.path(), "perf/occupancy.md", "# Occupancy\n");
        write(dir.path(), "perf/notes.txt", "not markdown");
        write(dir.path(), "device-hardware/core.md", "# Core\n");
        write(dir.path(), ".git/HEAD.md", "hidden");
        write(dir.path(), "drafts/wip.md", "# WIP\n");
        dir
    }

    #[test]
    fn test_missing_root() {
        let result = DirectorySource::new("/nonexistent/content");
        assert!(matches!(result, Err(Error::PathNotFound(_))));
    }

    #[test]
    fn test_documents_have_document_paths() {
        let dir = fixture();
        let source = DirectorySource::new(dir.path()).unwrap();
        let docs = source.documents().unwrap();

        let paths: Vec<&str> = docs.iter().map(|doc| doc.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["device-hardware/core", "drafts/wip", "perf/occupancy", "readme"]
        );
        assert_eq!(docs[2].text, "# Occupancy\n");
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = fixture();
        let source = DirectorySource::new(dir.path())
            .unwrap()
            .with_exclude(&["drafts/**".to_string()])
            .unwrap();
        let docs = source.documents().unwrap();
        assert!(docs.iter().all(|doc| !doc.path.as_str().starts_with("drafts")));
        assert_eq!(docs.len(), 3);
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let dir = fixture();
        let result = DirectorySource::new(dir.path())
            .unwrap()
            .with_exclude(&["[".to_string()]);
        assert!(matches!(result, Err(Error::GlobPattern(_))));
    }
}
