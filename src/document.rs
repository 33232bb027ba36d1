//! Read-only views of the document being previewed

use crate::error::{PreviewError, Result};
use std::path::{Path, PathBuf};

/// Line-indexed snapshot of a document's text at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    text: String,
    /// Byte offset where each line starts
    line_starts: Vec<usize>,
}

impl DocumentSnapshot {
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    /// Number of lines. A trailing newline opens one final empty line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of line `index` without its line separator.
    pub fn line(&self, index: usize) -> Option<&str> {
        let start = *self.line_starts.get(index)?;
        let end = self
            .line_starts
            .get(index + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let line = &self.text[start..end];
        Some(line.strip_suffix('\r').unwrap_or(line))
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.line_count()).filter_map(move |i| self.line(i))
    }

    /// Raw text from the start of line `index` to the end of the document.
    pub fn remainder_from(&self, index: usize) -> &str {
        match self.line_starts.get(index) {
            Some(&start) => &self.text[start..],
            None => "",
        }
    }
}

/// Provider of the document a preview session is bound to.
pub trait DocumentSource: Send + Sync {
    /// Stable identity used to match save events to this document
    fn identity(&self) -> &Path;

    /// Current contents
    fn snapshot(&self) -> Result<DocumentSnapshot>;
}

/// Document backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileDocumentSource {
    path: PathBuf,
}

impl FileDocumentSource {
    /// Bind to `path`, rejecting files without the expected extension.
    pub fn open(path: impl AsRef<Path>, extension: &str) -> Result<Self> {
        let path = path.as_ref();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == extension);

        if !matches {
            return Err(PreviewError::Validation {
                path: path.to_path_buf(),
                expected: extension.to_string(),
            });
        }

        let path = path.canonicalize()?;
        Ok(Self { path })
    }
}

impl DocumentSource for FileDocumentSource {
    fn identity(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> Result<DocumentSnapshot> {
        let text = std::fs::read_to_string(&self.path)?;
        Ok(DocumentSnapshot::from_text(text))
    }
}
