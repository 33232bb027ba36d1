//! Error types for diagrams-preview

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Message shown when the renderer exits non-zero or cannot be spawned.
pub const RENDER_FAILURE_MESSAGE: &str =
    "Error executing the code, please make sure you have Python3 (3.6 or higher) and Graphviz installed.";

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Sorry, only .{expected} files are supported (got {path})")]
    Validation { path: PathBuf, expected: String },

    #[error("No line containing `{marker}` found in {line_count} lines")]
    BlockNotFound { marker: String, line_count: usize },

    #[error("Diagram definition on line {line} has no argument list: {text}")]
    MalformedBlock { line: usize, text: String },

    #[error("Failed to create output directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Renderer failed ({status}): {stderr}")]
    RenderProcess { status: String, stderr: String },

    #[error("Renderer finished but no image was produced at {0}")]
    ArtifactMissing(PathBuf),

    #[error("Renderer did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PreviewError {
    /// Whether this failure is reported to the user or only logged.
    pub fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            PreviewError::DirectoryCreation { .. } | PreviewError::Persist { .. } | PreviewError::Cancelled
        )
    }

    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            PreviewError::RenderProcess { .. } => RENDER_FAILURE_MESSAGE.to_string(),
            PreviewError::ArtifactMissing(path) => format!(
                "The script ran but produced no diagram image at {}.",
                path.display()
            ),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PreviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filesystem_failures_are_log_only() {
        let err = PreviewError::Persist {
            path: PathBuf::from("/out/diagram.py"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.is_user_facing());
        assert!(!PreviewError::Cancelled.is_user_facing());
    }

    #[test]
    fn test_render_failure_uses_fixed_message() {
        let err = PreviewError::RenderProcess {
            status: "exit status: 1".into(),
            stderr: "ModuleNotFoundError: No module named 'diagrams'".into(),
        };
        assert!(err.is_user_facing());
        assert_eq!(err.user_message(), RENDER_FAILURE_MESSAGE);
    }

    #[test]
    fn test_missing_artifact_is_distinct() {
        let err = PreviewError::ArtifactMissing(PathBuf::from("/out/diagram.png"));
        assert_ne!(err.user_message(), RENDER_FAILURE_MESSAGE);
        assert!(err.user_message().contains("/out/diagram.png"));
    }
}
