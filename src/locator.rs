//! Locates the `with Diagram(...)` line and splits the document around it

use crate::document::DocumentSnapshot;
use crate::error::{PreviewError, Result};

/// A document split around its diagram definition line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlockMatch {
    /// Lines before the definition, separators stripped
    pub preamble_lines: Vec<String>,
    pub matched_line: String,
    /// Number of lines consumed by the scan, i.e. index of the first body line
    pub matched_line_index: usize,
    /// Raw comma-separated pieces of the argument list
    pub argument_tokens: Vec<String>,
}

pub struct DiagramBlockLocator {
    marker: String,
}

impl DiagramBlockLocator {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Scan `doc` for the first line containing the marker.
    pub fn locate(&self, doc: &DocumentSnapshot) -> Result<DiagramBlockMatch> {
        let mut preamble_lines = Vec::new();

        for (index, line) in doc.lines().enumerate() {
            if !line.contains(&self.marker) {
                preamble_lines.push(line.to_string());
                continue;
            }

            let argument_tokens = parse_arguments(line).ok_or_else(|| PreviewError::MalformedBlock {
                line: index + 1,
                text: line.to_string(),
            })?;

            return Ok(DiagramBlockMatch {
                preamble_lines,
                matched_line: line.to_string(),
                matched_line_index: index + 1,
                argument_tokens,
            });
        }

        Err(PreviewError::BlockNotFound {
            marker: self.marker.clone(),
            line_count: doc.line_count(),
        })
    }
}

/// Byte positions of the first `(` and the first `)` after it.
pub(crate) fn argument_span(line: &str) -> Option<(usize, usize)> {
    let open = line.find('(')?;
    let close = open + 1 + line[open + 1..].find(')')?;
    Some((open, close))
}

/// Split the first parenthesized argument list of `line` on commas.
///
/// Tokens are returned untrimmed. Nested parentheses are not understood.
pub fn parse_arguments(line: &str) -> Option<Vec<String>> {
    let (open, close) = argument_span(line)?;
    Some(line[open + 1..close].split(',').map(String::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> DiagramBlockLocator {
        DiagramBlockLocator::new("with Diagram")
    }

    #[test]
    fn test_block_isolation() {
        let doc = DocumentSnapshot::from_text("a\nb\nwith Diagram(x, y):\nc\nd");
        let m = locator().locate(&doc).unwrap();

        assert_eq!(m.preamble_lines, vec!["a", "b"]);
        assert_eq!(m.matched_line, "with Diagram(x, y):");
        assert_eq!(m.matched_line_index, 3);
        assert_eq!(m.argument_tokens, vec!["x", " y"]);
    }

    #[test]
    fn test_first_match_wins() {
        let doc = DocumentSnapshot::from_text("with Diagram(\"one\"):\n    pass\nwith Diagram(\"two\"):\n");
        let m = locator().locate(&doc).unwrap();

        assert!(m.preamble_lines.is_empty());
        assert_eq!(m.matched_line_index, 1);
        assert_eq!(m.argument_tokens, vec!["\"one\""]);
    }

    #[test]
    fn test_missing_marker_is_bounded() {
        let doc = DocumentSnapshot::from_text("import os\nprint(os.getcwd())\n");
        let err = locator().locate(&doc).unwrap_err();

        match err {
            PreviewError::BlockNotFound { marker, line_count } => {
                assert_eq!(marker, "with Diagram");
                assert_eq!(line_count, 3);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_document() {
        let doc = DocumentSnapshot::from_text("");
        assert!(matches!(
            locator().locate(&doc),
            Err(PreviewError::BlockNotFound { .. })
        ));
    }

    #[test]
    fn test_marker_without_parens_is_malformed() {
        let doc = DocumentSnapshot::from_text("x = 1\nwith Diagram:\n");
        let err = locator().locate(&doc).unwrap_err();
        assert!(matches!(err, PreviewError::MalformedBlock { line: 2, .. }));
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments("with Diagram():"), Some(vec![String::new()]));
        assert_eq!(
            parse_arguments("with Diagram(\"A\", show=False) as d:"),
            Some(vec!["\"A\"".to_string(), " show=False".to_string()])
        );
        assert_eq!(parse_arguments("with Diagram(\"A\""), None);
        assert_eq!(parse_arguments("with Diagram"), None);
    }

    #[test]
    fn test_only_first_paren_pair() {
        assert_eq!(
            parse_arguments("with Diagram(f(x), y):"),
            Some(vec!["f(x".to_string()])
        );
    }
}
