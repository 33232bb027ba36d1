//! Rewrites the diagram call so its output lands on the managed path

use crate::config::RedirectConfig;
use crate::locator::{argument_span, DiagramBlockMatch};
use std::path::PathBuf;

pub struct ArgumentRewriter {
    argument: String,
    strip: Vec<String>,
    stem: PathBuf,
}

impl ArgumentRewriter {
    /// `stem` is the managed artifact path without extension.
    pub fn new(redirect: &RedirectConfig, stem: impl Into<PathBuf>) -> Self {
        let mut strip = redirect.strip.clone();
        if !strip.contains(&redirect.argument) {
            strip.push(redirect.argument.clone());
        }

        Self {
            argument: redirect.argument.clone(),
            strip,
            stem: stem.into(),
        }
    }

    /// The single argument that forces the output path.
    pub fn redirect_token(&self) -> String {
        let stem = self
            .stem
            .display()
            .to_string()
            .replace('\\', "\\\\")
            .replace('"', "\\\"");
        format!("{}=\"{}\"", self.argument, stem)
    }

    /// Drop output-path and blank tokens, then append the redirect.
    pub fn rewrite_tokens(&self, tokens: &[String]) -> Vec<String> {
        let mut kept: Vec<String> = tokens
            .iter()
            .filter(|token| !token.trim().is_empty())
            .filter(|token| !self.strip.iter().any(|name| token.contains(name.as_str())))
            .cloned()
            .collect();
        kept.push(self.redirect_token());
        kept
    }

    /// Rebuild the matched line around the rewritten argument list.
    ///
    /// Text before the first `(` and after its closing `)` is kept as is.
    pub fn rewrite_line(&self, block: &DiagramBlockMatch) -> String {
        let line = &block.matched_line;
        let (head, tail) = match argument_span(line) {
            Some((open, close)) => (&line[..open], &line[close + 1..]),
            None => (line.as_str(), ":"),
        };

        let mut rewritten = format!("{}(", head);
        for token in self.rewrite_tokens(&block.argument_tokens) {
            rewritten.push_str(&token);
            rewritten.push(',');
        }
        rewritten.push(')');
        rewritten.push_str(tail);
        rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentSnapshot;
    use crate::locator::DiagramBlockLocator;

    fn rewriter() -> ArgumentRewriter {
        ArgumentRewriter::new(&RedirectConfig::default(), "/managed/diagram")
    }

    fn block(line: &str) -> DiagramBlockMatch {
        DiagramBlockLocator::new("with Diagram")
            .locate(&DocumentSnapshot::from_text(line))
            .unwrap()
    }

    #[test]
    fn test_strips_author_output_path() {
        let tokens = vec!["x".to_string(), " fileName=\"old\"".to_string()];
        let out = rewriter().rewrite_tokens(&tokens).join(",");

        assert!(!out.contains("fileName=\"old\""));
        assert_eq!(out.matches("filename=\"/managed/diagram\"").count(), 1);
    }

    #[test]
    fn test_strips_lowercase_argument_in_any_position() {
        let tokens = vec![
            " filename=\"mine\"".to_string(),
            "\"Title\"".to_string(),
            " show=False".to_string(),
        ];
        let out = rewriter().rewrite_tokens(&tokens);

        assert_eq!(
            out,
            vec![
                "\"Title\"".to_string(),
                " show=False".to_string(),
                "filename=\"/managed/diagram\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let tokens = vec![" FILENAME=1".to_string()];
        let out = rewriter().rewrite_tokens(&tokens);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_rewrite_line_sample() {
        let line = rewriter().rewrite_line(&block("with Diagram(\"My Diagram\", fileName=\"unused\"):"));
        assert_eq!(line, "with Diagram(\"My Diagram\",filename=\"/managed/diagram\",):");
    }

    #[test]
    fn test_empty_argument_list() {
        let line = rewriter().rewrite_line(&block("with Diagram():"));
        assert_eq!(line, "with Diagram(filename=\"/managed/diagram\",):");
    }

    #[test]
    fn test_keeps_indentation_and_alias() {
        let line = rewriter().rewrite_line(&block("    with Diagram(\"A\", show=False) as diag:"));
        assert_eq!(
            line,
            "    with Diagram(\"A\", show=False,filename=\"/managed/diagram\",) as diag:"
        );
    }

    #[test]
    fn test_custom_redirect_argument() {
        let redirect = RedirectConfig {
            argument: "out".to_string(),
            strip: vec![],
        };
        let rewriter = ArgumentRewriter::new(&redirect, "/tmp/x");
        let out = rewriter.rewrite_tokens(&[" out=\"a\"".to_string()]);
        assert_eq!(out, vec!["out=\"/tmp/x\"".to_string()]);
    }
}
