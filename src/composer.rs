//! Reassembles the rewritten script

use crate::document::DocumentSnapshot;
use crate::error::Result;
use crate::locator::{DiagramBlockLocator, DiagramBlockMatch};
use crate::rewriter::ArgumentRewriter;
use std::fmt;

/// Complete script ready to be written to the managed source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedSource(String);

impl TransformedSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransformedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct SourceComposer;

impl SourceComposer {
    /// Preamble, rewritten line, then the document body verbatim.
    pub fn compose(doc: &DocumentSnapshot, block: &DiagramBlockMatch, rewritten_line: &str) -> TransformedSource {
        let body = doc.remainder_from(block.matched_line_index);
        let preamble_len: usize = block.preamble_lines.iter().map(|l| l.len() + 1).sum();

        let mut out = String::with_capacity(preamble_len + rewritten_line.len() + 1 + body.len());
        for line in &block.preamble_lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(rewritten_line);
        out.push('\n');
        out.push_str(body);

        TransformedSource(out)
    }
}

/// Run locate, rewrite and compose over one snapshot.
pub fn transform_document(
    doc: &DocumentSnapshot,
    locator: &DiagramBlockLocator,
    rewriter: &ArgumentRewriter,
) -> Result<TransformedSource> {
    let block = locator.locate(doc)?;
    let line = rewriter.rewrite_line(&block);
    Ok(SourceComposer::compose(doc, &block, &line))
}
