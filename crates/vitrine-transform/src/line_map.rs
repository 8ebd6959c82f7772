//! Compiled-position → original-position offset table.
//!
//! The emitter keeps a strict discipline: a fixed prelude is prepended, and
//! every rewrite (markup lowering, import resolution) preserves the line
//! structure of the region it replaces. That makes line translation a
//! constant shift. Columns survive only outside rewritten regions; inside
//! them the map records the affected line range and drops the column.

use serde::{Deserialize, Serialize};

/// Lines the emitter prepends before the first source line.
pub const PRELUDE_LINES: u32 = 2;

/// A range of original-source lines whose column layout was disturbed by a
/// rewrite (inclusive on both ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteSpan {
    pub start_line: u32,
    pub end_line: u32,
}

impl RewriteSpan {
    fn contains(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }
}

/// A translated position: the original line, and the original column when
/// the compiled column is still meaningful there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedPos {
    pub line: u32,
    pub col: Option<u32>,
}

/// The offset table for one compiled module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineMap {
    /// Fixed number of prelude lines prepended by the emitter.
    pub prelude_lines: u32,
    /// Original line count of the source document.
    pub source_lines: u32,
    /// Line ranges whose columns were disturbed by rewrites.
    pub rewrites: Vec<RewriteSpan>,
}

impl LineMap {
    pub fn new(source_lines: u32) -> Self {
        Self {
            prelude_lines: PRELUDE_LINES,
            source_lines,
            rewrites: Vec::new(),
        }
    }

    /// Record a rewritten original-line range.
    pub fn push_rewrite(&mut self, start_line: u32, end_line: u32) {
        self.rewrites.push(RewriteSpan {
            start_line,
            end_line,
        });
    }

    /// Translate a compiled position back to original coordinates.
    ///
    /// Returns `None` for positions inside the prelude or past the end of
    /// the source — those frames belong to generated or internal code and
    /// have no original position.
    pub fn translate(&self, compiled_line: u32, compiled_col: u32) -> Option<TranslatedPos> {
        if compiled_line <= self.prelude_lines {
            return None;
        }
        let line = compiled_line - self.prelude_lines;
        if line > self.source_lines {
            return None;
        }
        let col = if self.rewrites.iter().any(|r| r.contains(line)) {
            None
        } else {
            Some(compiled_col)
        };
        Some(TranslatedPos { line, col })
    }
}
