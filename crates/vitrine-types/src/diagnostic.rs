//! The normalized error form surfaced to the user.
//!
//! Whatever goes wrong — a transform failure, a synchronous throw, a deferred
//! task blowing up inside the realm — crosses back to the host as a plain
//! [`Diagnostic`]. Foreign error objects never cross the isolation boundary
//! themselves; the realm reduces them to name/message/frames at capture time.

use crate::error::CompileErrors;
use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What produced the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// Transform-time failure. Never has stack frames.
    Compile,
    /// Thrown during execution (sync, deferred task, or component render).
    Runtime,
}

/// One stack frame, after translation.
///
/// `line`/`col` are in the original source document's coordinate space when
/// `translated` is true, otherwise they are the raw compiled-module position
/// (or absent entirely when the execution environment gave us nothing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Function name, or `"<module>"` for top-level code.
    pub func: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
    /// Realm-internal frame (builtin dispatch, capability shim).
    pub internal: bool,
    /// Whether the position was mapped back to original coordinates.
    pub translated: bool,
}

impl StackFrame {
    /// A frame with no position information at all.
    pub fn unresolved(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            line: None,
            col: None,
            internal: false,
            translated: false,
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.col) {
            (Some(l), Some(c)) => write!(f, "at {} ({l}:{c})", self.func),
            (Some(l), None) => write!(f, "at {} (line {l})", self.func),
            _ => write!(f, "at {}", self.func),
        }
    }
}

/// A normalized error description, ready for the editor annotation layer and
/// the output pane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Error name, e.g. `"SyntaxError"`, `"TypeError"`.
    pub name: String,
    pub message: String,
    /// Innermost frame first.
    pub frames: Vec<StackFrame>,
    /// Primary annotation position in original coordinates, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    /// Build a compile diagnostic (no frames) from a position and message.
    pub fn compile(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind: DiagnosticKind::Compile,
            name: "SyntaxError".into(),
            message: message.into(),
            frames: Vec::new(),
            span,
        }
    }

    /// Build a runtime diagnostic.
    pub fn runtime(
        name: impl Into<String>,
        message: impl Into<String>,
        frames: Vec<StackFrame>,
    ) -> Self {
        let span = frames
            .iter()
            .find(|f| f.translated && !f.internal)
            .and_then(|f| Some(Span::point(f.line?, f.col.unwrap_or(1))));
        Self {
            kind: DiagnosticKind::Runtime,
            name: name.into(),
            message: message.into(),
            frames,
            span,
        }
    }

    /// Short one-line summary for the output pane header.
    pub fn summary(&self) -> String {
        if self.message.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.message)
        }
    }
}

impl From<&CompileErrors> for Diagnostic {
    /// The first collected error becomes the annotated diagnostic; its code
    /// prefixes the message so the output pane can show it.
    fn from(errs: &CompileErrors) -> Self {
        match errs.first() {
            Some(first) => Diagnostic {
                kind: DiagnosticKind::Compile,
                name: "SyntaxError".into(),
                message: format!("[{}] {}", first.code, first.message),
                frames: Vec::new(),
                span: Some(first.span),
            },
            None => Diagnostic::compile("unknown compile error", None),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())?;
        for frame in &self.frames {
            write!(f, "\n  {frame}")?;
        }
        Ok(())
    }
}
