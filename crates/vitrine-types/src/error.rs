use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of compile errors reported before fail-fast.
pub const MAX_ERRORS: usize = 20;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Import,
}

/// Numeric error code (E100–E299).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const UNKNOWN_ESCAPE: Self = Self(102);
    pub const INVALID_NUMBER: Self = Self(103);
    pub const UNTERMINATED_MARKUP: Self = Self(104);
    pub const MISMATCHED_CLOSE_TAG: Self = Self(105);
    pub const DEPTH_EXCEEDED: Self = Self(106);
    pub const INVALID_CHARACTER: Self = Self(107);

    // ── Import errors (E200–E299) ──
    pub const UNRESOLVED_IMPORT: Self = Self(200);
    pub const UNKNOWN_EXPORT: Self = Self(201);
    pub const DUPLICATE_IMPORT_NAME: Self = Self(202);
    pub const IMPORT_NOT_AT_TOP_LEVEL: Self = Self(203);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            _ => ErrorCategory::Import,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured compile-time error.
///
/// Compile errors never reach execution: the transformer reports them and
/// the pipeline settles without running the realm. The host renders these —
/// it must not parse free-form strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileError {
    /// Error code (e.g., E200).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Source location in the original document.
    #[serde(flatten)]
    pub span: Span,
    /// The exact source line for context.
    pub source_line: String,
}

impl CompileError {
    /// Create a new compile error.
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for CompileError {}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Import => write!(f, "import"),
        }
    }
}

/// Bounded collection of compile errors for one transform attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<CompileError>,
    pub total_errors: usize,
}

impl CompileErrors {
    /// Create an empty collection (no errors).
    pub fn empty() -> Self {
        Self {
            errors: Vec::new(),
            total_errors: 0,
        }
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the MAX_ERRORS limit.
    pub fn push_error(&mut self, error: CompileError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// The first error, if any. The pipeline annotates the editor with this
    /// one; the rest are shown in the output pane.
    pub fn first(&self) -> Option<&CompileError> {
        self.errors.first()
    }
}

impl Default for CompileErrors {
    fn default() -> Self {
        Self::empty()
    }
}
