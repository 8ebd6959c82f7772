//! Shared types for the vitrine playground core.
//!
//! This crate defines the example-language AST, source spans, the bounded
//! compile-error collection, and the [`Diagnostic`] form in which every
//! failure — compile-time or runtime — is surfaced to the host.

mod diagnostic;
mod error;
mod raw;
mod span;
pub mod ast;

pub use diagnostic::{Diagnostic, DiagnosticKind, StackFrame};
pub use error::{CompileError, CompileErrors, ErrorCategory, ErrorCode, MAX_ERRORS};
pub use raw::{RawError, RawFrame};
pub use span::{SourceFile, Span};
