//! Runtime error types for the realm evaluator.

use thiserror::Error;
use vitrine_types::Span;

use crate::value::Value;

/// Evaluation error — runtime traps raised while executing a module.
///
/// `Return` is internal control flow, never surfaced.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Wrong operand or argument type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    /// Unknown variable.
    #[error("'{0}' is not defined")]
    UndefinedVariable(String),
    /// Assignment to a name that was never declared.
    #[error("assignment to undeclared variable '{0}'")]
    UndeclaredAssign(String),
    /// Called something that is not a function.
    #[error("{0} is not callable")]
    NotCallable(String),
    /// Missing object field.
    #[error("no field named '{0}'")]
    NoSuchField(String),
    /// Division by zero, NaN/Infinity results.
    #[error("arithmetic trap: {0}")]
    ArithmeticTrap(String),
    /// `throw(message)` from user code.
    #[error("{0}")]
    Thrown(String),
    /// A host capability reported failure.
    #[error("{1}")]
    Native(String, String),
    /// Execution budget exhausted (runaway loop or recursion).
    #[error("execution budget exhausted")]
    GasExhausted,
    /// Call stack depth limit.
    #[error("maximum call depth exceeded")]
    StackOverflow,
    /// Import of a module the registry does not know.
    #[error("no registered module \"{0}\"")]
    UnknownModule(String),
    /// Import of a name the module does not export.
    #[error("\"{0}\" has no export named '{1}'")]
    UnknownExport(String, String),
    /// Markup reached the realm — the transformer should have lowered it.
    #[error("markup in compiled module")]
    UnexpectedMarkup,
    /// `return` control flow (internal).
    #[error("return")]
    Return(Value),
}

impl EvalError {
    /// The diagnostic error name this trap surfaces under.
    pub fn error_name(&self) -> &'static str {
        match self {
            EvalError::TypeMismatch(_)
            | EvalError::NotCallable(_)
            | EvalError::NoSuchField(_)
            | EvalError::UnexpectedMarkup => "TypeError",
            EvalError::UndefinedVariable(_)
            | EvalError::UndeclaredAssign(_)
            | EvalError::UnknownModule(_)
            | EvalError::UnknownExport(_, _) => "ReferenceError",
            EvalError::ArithmeticTrap(_)
            | EvalError::GasExhausted
            | EvalError::StackOverflow => "RangeError",
            EvalError::Thrown(_) | EvalError::Native(_, _) | EvalError::Return(_) => "Error",
        }
    }
}

/// A trap: the error, the compiled-source position it is currently
/// attributed to, and the frames accumulated so far while unwinding.
///
/// Each function frame the trap propagates out of appends its own frame
/// (callee name + current position) and re-points `span` at the call site,
/// so by the time the trap reaches the realm boundary the full stack is
/// attached, innermost first.
#[derive(Debug, Clone)]
pub struct Trap {
    pub error: EvalError,
    pub span: Span,
    pub frames: Vec<vitrine_types::RawFrame>,
}

impl Trap {
    pub fn new(error: EvalError, span: Span) -> Self {
        Self {
            error,
            span,
            frames: Vec::new(),
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, Trap>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names() {
        assert_eq!(EvalError::TypeMismatch("x".into()).error_name(), "TypeError");
        assert_eq!(
            EvalError::UndefinedVariable("x".into()).error_name(),
            "ReferenceError"
        );
        assert_eq!(EvalError::GasExhausted.error_name(), "RangeError");
        assert_eq!(EvalError::Thrown("boom".into()).error_name(), "Error");
    }

    #[test]
    fn test_thrown_display_is_bare_message() {
        assert_eq!(EvalError::Thrown("boom".into()).to_string(), "boom");
    }
}
