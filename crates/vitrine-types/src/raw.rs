//! Raw error shape, as captured at the realm boundary.
//!
//! Positions are in the compiled module's coordinate space; the stack trace
//! translator maps them back to original source coordinates. This is the
//! only error form allowed to cross out of the realm — never a live error
//! value from executed code.

use serde::{Deserialize, Serialize};

/// One captured stack frame in compiled coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Function name, or `"<module>"` for top-level code.
    pub func: String,
    /// 1-based compiled line.
    pub line: u32,
    /// 1-based compiled byte column.
    pub col: u32,
    /// Frame belongs to realm internals (builtin dispatch, capability shim).
    pub internal: bool,
}

/// An error captured during execution: name, message, and the call stack at
/// the throw site (innermost frame first; possibly empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawError {
    /// Error name, e.g. `"TypeError"`, `"ReferenceError"`, `"Error"`.
    pub name: String,
    pub message: String,
    pub frames: Vec<RawFrame>,
}

impl RawError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            frames: Vec::new(),
        }
    }

    pub fn with_frames(mut self, frames: Vec<RawFrame>) -> Self {
        self.frames = frames;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_error_construction() {
        let err = RawError::new("TypeError", "x is not a function").with_frames(vec![RawFrame {
            func: "<module>".into(),
            line: 3,
            col: 1,
            internal: false,
        }]);
        assert_eq!(err.name, "TypeError");
        assert_eq!(err.frames.len(), 1);
    }
}
