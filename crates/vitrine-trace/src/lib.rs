//! Stack Trace Translator.
//!
//! Maps the compiled-coordinate frames of a captured [`RawError`] back to
//! the original source document through the live module's [`LineMap`], and
//! normalises the result into a [`Diagnostic`]. Translation is pure and
//! total: frames that cannot be mapped keep their raw position, missing or
//! malformed stacks degrade to "no position available", and nothing here
//! ever fails.

mod parse_stack;

pub use parse_stack::parse_stack_text;

use tracing::trace;
use vitrine_transform::LineMap;
use vitrine_types::{Diagnostic, RawError, StackFrame};

/// Which frames survive translation.
///
/// What counts as an "internal" frame (builtin dispatch, capability shims)
/// is decided by the realm at capture time; hosts pick the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePolicy {
    /// Keep every frame, internal ones untranslated.
    KeepAll,
    /// Drop realm-internal frames from the diagnostic.
    #[default]
    HideInternal,
}

/// Translate a raw error into a [`Diagnostic`] with original-source frames.
pub fn translate(raw: &RawError, map: &LineMap, policy: FramePolicy) -> Diagnostic {
    let mut frames = Vec::with_capacity(raw.frames.len());
    for frame in &raw.frames {
        if frame.internal && policy == FramePolicy::HideInternal {
            continue;
        }
        frames.push(translate_frame(frame, map));
    }
    trace!(
        target: "vitrine::trace",
        name = %raw.name,
        raw = raw.frames.len(),
        kept = frames.len(),
        "translated error"
    );
    Diagnostic::runtime(raw.name.clone(), raw.message.clone(), frames)
}

/// Translate an error whose stack only exists as a formatted string.
pub fn translate_text(
    name: &str,
    message: &str,
    stack: &str,
    map: &LineMap,
    policy: FramePolicy,
) -> Diagnostic {
    let raw = RawError::new(name, message).with_frames(parse_stack_text(stack));
    translate(&raw, map, policy)
}

fn translate_frame(frame: &vitrine_types::RawFrame, map: &LineMap) -> StackFrame {
    match map.translate(frame.line, frame.col) {
        Some(pos) => StackFrame {
            func: frame.func.clone(),
            line: Some(pos.line),
            col: pos.col,
            internal: frame.internal,
            translated: true,
        },
        // Untranslatable (prelude/generated code): keep the raw compiled
        // position rather than failing.
        None => StackFrame {
            func: frame.func.clone(),
            line: Some(frame.line),
            col: Some(frame.col),
            internal: frame.internal,
            translated: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_transform::{LineMap, PRELUDE_LINES};
    use vitrine_types::{RawError, RawFrame};

    fn raw_frame(func: &str, line: u32, col: u32, internal: bool) -> RawFrame {
        RawFrame {
            func: func.into(),
            line,
            col,
            internal,
        }
    }

    #[test]
    fn test_line_shift_round_trip() {
        // A throw on original line 5 shows up on compiled line 5 + prelude;
        // translation must report line 5 again.
        let map = LineMap::new(20);
        let raw = RawError::new("Error", "boom")
            .with_frames(vec![raw_frame("view", PRELUDE_LINES + 5, 3, false)]);
        let diag = translate(&raw, &map, FramePolicy::KeepAll);
        assert_eq!(diag.frames[0].line, Some(5));
        assert_eq!(diag.frames[0].col, Some(3));
        assert!(diag.frames[0].translated);
    }

    #[test]
    fn test_internal_frames_hidden_by_default() {
        let map = LineMap::new(20);
        let raw = RawError::new("TypeError", "nope").with_frames(vec![
            raw_frame("h", 1, 1, true),
            raw_frame("view", PRELUDE_LINES + 2, 1, false),
        ]);
        let diag = translate(&raw, &map, FramePolicy::default());
        assert_eq!(diag.frames.len(), 1);
        assert_eq!(diag.frames[0].func, "view");
    }

    #[test]
    fn test_keep_all_passes_internal_through() {
        let map = LineMap::new(20);
        let raw = RawError::new("TypeError", "nope").with_frames(vec![
            raw_frame("h", 1, 1, true),
            raw_frame("view", PRELUDE_LINES + 2, 1, false),
        ]);
        let diag = translate(&raw, &map, FramePolicy::KeepAll);
        assert_eq!(diag.frames.len(), 2);
        // Prelude frame keeps its raw position, marked untranslated
        assert!(!diag.frames[0].translated);
    }

    #[test]
    fn test_missing_stack_degrades_to_no_position() {
        let map = LineMap::new(20);
        let raw = RawError::new("Error", "boom");
        let diag = translate(&raw, &map, FramePolicy::default());
        assert!(diag.frames.is_empty());
        assert_eq!(diag.span, None);
        assert_eq!(diag.summary(), "Error: boom");
    }

    #[test]
    fn test_rewritten_region_keeps_line_drops_col() {
        let mut map = LineMap::new(20);
        map.push_rewrite(4, 6);
        let raw = RawError::new("Error", "boom")
            .with_frames(vec![raw_frame("view", PRELUDE_LINES + 5, 40, false)]);
        let diag = translate(&raw, &map, FramePolicy::default());
        assert_eq!(diag.frames[0].line, Some(5));
        assert_eq!(diag.frames[0].col, None);
    }

    #[test]
    fn test_text_stack_translation() {
        let map = LineMap::new(20);
        let stack = format!("    at view (playground:{}:7)", PRELUDE_LINES + 3);
        let diag = translate_text("Error", "boom", &stack, &map, FramePolicy::default());
        assert_eq!(diag.frames[0].line, Some(3));
        assert_eq!(diag.frames[0].col, Some(7));
    }
}
