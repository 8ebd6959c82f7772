//! Best-effort parsing of text-form stack traces.
//!
//! Some execution environments hand errors back with only a formatted stack
//! string. Two shapes are recognised, one per major engine family:
//!
//! ```text
//!     at increment (playground:12:5)     — V8
//!     at playground:12:5                 — V8, anonymous
//! increment@playground:12:5              — SpiderMonkey
//! ```
//!
//! Anything unrecognisable is skipped; a garbage stack yields an empty frame
//! list, never an error.

use vitrine_types::RawFrame;

/// Parse a stack string into raw frames (compiled coordinates).
pub fn parse_stack_text(stack: &str) -> Vec<RawFrame> {
    stack.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<RawFrame> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix("at ") {
        // `at func (src:l:c)` or `at src:l:c`
        if let Some(open) = rest.find('(') {
            let func = rest[..open].trim();
            let inner = rest[open + 1..].trim_end_matches(')');
            let (l, c) = parse_position(inner)?;
            return Some(frame(func, l, c));
        }
        let (l, c) = parse_position(rest)?;
        return Some(frame("", l, c));
    }

    // `func@src:l:c`
    if let Some(at) = line.find('@') {
        let func = &line[..at];
        let (l, c) = parse_position(&line[at + 1..])?;
        return Some(frame(func, l, c));
    }

    None
}

/// Parse the trailing `:line:col` off a `source:line:col` location.
fn parse_position(loc: &str) -> Option<(u32, u32)> {
    let mut parts = loc.rsplitn(3, ':');
    let col = parts.next()?.parse().ok()?;
    let line = parts.next()?.parse().ok()?;
    parts.next()?; // the source label must exist, its content is irrelevant
    Some((line, col))
}

fn frame(func: &str, line: u32, col: u32) -> RawFrame {
    RawFrame {
        func: if func.is_empty() {
            "<anonymous>".to_string()
        } else {
            func.to_string()
        },
        line,
        col,
        internal: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v8_named_frame() {
        let frames = parse_stack_text("Error: boom\n    at increment (playground:12:5)");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].func, "increment");
        assert_eq!((frames[0].line, frames[0].col), (12, 5));
    }

    #[test]
    fn test_v8_anonymous_frame() {
        let frames = parse_stack_text("    at playground:3:14");
        assert_eq!(frames[0].func, "<anonymous>");
        assert_eq!((frames[0].line, frames[0].col), (3, 14));
    }

    #[test]
    fn test_spidermonkey_frame() {
        let frames = parse_stack_text("view@playground:7:2\n@playground:1:1");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].func, "view");
        assert_eq!(frames[1].func, "<anonymous>");
    }

    #[test]
    fn test_garbage_yields_no_frames() {
        assert!(parse_stack_text("not a stack at all").is_empty());
        assert!(parse_stack_text("").is_empty());
        assert!(parse_stack_text("at nowhere").is_empty());
    }

    #[test]
    fn test_source_label_with_colons() {
        let frames = parse_stack_text("    at view (https://play.vane.dev/realm:9:3)");
        assert_eq!((frames[0].line, frames[0].col), (9, 3));
    }
}
