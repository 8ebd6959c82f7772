//! Host-side collaborator boundaries.
//!
//! The editor widget and the output pane are black boxes to the core: the
//! pipeline only talks to them through these capability traits.

use vitrine_types::Diagnostic;

/// The text editor boundary.
pub trait EditorPort {
    /// Replace the editor contents (boot, example switch).
    fn set_text(&mut self, text: &str);
    /// Attach an inline annotation at an original-source position. `col` is
    /// absent when only the line could be resolved.
    fn annotate(&mut self, line: u32, col: Option<u32>, message: &str);
    /// Remove all annotations.
    fn clear_annotations(&mut self);
}

/// The output pane boundary — pure presentation.
pub trait OutputPort {
    /// Show an error summary (with frames) in the pane.
    fn show_diagnostic(&mut self, diagnostic: &Diagnostic);
    /// Clear any shown error.
    fn clear_diagnostic(&mut self);
    /// The realm's mounted surface changed; re-read and re-render it.
    fn surface_changed(&mut self);
}
