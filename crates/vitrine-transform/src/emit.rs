//! Line-preserving emitter.
//!
//! The compiled module is the original source text with two kinds of edit
//! spliced in: import lines rewritten to their resolved specifiers, and
//! markup elements lowered to `h(...)` calls. Every edit occupies exactly
//! the lines its original occupied — interpolated expressions are re-emitted
//! as verbatim source slices, and generated syntax is padded with newlines
//! to keep each original line on its own output line. Line translation back
//! is therefore a constant prelude shift; only columns inside rewritten
//! regions are lost.

use vitrine_types::ast::*;
use vitrine_types::{SourceFile, Span};

use crate::line_map::{LineMap, PRELUDE_LINES};

/// Fixed text prepended to every compiled module. Must contain exactly
/// [`PRELUDE_LINES`] newlines.
const PRELUDE: &str = "// vitrine compiled module (generated)\n\n";

pub(crate) struct Emitter<'a> {
    src: &'a SourceFile,
    out: String,
    /// Output line currently being written (1-based).
    cur_line: u32,
    map: LineMap,
}

/// One splice into the original text.
enum Edit<'a> {
    /// Rewrite an import line to its resolved specifier.
    Import(&'a ImportDecl, &'a str),
    /// Lower a markup element.
    Element(&'a ElementExpr),
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(src: &'a SourceFile) -> Self {
        Self {
            src,
            out: String::new(),
            cur_line: 1,
            map: LineMap::new(src.line_count() as u32),
        }
    }

    /// Emit the whole module. `resolved_specs` is parallel to
    /// `module.imports` and carries each import's resolved specifier.
    pub(crate) fn emit_module(
        mut self,
        module: &Module,
        resolved_specs: &[String],
    ) -> (String, LineMap) {
        debug_assert_eq!(PRELUDE.matches('\n').count(), PRELUDE_LINES as usize);
        self.copy_verbatim(PRELUDE);

        let mut edits: Vec<(usize, usize, Edit<'_>)> = Vec::new();
        for (import, resolved) in module.imports.iter().zip(resolved_specs) {
            edits.push((
                self.start_offset(import.span),
                self.end_offset(import.span),
                Edit::Import(import, resolved.as_str()),
            ));
        }
        let mut elements = Vec::new();
        for stmt in &module.body {
            collect_stmt(stmt, &mut elements);
        }
        for el in elements {
            edits.push((
                self.start_offset(el.span),
                self.end_offset(el.span),
                Edit::Element(el),
            ));
        }
        edits.sort_by_key(|(start, _, _)| *start);

        let source: &'a str = self.src.source.as_str();
        let mut cursor = 0usize;
        for (start, end, edit) in edits {
            self.copy_verbatim(&source[cursor..start]);
            match edit {
                Edit::Import(import, resolved) => self.emit_import(import, resolved),
                Edit::Element(el) => {
                    let (first, last) = (el.span.start_line, el.span.end_line);
                    self.emit_element(el);
                    self.map.push_rewrite(first, last);
                }
            }
            cursor = end;
        }
        self.copy_verbatim(&source[cursor..]);

        (self.out, self.map)
    }

    // ── Output primitives ─────────────────────────────────────────────────

    /// Copy text through unchanged, tracking line count.
    fn copy_verbatim(&mut self, text: &str) {
        self.cur_line += text.matches('\n').count() as u32;
        self.out.push_str(text);
    }

    /// Write generated text. Must not contain newlines.
    fn write(&mut self, text: &str) {
        debug_assert!(!text.contains('\n'));
        self.out.push_str(text);
    }

    /// Pad with newlines until the output is on the line that corresponds
    /// to `original_line`.
    fn pad_to(&mut self, original_line: u32) {
        let target = original_line + self.map.prelude_lines;
        while self.cur_line < target {
            self.out.push('\n');
            self.cur_line += 1;
        }
    }

    fn start_offset(&self, span: Span) -> usize {
        self.src.offset(span.start_line, span.start_col).unwrap_or(0)
    }

    /// End-exclusive byte offset. Spliced spans (imports, elements,
    /// interpolated expressions) always end on an ASCII character, so one
    /// past the final column's byte is correct.
    fn end_offset(&self, span: Span) -> usize {
        self.src
            .offset(span.end_line, span.end_col)
            .map(|o| (o + 1).min(self.src.source.len()))
            .unwrap_or(self.src.source.len())
    }

    // ── Edits ─────────────────────────────────────────────────────────────

    /// `import { a, b } from "resolved"` — single line, same line.
    fn emit_import(&mut self, import: &ImportDecl, resolved: &str) {
        let names = import
            .names
            .iter()
            .map(|n| n.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.write(&format!("import {{ {names} }} from \"{resolved}\""));
        self.map
            .push_rewrite(import.span.start_line, import.span.end_line);
    }

    /// Lower one element to `h(tag, { props }, [ children ])`, keeping each
    /// original line's content on its own output line.
    fn emit_element(&mut self, el: &ElementExpr) {
        self.write("h(");
        if el.is_component() {
            self.write(&el.name.name);
        } else {
            self.write(&format!("\"{}\"", el.name.name));
        }
        self.write(", {");
        for attr in &el.attrs {
            self.pad_to(attr.span.start_line);
            self.write(&format!("\"{}\": ", attr.name.name));
            match &attr.value {
                None => self.write("true"),
                Some(AttrValue::Str(s, _)) => {
                    let quoted = quote_string(s);
                    self.write(&quoted);
                }
                Some(AttrValue::Expr(expr)) => self.emit_expr(expr),
            }
            self.write(", ");
        }
        self.write("}, [");
        for child in &el.children {
            self.pad_to(child.span().start_line);
            match child {
                Child::Text(text) => {
                    let quoted = quote_string(&text.text);
                    self.write(&quoted);
                }
                Child::Expr(expr) => self.emit_expr(expr),
                Child::Element(nested) => self.emit_element(nested),
            }
            self.write(", ");
        }
        self.pad_to(el.span.end_line);
        self.write("])");
    }

    /// Emit an interpolated or attribute expression: a verbatim source
    /// slice, parenthesised, with any markup inside it lowered recursively.
    fn emit_expr(&mut self, expr: &Expr) {
        if let ExprKind::Element(el) = &expr.kind {
            self.emit_element(el);
            return;
        }

        let mut elements = Vec::new();
        collect_expr(expr, &mut elements);

        self.write("(");
        let source: &'a str = self.src.source.as_str();
        let mut cursor = self.start_offset(expr.span);
        let end = self.end_offset(expr.span);
        for el in elements {
            let el_start = self.start_offset(el.span);
            let el_end = self.end_offset(el.span);
            self.copy_verbatim(&source[cursor..el_start]);
            self.emit_element(el);
            cursor = el_end;
        }
        self.copy_verbatim(&source[cursor..end]);
        self.write(")");
    }
}

/// Quote and escape a string for re-emission as a literal.
fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

// ─────────────────────────────────────────────────────────────────────
// Outermost-element collection
// ─────────────────────────────────────────────────────────────────────

fn collect_stmt<'a>(stmt: &'a Stmt, out: &mut Vec<&'a ElementExpr>) {
    match stmt {
        Stmt::Let(s) => collect_expr(&s.value, out),
        Stmt::Assign(s) => collect_expr(&s.value, out),
        Stmt::Fn(s) => collect_block(&s.body, out),
        Stmt::Return(s) => {
            if let Some(value) = &s.value {
                collect_expr(value, out);
            }
        }
        Stmt::If(s) => collect_if(s, out),
        Stmt::Expr(e) => collect_expr(e, out),
    }
}

fn collect_if<'a>(ifs: &'a IfStmt, out: &mut Vec<&'a ElementExpr>) {
    collect_expr(&ifs.condition, out);
    collect_block(&ifs.then_block, out);
    match &ifs.else_branch {
        Some(ElseBranch::ElseIf(nested)) => collect_if(nested, out),
        Some(ElseBranch::Block(block)) => collect_block(block, out),
        None => {}
    }
}

fn collect_block<'a>(block: &'a Block, out: &mut Vec<&'a ElementExpr>) {
    for stmt in &block.stmts {
        collect_stmt(stmt, out);
    }
}

/// Collect outermost markup elements. Found elements are not descended
/// into — their interiors are handled when they are lowered.
fn collect_expr<'a>(expr: &'a Expr, out: &mut Vec<&'a ElementExpr>) {
    match &expr.kind {
        ExprKind::Element(el) => out.push(el),
        ExprKind::Unary { operand, .. } => collect_expr(operand, out),
        ExprKind::Binary { left, right, .. } => {
            collect_expr(left, out);
            collect_expr(right, out);
        }
        ExprKind::Call { callee, args } => {
            collect_expr(callee, out);
            for arg in args {
                collect_expr(arg, out);
            }
        }
        ExprKind::Member { object, .. } => collect_expr(object, out),
        ExprKind::Paren(inner) => collect_expr(inner, out),
        ExprKind::ListLit(elems) => {
            for elem in elems {
                collect_expr(elem, out);
            }
        }
        ExprKind::ObjectLit(entries) => {
            for entry in entries {
                collect_expr(&entry.value, out);
            }
        }
        ExprKind::Lambda(lambda) => collect_block(&lambda.body, out),
        ExprKind::NumberLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::NilLit
        | ExprKind::Identifier(_) => {}
    }
}
