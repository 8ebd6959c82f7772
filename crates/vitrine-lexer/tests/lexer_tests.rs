//! Lexer tests for the example language.
//!
//! Covers: keywords, operators, literals, comments, newline handling, the
//! markup mode stack (tags, text runs, interpolations), the `<`
//! disambiguation rule, and error recovery.

use vitrine_lexer::{Lexer, TokenKind};
use vitrine_types::SourceFile;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Lex source text and return just the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    let sf = SourceFile::new("playground", source);
    let result = Lexer::new(&sf).lex();
    result
        .tokens
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

/// Lex and return the error count.
fn error_count(source: &str) -> usize {
    let sf = SourceFile::new("playground", source);
    let result = Lexer::new(&sf).lex();
    result.errors.total_errors
}

/// Lex and return the first error message.
fn first_error(source: &str) -> String {
    let sf = SourceFile::new("playground", source);
    let result = Lexer::new(&sf).lex();
    result
        .errors
        .errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_default()
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.into())
}

// ─────────────────────────────────────────────────────────────────────
// Plain code
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_import_line() {
    assert_eq!(
        kinds("import { h, mount } from \"vane\""),
        vec![
            TokenKind::Import,
            TokenKind::LBrace,
            ident("h"),
            TokenKind::Comma,
            ident("mount"),
            TokenKind::RBrace,
            TokenKind::From,
            TokenKind::Str("vane".into()),
        ]
    );
}

#[test]
fn test_keywords_and_identifiers() {
    assert_eq!(
        kinds("let counter = nil"),
        vec![
            TokenKind::Let,
            ident("counter"),
            TokenKind::Eq,
            TokenKind::Nil,
        ]
    );
    // Keywords are exact words; prefixes stay identifiers
    assert_eq!(kinds("letter"), vec![ident("letter")]);
}

#[test]
fn test_number_literals() {
    assert_eq!(
        kinds("0 42 3.25"),
        vec![
            TokenKind::Number(0.0),
            TokenKind::Number(42.0),
            TokenKind::Number(3.25),
        ]
    );
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        kinds(r#""a\nb\t\"q\"""#),
        vec![TokenKind::Str("a\nb\t\"q\"".into())]
    );
}

#[test]
fn test_unknown_escape_is_error() {
    assert_eq!(error_count(r#""a\qb""#), 1);
    assert!(first_error(r#""a\qb""#).contains("escape"));
}

#[test]
fn test_unterminated_string() {
    assert!(first_error("\"abc\nlet x = 1").contains("unterminated string"));
}

#[test]
fn test_operators() {
    assert_eq!(
        kinds("a == b != c <= d >= e && f || !g"),
        vec![
            ident("a"),
            TokenKind::EqEq,
            ident("b"),
            TokenKind::BangEq,
            ident("c"),
            TokenKind::LessEq,
            ident("d"),
            TokenKind::GreaterEq,
            ident("e"),
            TokenKind::AndAnd,
            ident("f"),
            TokenKind::OrOr,
            TokenKind::Bang,
            ident("g"),
        ]
    );
}

#[test]
fn test_comments_stripped() {
    assert_eq!(
        kinds("let a = 1 // trailing\n// full line\nlet b = 2"),
        vec![
            TokenKind::Let,
            ident("a"),
            TokenKind::Eq,
            TokenKind::Number(1.0),
            TokenKind::Newline,
            TokenKind::Newline,
            TokenKind::Let,
            ident("b"),
            TokenKind::Eq,
            TokenKind::Number(2.0),
        ]
    );
}

#[test]
fn test_newlines_suppressed_inside_groups() {
    let toks = kinds("mount(\n  view\n)");
    assert!(!toks.contains(&TokenKind::Newline));
}

#[test]
fn test_single_ampersand_is_error() {
    assert_eq!(error_count("a & b"), 1);
}

// ─────────────────────────────────────────────────────────────────────
// The `<` disambiguation rule
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_less_than_after_operand() {
    assert_eq!(
        kinds("count < 10"),
        vec![ident("count"), TokenKind::Less, TokenKind::Number(10.0)]
    );
}

#[test]
fn test_markup_after_equals() {
    let toks = kinds("let v = <div/>");
    assert!(toks.contains(&TokenKind::MarkupOpen));
    assert!(toks.contains(&TokenKind::MarkupSelfClose));
}

#[test]
fn test_markup_after_return() {
    let toks = kinds("return <span/>");
    assert_eq!(toks[0], TokenKind::Return);
    assert_eq!(toks[1], TokenKind::MarkupOpen);
}

// ─────────────────────────────────────────────────────────────────────
// Markup modes
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_self_closing_element() {
    assert_eq!(
        kinds("let v = <hr/>"),
        vec![
            TokenKind::Let,
            ident("v"),
            TokenKind::Eq,
            TokenKind::MarkupOpen,
            ident("hr"),
            TokenKind::MarkupSelfClose,
        ]
    );
}

#[test]
fn test_element_with_text_child() {
    assert_eq!(
        kinds("let v = <b> hi there </b>"),
        vec![
            TokenKind::Let,
            ident("v"),
            TokenKind::Eq,
            TokenKind::MarkupOpen,
            ident("b"),
            TokenKind::MarkupEnd,
            TokenKind::MarkupText("hi there".into()),
            TokenKind::MarkupClose,
            ident("b"),
            TokenKind::MarkupEnd,
        ]
    );
}

#[test]
fn test_attr_string_and_interpolation() {
    assert_eq!(
        kinds("let v = <div class=\"box\" count={n}/>"),
        vec![
            TokenKind::Let,
            ident("v"),
            TokenKind::Eq,
            TokenKind::MarkupOpen,
            ident("div"),
            ident("class"),
            TokenKind::Eq,
            TokenKind::Str("box".into()),
            ident("count"),
            TokenKind::Eq,
            TokenKind::LBrace,
            ident("n"),
            TokenKind::RBrace,
            TokenKind::MarkupSelfClose,
        ]
    );
}

#[test]
fn test_dashed_attr_names() {
    let toks = kinds("let v = <div data-id=\"x\"/>");
    assert!(toks.contains(&ident("data-id")));
}

#[test]
fn test_keywords_not_reserved_in_tags() {
    let toks = kinds("let v = <div if=\"x\"/>");
    assert!(toks.contains(&ident("if")));
}

#[test]
fn test_nested_elements() {
    assert_eq!(
        kinds("let v = <ul><li/></ul>"),
        vec![
            TokenKind::Let,
            ident("v"),
            TokenKind::Eq,
            TokenKind::MarkupOpen,
            ident("ul"),
            TokenKind::MarkupEnd,
            TokenKind::MarkupOpen,
            ident("li"),
            TokenKind::MarkupSelfClose,
            TokenKind::MarkupClose,
            ident("ul"),
            TokenKind::MarkupEnd,
        ]
    );
}

#[test]
fn test_text_interpolation() {
    assert_eq!(
        kinds("let v = <span>count: {n}</span>"),
        vec![
            TokenKind::Let,
            ident("v"),
            TokenKind::Eq,
            TokenKind::MarkupOpen,
            ident("span"),
            TokenKind::MarkupEnd,
            TokenKind::MarkupText("count:".into()),
            TokenKind::LBrace,
            ident("n"),
            TokenKind::RBrace,
            TokenKind::MarkupClose,
            ident("span"),
            TokenKind::MarkupEnd,
        ]
    );
}

#[test]
fn test_interpolation_with_nested_braces() {
    // The lambda's braces must not close the interpolation early
    let toks = kinds("let v = <button onclick={fn() { go() }}>go</button>");
    let closes = toks
        .iter()
        .filter(|t| **t == TokenKind::MarkupClose)
        .count();
    assert_eq!(closes, 1);
    assert!(toks.contains(&TokenKind::Fn));
}

#[test]
fn test_nested_markup_inside_interpolation() {
    let toks = kinds("let v = <div>{ok && <b>yes</b>}</div>");
    let opens = toks
        .iter()
        .filter(|t| **t == TokenKind::MarkupOpen)
        .count();
    assert_eq!(opens, 2);
    assert!(toks.contains(&TokenKind::AndAnd));
}

#[test]
fn test_multiline_markup_has_no_newline_tokens() {
    let toks = kinds("let v = <div>\n  <hr/>\n</div>");
    assert!(!toks.contains(&TokenKind::Newline));
}

#[test]
fn test_whitespace_only_text_is_dropped() {
    let toks = kinds("let v = <div>  \n  </div>");
    assert!(!toks
        .iter()
        .any(|t| matches!(t, TokenKind::MarkupText(_))));
}

#[test]
fn test_text_whitespace_collapsed() {
    let toks = kinds("let v = <p>two\n   words</p>");
    assert!(toks.contains(&TokenKind::MarkupText("two words".into())));
}

#[test]
fn test_unterminated_markup() {
    assert!(first_error("let v = <div>").contains("unterminated markup"));
}

#[test]
fn test_code_after_markup_statement() {
    let toks = kinds("let v = <hr/>\nlet w = 1");
    assert!(toks.contains(&TokenKind::Newline));
    assert!(toks.contains(&ident("w")));
}

// ─────────────────────────────────────────────────────────────────────
// Error recovery
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_error_cap() {
    let bad = "~ ".repeat(40);
    let sf = SourceFile::new("playground", bad);
    let result = Lexer::new(&sf).lex();
    assert!(result.errors.total_errors <= vitrine_types::MAX_ERRORS);
    assert_eq!(result.tokens.last().unwrap().kind, TokenKind::Eof);
}

#[test]
fn test_unicode_in_strings_and_text() {
    assert_eq!(
        kinds("let s = \"héllo → 世界\""),
        vec![
            TokenKind::Let,
            ident("s"),
            TokenKind::Eq,
            TokenKind::Str("héllo → 世界".into()),
        ]
    );
    let toks = kinds("let v = <p>héllo 世界</p>");
    assert!(toks.contains(&TokenKind::MarkupText("héllo 世界".into())));
}
