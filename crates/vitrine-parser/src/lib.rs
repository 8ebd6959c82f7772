//! Example-language parser: converts a token stream into a [`Module`] AST.
//!
//! [`Module`]: vitrine_types::ast::Module

mod parse_expr;
mod parse_markup;
mod parse_stmt;
mod parser;

pub use parser::{ParseResult, Parser};

use vitrine_lexer::Lexer;
use vitrine_types::{CompileErrors, SourceFile};

/// Lex and parse source text in one step.
///
/// Lexer errors and parser errors are merged into a single collection; the
/// module is only returned when there were none of either.
pub fn parse_source(source_file: &SourceFile) -> ParseResult {
    let lex = Lexer::new(source_file).lex();
    let mut result = Parser::new(lex.tokens, source_file).parse();
    if lex.errors.has_errors() {
        let mut merged = CompileErrors::empty();
        for err in lex.errors.errors {
            merged.push_error(err);
        }
        for err in result.errors.errors {
            merged.push_error(err);
        }
        merged.total_errors = merged
            .total_errors
            .max(lex.errors.total_errors + result.errors.total_errors);
        result.errors = merged;
        result.module = None;
    }
    result
}
