//! Module and statement parsing.

use crate::parser::{ParseResult, Parser};
use vitrine_lexer::token::TokenKind;
use vitrine_types::ast::*;
use vitrine_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse a complete module: imports followed by statements.
    pub fn parse(mut self) -> ParseResult {
        let start = self.current_span();
        let mut imports = Vec::new();
        let mut body = Vec::new();
        let mut seen_stmt = false;

        self.skip_newlines();
        while !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if self.check_exact(&TokenKind::Import) {
                if seen_stmt {
                    self.error_at_current(
                        ErrorCode::IMPORT_NOT_AT_TOP_LEVEL,
                        "imports must appear before any other statement",
                    );
                }
                match self.parse_import() {
                    Some(import) => {
                        imports.push(import);
                        self.expect_newline_or_eof();
                    }
                    None => self.synchronize(),
                }
            } else {
                seen_stmt = true;
                match self.parse_statement() {
                    Some(stmt) => body.push(stmt),
                    None => self.synchronize(),
                }
            }
            self.skip_newlines();
        }

        let span = start.merge(self.previous_span());
        let errors = self.take_errors();
        let module = if errors.has_errors() {
            None
        } else {
            Some(Module {
                imports,
                body,
                span,
            })
        };
        ParseResult { module, errors }
    }

    /// `import { a, b } from "specifier"`
    fn parse_import(&mut self) -> Option<ImportDecl> {
        let start = self.current_span();
        self.advance(); // eat `import`
        self.expect(&TokenKind::LBrace)?;
        let mut names = Vec::new();
        loop {
            if self.check_exact(&TokenKind::RBrace) {
                break;
            }
            let name = self.expect_identifier()?;
            if names.iter().any(|n: &Ident| n.name == name.name) {
                self.error_at(
                    ErrorCode::DUPLICATE_IMPORT_NAME,
                    format!("'{}' is imported twice", name.name),
                    name.span,
                );
            }
            names.push(name);
            if !self.eat_comma() {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        self.expect(&TokenKind::From)?;
        let (specifier, specifier_span) = self.expect_string_literal()?;
        let span = start.merge(self.previous_span());
        Some(ImportDecl {
            names,
            specifier,
            specifier_span,
            span,
        })
    }

    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> Option<Block> {
        let start = self.current_span();
        self.expect(&TokenKind::LBrace)?;
        self.skip_newlines();
        let mut stmts = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            if self.too_many_errors() {
                break;
            }
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            } else {
                self.synchronize();
            }
            self.skip_newlines();
        }
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Block { stmts, span })
    }

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        self.skip_newlines();
        if self.at_end() || self.check_exact(&TokenKind::RBrace) {
            return None;
        }
        match self.peek_kind() {
            TokenKind::Let => self.parse_let_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::If => self.parse_if_stmt().map(Stmt::If),
            // `fn name(...)` is a declaration; `fn (...)` is a lambda expression
            TokenKind::Fn if matches!(self.look_ahead(1), TokenKind::Identifier(_)) => {
                self.parse_fn_decl()
            }
            // `name = expr` is assignment (but `name ==` is comparison)
            TokenKind::Identifier(_) if self.look_ahead(1) == &TokenKind::Eq => {
                self.parse_assign_stmt()
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect_newline_or_eof();
                Some(Stmt::Expr(expr))
            }
        }
    }

    /// `let name = expr`
    fn parse_let_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `let`
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expression()?;
        let span = start.merge(self.previous_span());
        self.expect_newline_or_eof();
        Some(Stmt::Let(LetStmt { name, value, span }))
    }

    /// `name = expr`
    fn parse_assign_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_expression()?;
        let span = start.merge(self.previous_span());
        self.expect_newline_or_eof();
        Some(Stmt::Assign(AssignStmt { name, value, span }))
    }

    /// `fn name(params) { body }`
    fn parse_fn_decl(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `fn`
        let name = self.expect_identifier()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let span = start.merge(self.previous_span());
        self.expect_newline_or_eof();
        Some(Stmt::Fn(FnDecl {
            name,
            params,
            body,
            span,
        }))
    }

    /// `(a, b, c)` — parameter list.
    pub(crate) fn parse_params(&mut self) -> Option<Vec<Ident>> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
            params.push(self.expect_identifier()?);
            if !self.eat_comma() {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(params)
    }

    /// `return [expr]`
    fn parse_return_stmt(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance(); // eat `return`
        let value = if self.check_exact(&TokenKind::Newline)
            || self.check_exact(&TokenKind::RBrace)
            || self.at_end()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let span = start.merge(self.previous_span());
        self.expect_newline_or_eof();
        Some(Stmt::Return(ReturnStmt { value, span }))
    }

    /// `if cond { } [else if ... | else { }]`
    fn parse_if_stmt(&mut self) -> Option<IfStmt> {
        let start = self.current_span();
        self.advance(); // eat `if`
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;
        let else_branch = if self.eat(&TokenKind::Else) {
            if self.check_exact(&TokenKind::If) {
                Some(ElseBranch::ElseIf(Box::new(self.parse_if_stmt()?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(IfStmt {
            condition,
            then_block,
            else_branch,
            span,
        })
    }
}
