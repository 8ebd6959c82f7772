//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 6. `||`
//! 5. `&&`
//! 4. `==`, `!=`, `<`, `>`, `<=`, `>=` (no chaining)
//! 3. `+`, `-`
//! 2. `*`, `/`, `%`
//! 1. unary `-`, `!`
//! 0. `.` (member access), `()` (call) — postfix

use crate::parser::Parser;
use vitrine_lexer::token::TokenKind;
use vitrine_types::ast::*;
use vitrine_types::ErrorCode;

/// Maximum expression nesting depth (markup elements count too).
pub(crate) const MAX_EXPR_DEPTH: u32 = 32;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::DEPTH_EXCEEDED,
                format!("maximum expression nesting depth is {MAX_EXPR_DEPTH}"),
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = self.parse_or();
        self.expr_depth -= 1;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `OrExpr = AndExpr { "||" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op: BinOp::Or,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `AndExpr = CompExpr { "&&" CompExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_comparison()?;
        while self.eat(&TokenKind::AndAnd) {
            let right = self.parse_comparison()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op: BinOp::And,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `CompExpr = AddExpr [ CompOp AddExpr ]`
    ///
    /// Comparison operators do NOT chain: `a < b < c` is a parse error.
    fn parse_comparison(&mut self) -> Option<Expr> {
        let mut left = self.parse_add()?;
        if let Some(op) = self.match_comparison_op() {
            self.advance(); // consume operator
            let right = self.parse_add()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
            // Reject chaining
            if self.match_comparison_op().is_some() {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "comparison operators cannot be chained; use '&&' to combine: a < b && b < c",
                );
            }
        }
        Some(left)
    }

    /// Check if current token is a comparison operator, return corresponding BinOp.
    fn match_comparison_op(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        }
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_add(&mut self) -> Option<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "%") UnaryExpr }`
    fn parse_mul(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    /// `UnaryExpr = ("-" | "!") UnaryExpr | PostfixExpr`
    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Some(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    /// Postfix operators: call `(args)` and member access `.field`.
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check_exact(&TokenKind::RParen) && !self.at_end() {
                        args.push(self.parse_expression()?);
                        if !self.eat_comma() {
                            break;
                        }
                    }
                    self.expect(&TokenKind::RParen)?;
                    let span = expr.span.merge(self.previous_span());
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let field = self.expect_identifier()?;
                    let span = expr.span.merge(field.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            field,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        Some(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Some(Expr::new(ExprKind::NumberLit(n), span))
            }
            TokenKind::Str(s) => {
                self.advance();
                Some(Expr::new(ExprKind::StringLit(s), span))
            }
            TokenKind::True => {
                self.advance();
                Some(Expr::new(ExprKind::BoolLit(true), span))
            }
            TokenKind::False => {
                self.advance();
                Some(Expr::new(ExprKind::BoolLit(false), span))
            }
            TokenKind::Nil => {
                self.advance();
                Some(Expr::new(ExprKind::NilLit, span))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Some(Expr::new(ExprKind::Identifier(name), span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                let full = span.merge(self.previous_span());
                Some(Expr::new(ExprKind::Paren(Box::new(inner)), full))
            }
            TokenKind::LBracket => self.parse_list_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Fn => self.parse_lambda(),
            TokenKind::MarkupOpen => {
                let element = self.parse_element()?;
                let span = element.span;
                Some(Expr::new(ExprKind::Element(Box::new(element)), span))
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                None
            }
        }
    }

    /// `[a, b, c]`
    fn parse_list_literal(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // eat `[`
        let mut elems = Vec::new();
        while !self.check_exact(&TokenKind::RBracket) && !self.at_end() {
            elems.push(self.parse_expression()?);
            if !self.eat_comma() {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::ListLit(elems), span))
    }

    /// `{ key: expr, "key": expr }`
    fn parse_object_literal(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // eat `{`
        self.skip_newlines();
        let mut entries = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) && !self.at_end() {
            let entry_start = self.current_span();
            let key = match self.peek_kind().clone() {
                TokenKind::Identifier(name) => {
                    let span = self.advance().span;
                    Ident::new(name, span)
                }
                TokenKind::Str(s) => {
                    let span = self.advance().span;
                    Ident::new(s, span)
                }
                other => {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("expected object key, got '{other}'"),
                    );
                    return None;
                }
            };
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            let span = entry_start.merge(self.previous_span());
            entries.push(ObjectEntry { key, value, span });
            if !self.eat_comma() {
                break;
            }
            self.skip_newlines();
        }
        self.skip_newlines();
        self.expect(&TokenKind::RBrace)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(ExprKind::ObjectLit(entries), span))
    }

    /// `fn(params) { body }`
    fn parse_lambda(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // eat `fn`
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(
            ExprKind::Lambda(LambdaExpr {
                params,
                body,
                span,
            }),
            span,
        ))
    }
}
