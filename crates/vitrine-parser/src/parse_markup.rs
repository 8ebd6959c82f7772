//! Inline markup parsing: elements, attributes, children.

use crate::parser::Parser;
use vitrine_lexer::token::TokenKind;
use vitrine_types::ast::*;
use vitrine_types::ErrorCode;

impl<'src> Parser<'src> {
    /// Parse an element: `<name attrs> children </name>` or `<name attrs />`.
    ///
    /// The current token must be [`TokenKind::MarkupOpen`]. Elements count
    /// toward the expression nesting limit — child elements recurse here
    /// without going through `parse_expression`.
    pub(crate) fn parse_element(&mut self) -> Option<ElementExpr> {
        self.expr_depth += 1;
        if self.expr_depth > crate::parse_expr::MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::DEPTH_EXCEEDED,
                format!(
                    "maximum expression nesting depth is {}",
                    crate::parse_expr::MAX_EXPR_DEPTH
                ),
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = self.parse_element_inner();
        self.expr_depth -= 1;
        result
    }

    fn parse_element_inner(&mut self) -> Option<ElementExpr> {
        let start = self.current_span();
        self.expect(&TokenKind::MarkupOpen)?;
        let name = self.expect_identifier()?;

        // Attributes until the tag ends
        let mut attrs = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Identifier(_) => {
                    if let Some(attr) = self.parse_attr() {
                        attrs.push(attr);
                    } else {
                        return None;
                    }
                }
                TokenKind::MarkupSelfClose => {
                    self.advance();
                    let span = start.merge(self.previous_span());
                    return Some(ElementExpr {
                        name,
                        attrs,
                        children: Vec::new(),
                        self_closing: true,
                        span,
                    });
                }
                TokenKind::MarkupEnd => {
                    self.advance();
                    break;
                }
                other => {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("expected attribute or '>', got '{other}'"),
                    );
                    return None;
                }
            }
        }

        // Children until the matching close tag
        let mut children = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::MarkupOpen => {
                    let child = self.parse_element()?;
                    children.push(Child::Element(child));
                }
                TokenKind::MarkupText(_) => {
                    if let TokenKind::MarkupText(text) = self.peek_kind().clone() {
                        let span = self.advance().span;
                        children.push(Child::Text(TextRun { text, span }));
                    }
                }
                TokenKind::LBrace => {
                    self.advance();
                    let expr = self.parse_expression()?;
                    self.expect(&TokenKind::RBrace)?;
                    children.push(Child::Expr(expr));
                }
                TokenKind::MarkupClose => {
                    self.advance();
                    let close_name = self.expect_identifier()?;
                    if close_name.name != name.name {
                        self.error_at(
                            ErrorCode::MISMATCHED_CLOSE_TAG,
                            format!(
                                "closing tag '</{}>' does not match opening tag '<{}>'",
                                close_name.name, name.name
                            ),
                            close_name.span,
                        );
                    }
                    self.expect(&TokenKind::MarkupEnd)?;
                    break;
                }
                TokenKind::Eof => {
                    self.error_at(
                        ErrorCode::UNTERMINATED_MARKUP,
                        format!("element '<{}>' is never closed", name.name),
                        start,
                    );
                    return None;
                }
                other => {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("unexpected '{other}' in element children"),
                    );
                    return None;
                }
            }
        }

        let span = start.merge(self.previous_span());
        Some(ElementExpr {
            name,
            attrs,
            children,
            self_closing: false,
            span,
        })
    }

    /// One attribute: `name`, `name="str"`, or `name={expr}`.
    fn parse_attr(&mut self) -> Option<Attr> {
        let start = self.current_span();
        let name = self.expect_identifier()?;
        let value = if self.eat(&TokenKind::Eq) {
            match self.peek_kind().clone() {
                TokenKind::Str(s) => {
                    let span = self.advance().span;
                    Some(AttrValue::Str(s, span))
                }
                TokenKind::LBrace => {
                    self.advance();
                    let expr = self.parse_expression()?;
                    self.expect(&TokenKind::RBrace)?;
                    Some(AttrValue::Expr(expr))
                }
                other => {
                    self.error_at_current(
                        ErrorCode::UNEXPECTED_TOKEN,
                        format!("expected string or '{{expr}}' attribute value, got '{other}'"),
                    );
                    return None;
                }
            }
        } else {
            None
        };
        let span = start.merge(self.previous_span());
        Some(Attr { name, value, span })
    }
}
