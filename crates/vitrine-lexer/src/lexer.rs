//! Example-language lexer — converts source text to a token stream.
//!
//! Features:
//! - Plain module code tokens (keywords, operators, literals, punctuation)
//! - Inline markup via a mode stack: tag scanning, raw text runs, and
//!   `{expr}` interpolations that drop back to code scanning
//! - `<` disambiguation: markup starts only where an expression may start
//!   and a letter follows; otherwise `<` is the less-than operator
//! - Single-line comments stripped (`//`)
//! - Error recovery: collects up to 20 errors instead of stopping at the first
//! - Newline-separated statements (no semicolons); newlines inside
//!   parentheses, brackets, tags, and interpolations are not tokens

use vitrine_types::{CompileError, CompileErrors, ErrorCode, SourceFile, Span};

use crate::token::{Token, TokenKind};

/// Lexer mode — tracks whether we're scanning module code, the inside of a
/// markup tag, element text content, or an `{expr}` interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Top-level module code.
    Code,
    /// Inside `< ... >`. `closing` is true for `</name>` tags.
    Tag { closing: bool },
    /// Between an open tag's `>` and the next `<` — raw text content.
    Text,
    /// Inside a `{...}` interpolation. The `u32` tracks brace depth so we
    /// know when the interpolation's closing `}` is reached.
    Interp { brace_depth: u32 },
}

/// The example-language lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`vitrine_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// Source file for error line context.
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, bytes).
    col: u32,
    /// Collected errors.
    errors: CompileErrors,
    /// Mode stack for markup and interpolation.
    mode_stack: Vec<Mode>,
    /// Open `(`/`[` depth — newlines are suppressed inside groups.
    group_depth: u32,
    /// Whether an expression may start at the current position (drives the
    /// `<` markup-vs-less-than decision).
    expr_start: bool,
    /// Pending tokens to emit before the next scan (used when a text run
    /// and its terminating delimiter are found together).
    pending: Vec<Token>,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Errors encountered during lexing.
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
            mode_stack: vec![Mode::Code],
            group_depth: 0,
            expr_start: true,
            pending: Vec::new(),
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.total_errors >= vitrine_types::MAX_ERRORS {
                break;
            }

            // Drain any pending tokens first (delimiter after a text run)
            if let Some(pending) = self.pending.pop() {
                self.expr_start = pending.kind.allows_expr_start();
                tokens.push(pending);
                continue;
            }

            let token = match self.current_mode() {
                Mode::Code | Mode::Interp { .. } => self.scan_code(),
                Mode::Tag { .. } => self.scan_tag(),
                Mode::Text => self.scan_text(),
            };

            let is_eof = token.kind == TokenKind::Eof;
            self.expr_start = token.kind.allows_expr_start();
            tokens.push(token);

            if is_eof {
                break;
            }
        }

        // Ensure token stream always ends with Eof
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mode stack helpers
    // ─────────────────────────────────────────────────────────────

    fn current_mode(&self) -> Mode {
        *self.mode_stack.last().unwrap_or(&Mode::Code)
    }

    fn push_mode(&mut self, mode: Mode) {
        self.mode_stack.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.mode_stack.len() > 1 {
            self.mode_stack.pop();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self.source_file.line(span.start_line).unwrap_or("").to_string();
        self.errors
            .push_error(CompileError::new(code, message, span, source_line));
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip spaces and tabs (NOT newlines — those are tokens in code mode).
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b' ' || ch == b'\t' || ch == b'\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip a single-line comment (`// ...`).
    /// Returns `true` if a comment was consumed.
    fn skip_comment(&mut self) -> bool {
        if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'/') {
            while let Some(ch) = self.peek() {
                if ch == b'\n' {
                    break;
                }
                self.advance();
            }
            true
        } else {
            false
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Code-mode scanning (also used inside interpolations)
    // ─────────────────────────────────────────────────────────────

    /// Scan one token in code mode.
    fn scan_code(&mut self) -> Token {
        self.skip_whitespace();

        if self.skip_comment() {
            return self.scan_code();
        }

        if self.at_end() {
            self.report_unterminated_modes();
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let start_line = self.line;
        let start_col = self.col;
        let ch = self.advance().unwrap();

        match ch {
            // ── Newline ──
            b'\n' => {
                // Not a statement separator inside groups or interpolations
                if self.group_depth > 0 || matches!(self.current_mode(), Mode::Interp { .. }) {
                    return self.scan_code();
                }
                Token::new(TokenKind::Newline, self.span_from(start_line, start_col))
            }

            // ── String literal ──
            b'"' => self.scan_string(start_line, start_col),

            // ── Number literal ──
            b'0'..=b'9' => self.scan_number(start_line, start_col),

            // ── Identifiers & keywords ──
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(start_line, start_col, false),

            // ── Punctuation ──
            b'(' => {
                self.group_depth += 1;
                Token::new(TokenKind::LParen, self.span_from(start_line, start_col))
            }
            b')' => {
                self.group_depth = self.group_depth.saturating_sub(1);
                Token::new(TokenKind::RParen, self.span_from(start_line, start_col))
            }
            b'[' => {
                self.group_depth += 1;
                Token::new(TokenKind::LBracket, self.span_from(start_line, start_col))
            }
            b']' => {
                self.group_depth = self.group_depth.saturating_sub(1);
                Token::new(TokenKind::RBracket, self.span_from(start_line, start_col))
            }
            b'{' => {
                if let Mode::Interp { brace_depth } = self.current_mode() {
                    self.set_interp_depth(brace_depth + 1);
                }
                Token::new(TokenKind::LBrace, self.span_from(start_line, start_col))
            }
            b'}' => {
                if let Mode::Interp { brace_depth } = self.current_mode() {
                    if brace_depth <= 1 {
                        self.pop_mode();
                    } else {
                        self.set_interp_depth(brace_depth - 1);
                    }
                }
                Token::new(TokenKind::RBrace, self.span_from(start_line, start_col))
            }
            b',' => Token::new(TokenKind::Comma, self.span_from(start_line, start_col)),
            b':' => Token::new(TokenKind::Colon, self.span_from(start_line, start_col)),
            b'.' => Token::new(TokenKind::Dot, self.span_from(start_line, start_col)),

            // ── Operators ──
            b'+' => Token::new(TokenKind::Plus, self.span_from(start_line, start_col)),
            b'-' => Token::new(TokenKind::Minus, self.span_from(start_line, start_col)),
            b'*' => Token::new(TokenKind::Star, self.span_from(start_line, start_col)),
            b'/' => Token::new(TokenKind::Slash, self.span_from(start_line, start_col)),
            b'%' => Token::new(TokenKind::Percent, self.span_from(start_line, start_col)),
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Token::new(TokenKind::EqEq, self.span_from(start_line, start_col))
                } else {
                    Token::new(TokenKind::Eq, self.span_from(start_line, start_col))
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Token::new(TokenKind::BangEq, self.span_from(start_line, start_col))
                } else {
                    Token::new(TokenKind::Bang, self.span_from(start_line, start_col))
                }
            }
            b'<' => {
                // Markup start: expression position and a letter follows
                if self.expr_start && matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
                    self.push_mode(Mode::Tag { closing: false });
                    Token::new(TokenKind::MarkupOpen, self.span_from(start_line, start_col))
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    Token::new(TokenKind::LessEq, self.span_from(start_line, start_col))
                } else {
                    Token::new(TokenKind::Less, self.span_from(start_line, start_col))
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    Token::new(TokenKind::GreaterEq, self.span_from(start_line, start_col))
                } else {
                    Token::new(TokenKind::Greater, self.span_from(start_line, start_col))
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.advance();
                    Token::new(TokenKind::AndAnd, self.span_from(start_line, start_col))
                } else {
                    self.emit_error(
                        ErrorCode::INVALID_CHARACTER,
                        "single '&' is not an operator; use '&&'",
                        self.span_from(start_line, start_col),
                    );
                    self.next_or_eof()
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.advance();
                    Token::new(TokenKind::OrOr, self.span_from(start_line, start_col))
                } else {
                    self.emit_error(
                        ErrorCode::INVALID_CHARACTER,
                        "single '|' is not an operator; use '||'",
                        self.span_from(start_line, start_col),
                    );
                    self.next_or_eof()
                }
            }

            other => {
                self.emit_error(
                    ErrorCode::INVALID_CHARACTER,
                    format!("unexpected character '{}'", other as char),
                    self.span_from(start_line, start_col),
                );
                self.next_or_eof()
            }
        }
    }

    /// Continue scanning after a recovered error, bailing to Eof once the
    /// error cap is reached so garbage input cannot recurse unboundedly.
    fn next_or_eof(&mut self) -> Token {
        if self.errors.total_errors >= vitrine_types::MAX_ERRORS {
            return Token::new(TokenKind::Eof, self.current_span());
        }
        match self.current_mode() {
            Mode::Code | Mode::Interp { .. } => self.scan_code(),
            Mode::Tag { .. } => self.scan_tag(),
            Mode::Text => self.scan_text(),
        }
    }

    fn set_interp_depth(&mut self, depth: u32) {
        if let Some(top @ Mode::Interp { .. }) = self.mode_stack.last_mut() {
            *top = Mode::Interp { brace_depth: depth };
        }
    }

    fn report_unterminated_modes(&mut self) {
        if self
            .mode_stack
            .iter()
            .any(|m| matches!(m, Mode::Tag { .. } | Mode::Text))
        {
            self.emit_error(
                ErrorCode::UNTERMINATED_MARKUP,
                "unterminated markup element",
                self.current_span(),
            );
        } else if self
            .mode_stack
            .iter()
            .any(|m| matches!(m, Mode::Interp { .. }))
        {
            self.emit_error(
                ErrorCode::UNEXPECTED_TOKEN,
                "unterminated '{' interpolation",
                self.current_span(),
            );
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Tag-mode scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token inside `< ... >`. Newlines are plain whitespace here —
    /// tags may span lines freely.
    fn scan_tag(&mut self) -> Token {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.advance();
        }

        if self.at_end() {
            self.report_unterminated_modes();
            return Token::new(TokenKind::Eof, self.current_span());
        }

        let start_line = self.line;
        let start_col = self.col;
        let closing = matches!(self.current_mode(), Mode::Tag { closing: true });
        let ch = self.advance().unwrap();

        match ch {
            b'>' => {
                self.pop_mode();
                if !closing {
                    self.push_mode(Mode::Text);
                }
                Token::new(TokenKind::MarkupEnd, self.span_from(start_line, start_col))
            }
            b'/' if self.peek() == Some(b'>') => {
                self.advance();
                self.pop_mode();
                Token::new(
                    TokenKind::MarkupSelfClose,
                    self.span_from(start_line, start_col),
                )
            }
            b'=' => Token::new(TokenKind::Eq, self.span_from(start_line, start_col)),
            b'"' => self.scan_string(start_line, start_col),
            b'{' => {
                self.push_mode(Mode::Interp { brace_depth: 1 });
                Token::new(TokenKind::LBrace, self.span_from(start_line, start_col))
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(start_line, start_col, true),
            other => {
                self.emit_error(
                    ErrorCode::INVALID_CHARACTER,
                    format!("unexpected character '{}' inside markup tag", other as char),
                    self.span_from(start_line, start_col),
                );
                self.next_or_eof()
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Text-mode scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan a raw text run between tags. Stops at `<` (next element or close
    /// tag) or `{` (interpolation); the delimiter token goes to `pending` so
    /// the text token is emitted first.
    fn scan_text(&mut self) -> Token {
        let start_line = self.line;
        let start_col = self.col;
        let mut raw: Vec<u8> = Vec::new();

        loop {
            match self.peek() {
                None => {
                    self.report_unterminated_modes();
                    if let Some(text) = collapse_text(&raw) {
                        return Token::new(
                            TokenKind::MarkupText(text),
                            self.span_from(start_line, start_col),
                        );
                    }
                    return Token::new(TokenKind::Eof, self.current_span());
                }
                Some(b'<') => {
                    let delim_line = self.line;
                    let delim_col = self.col;
                    let text_span = Span::new(
                        start_line,
                        start_col,
                        delim_line,
                        delim_col.saturating_sub(1).max(1),
                    );
                    if self.peek_at(1) == Some(b'/') {
                        self.pop_mode(); // leave Text — children are done
                        self.advance();
                        self.advance();
                        self.push_mode(Mode::Tag { closing: true });
                        let delim = Token::new(
                            TokenKind::MarkupClose,
                            self.span_from(delim_line, delim_col),
                        );
                        return self.finish_text(raw, text_span, delim);
                    } else if matches!(self.peek_at(1), Some(c) if c.is_ascii_alphabetic()) {
                        self.advance();
                        self.push_mode(Mode::Tag { closing: false });
                        let delim = Token::new(
                            TokenKind::MarkupOpen,
                            self.span_from(delim_line, delim_col),
                        );
                        return self.finish_text(raw, text_span, delim);
                    } else {
                        // Stray '<' in text content
                        raw.push(self.advance().unwrap());
                    }
                }
                Some(b'{') => {
                    let delim_line = self.line;
                    let delim_col = self.col;
                    let text_span = Span::new(
                        start_line,
                        start_col,
                        delim_line,
                        delim_col.saturating_sub(1).max(1),
                    );
                    self.advance();
                    self.push_mode(Mode::Interp { brace_depth: 1 });
                    let delim =
                        Token::new(TokenKind::LBrace, self.span_from(delim_line, delim_col));
                    return self.finish_text(raw, text_span, delim);
                }
                Some(_) => {
                    raw.push(self.advance().unwrap());
                }
            }
        }
    }

    /// Emit the collapsed text run (if non-empty) before the delimiter.
    fn finish_text(&mut self, raw: Vec<u8>, text_span: Span, delim: Token) -> Token {
        match collapse_text(&raw) {
            Some(text) => {
                self.pending.push(delim);
                Token::new(TokenKind::MarkupText(text), text_span)
            }
            None => delim,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Literal scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan a string literal. The opening `"` is already consumed.
    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Token {
        let mut content: Vec<u8> = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "unterminated string literal",
                        self.span_from(start_line, start_col),
                    );
                    break;
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.peek() {
                        Some(b'n') => {
                            self.advance();
                            content.push(b'\n');
                        }
                        Some(b't') => {
                            self.advance();
                            content.push(b'\t');
                        }
                        Some(b'r') => {
                            self.advance();
                            content.push(b'\r');
                        }
                        Some(b'\\') => {
                            self.advance();
                            content.push(b'\\');
                        }
                        Some(b'"') => {
                            self.advance();
                            content.push(b'"');
                        }
                        Some(other) => {
                            let span = self.current_span();
                            self.emit_error(
                                ErrorCode::UNKNOWN_ESCAPE,
                                format!("unknown escape sequence '\\{}'", other as char),
                                span,
                            );
                            self.advance();
                            content.push(other);
                        }
                        None => {}
                    }
                }
                Some(_) => {
                    content.push(self.advance().unwrap());
                }
            }
        }
        Token::new(
            TokenKind::Str(String::from_utf8_lossy(&content).into_owned()),
            self.span_from(start_line, start_col),
        )
    }

    /// Scan a number literal. The first digit is already consumed.
    fn scan_number(&mut self, start_line: u32, start_col: u32) -> Token {
        let lit_start = self.pos - 1;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
        }
        let text = std::str::from_utf8(&self.source[lit_start..self.pos]).unwrap_or("");
        let span = self.span_from(start_line, start_col);
        match text.parse::<f64>() {
            Ok(n) => Token::new(TokenKind::Number(n), span),
            Err(_) => {
                self.emit_error(
                    ErrorCode::INVALID_NUMBER,
                    format!("invalid number literal '{text}'"),
                    span,
                );
                Token::new(TokenKind::Number(0.0), span)
            }
        }
    }

    /// Scan an identifier or keyword. The first character is already
    /// consumed. Inside tags, `-` is a valid name character (`data-id`)
    /// and keywords are not recognised.
    fn scan_identifier(&mut self, start_line: u32, start_col: u32, markup: bool) -> Token {
        let lit_start = self.pos - 1;
        loop {
            match self.peek() {
                Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') => {
                    self.advance();
                }
                Some(b'-') if markup => {
                    self.advance();
                }
                _ => break,
            }
        }
        let word = std::str::from_utf8(&self.source[lit_start..self.pos]).unwrap_or("");
        let span = self.span_from(start_line, start_col);
        if !markup {
            if let Some(kw) = TokenKind::keyword(word) {
                return Token::new(kw, span);
            }
        }
        Token::new(TokenKind::Identifier(word.to_string()), span)
    }
}

/// Collapse a raw text run: whitespace runs become single spaces, leading
/// and trailing whitespace is dropped. Returns `None` for whitespace-only
/// runs (no token emitted).
fn collapse_text(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

