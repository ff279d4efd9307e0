//! Token stream navigation shared by the statement, query, and expression
//! parsers.

use crate::ast::{Ident, Span};
use crate::config::MAX_NESTING_DEPTH;
use crate::diag::Diag;
use crate::lexer::keywords::Keyword;
use crate::lexer::token::{Token, TokenKind};

/// Parse failures carry a boxed diagnostic to keep `Result` small.
pub type ParseError = Box<Diag>;

pub type ParseResult<T> = Result<T, ParseError>;

/// Cursor over a token slice that always ends with [`TokenKind::Eof`].
pub struct TokenStream<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Recursion depth of the statement being parsed.
    depth: usize,
}

impl<'a> TokenStream<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Enters one level of recursion, failing at [`MAX_NESTING_DEPTH`].
    ///
    /// Callers pair this with [`TokenStream::leave_nested`] on success only:
    /// a failed statement is abandoned and [`TokenStream::reset_depth`] runs
    /// before the next one.
    pub fn enter_nested(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(Box::new(
                Diag::error(format!(
                    "query nests more than {MAX_NESTING_DEPTH} levels deep"
                ))
                .with_primary_label(self.current().span.clone(), "too deeply nested")
                .with_help("split the query into views or common table expressions")
                .with_code("parse::nesting_too_deep"),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn reset_depth(&mut self) {
        self.depth = 0;
    }

    /// Returns the current token; past the end this is the trailing EOF.
    pub fn current(&self) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    /// Returns the token `n` positions ahead of the current one.
    pub fn peek_nth(&self, n: usize) -> &'a TokenKind {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)].kind
    }

    /// Moves to the next token; stays put on EOF.
    pub fn advance(&mut self) {
        if self.pos < self.tokens.len().saturating_sub(1) {
            self.pos += 1;
        }
    }

    pub fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().kind.is_keyword(keyword)
    }

    pub fn at_eof(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    pub fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expects `kind` and returns its span; the position is unchanged on
    /// failure.
    pub fn expect(&mut self, kind: TokenKind) -> ParseResult<Span> {
        if self.check(&kind) {
            let span = self.current().span.clone();
            self.advance();
            Ok(span)
        } else {
            Err(self.error_here(format!("expected {kind}, found {}", self.current().kind)))
        }
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Span> {
        self.expect(TokenKind::Keyword(keyword))
    }

    /// Returns true if the current token can be read as an identifier.
    pub fn at_ident(&self) -> bool {
        match &self.current().kind {
            TokenKind::Ident(_) | TokenKind::QuotedIdent(_) => true,
            TokenKind::Keyword(kw) => !kw.is_reserved(),
            _ => false,
        }
    }

    /// Reads an identifier, folding unquoted text to lower case.
    ///
    /// Non-reserved keywords are accepted so that relations may be named
    /// `views`, `temp`, and so on.
    pub fn parse_ident(&mut self) -> ParseResult<Ident> {
        let token = self.current();
        let ident = match &token.kind {
            TokenKind::Ident(text) => Ident::with_span(text.to_lowercase(), token.span.clone()),
            TokenKind::QuotedIdent(text) => Ident {
                value: text.clone(),
                quoted: true,
                span: token.span.clone(),
            },
            TokenKind::Keyword(kw) if !kw.is_reserved() => {
                Ident::with_span(kw.as_str().to_lowercase(), token.span.clone())
            }
            other => return Err(self.error_here(format!("expected identifier, found {other}"))),
        };
        self.advance();
        Ok(ident)
    }

    pub fn error_here(&self, message: impl Into<String>) -> ParseError {
        Box::new(
            Diag::error(message.into())
                .with_primary_label(self.current().span.clone(), "here")
                .with_code("parse::unexpected_token"),
        )
    }

    /// Span of the most recently consumed token.
    pub fn previous_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span.clone()
        } else {
            self.current().span.clone()
        }
    }

    /// Span from `start` to the end of the most recently consumed token.
    pub fn span_from(&self, start: usize) -> Span {
        start..self.previous_span().end.max(start)
    }

    /// Skips to the next `;` (consumed) or EOF, for statement-level recovery.
    pub fn recover_to_statement_end(&mut self) {
        while !self.at_eof() {
            let is_semicolon = self.check(&TokenKind::Semicolon);
            self.advance();
            if is_semicolon {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn navigation_stops_at_eof() {
        let tokens = tokenize("USE db").tokens;
        let mut stream = TokenStream::new(&tokens);
        assert!(stream.consume_keyword(Keyword::Use));
        assert_eq!(stream.parse_ident().map(|i| i.value), Ok("db".into()));
        assert!(stream.at_eof());
        stream.advance();
        assert!(stream.at_eof());
    }

    #[test]
    fn identifiers_fold_case_unless_quoted() {
        let tokens = tokenize("Sales `Sales`").tokens;
        let mut stream = TokenStream::new(&tokens);
        let folded = stream.parse_ident().map(|i| i.value);
        let quoted = stream.parse_ident().map(|i| (i.value, i.quoted));
        assert_eq!(folded, Ok("sales".into()));
        assert_eq!(quoted, Ok(("Sales".into(), true)));
    }

    #[test]
    fn non_reserved_keywords_are_identifiers() {
        let tokens = tokenize("views FROM").tokens;
        let mut stream = TokenStream::new(&tokens);
        assert!(stream.at_ident());
        assert!(stream.parse_ident().is_ok());
        assert!(!stream.at_ident());
        assert!(stream.parse_ident().is_err());
    }

    #[test]
    fn expect_failure_keeps_position() {
        let tokens = tokenize("SELECT").tokens;
        let mut stream = TokenStream::new(&tokens);
        assert!(stream.expect(TokenKind::LParen).is_err());
        assert!(stream.check_keyword(Keyword::Select));
    }

    #[test]
    fn nesting_is_capped() {
        let tokens = tokenize("(").tokens;
        let mut stream = TokenStream::new(&tokens);
        for _ in 0..MAX_NESTING_DEPTH {
            assert!(stream.enter_nested().is_ok());
        }
        let err = stream.enter_nested().err();
        assert_eq!(
            err.and_then(|d| d.code),
            Some("parse::nesting_too_deep".to_string())
        );

        stream.leave_nested();
        assert!(stream.enter_nested().is_ok());
        stream.reset_depth();
        assert!(stream.enter_nested().is_ok());
    }

    #[test]
    fn recovery_consumes_through_semicolon() {
        let tokens = tokenize("garbage here; USE db").tokens;
        let mut stream = TokenStream::new(&tokens);
        stream.recover_to_statement_end();
        assert!(stream.check_keyword(Keyword::Use));
    }
}
