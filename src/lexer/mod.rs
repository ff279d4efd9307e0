//! Lexical analysis for the SQL subset.
//!
//! Scanning is driven by a `logos` automaton over a raw token set; words are
//! then classified into keywords and identifiers. The lexer keeps going after
//! errors so that one pass reports every bad character.

pub mod keywords;
pub mod token;

use crate::diag::Diag;
use logos::Logos;
use smol_str::SmolStr;
use token::{Token, TokenKind};

/// Tokens and diagnostics produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerResult {
    /// Always terminated by an [`TokenKind::Eof`] token.
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diag>,
}

#[derive(Debug, Clone, Default, PartialEq)]
enum LexError {
    #[default]
    InvalidCharacter,
    UnterminatedString,
    UnterminatedIdentifier,
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"--[^\n]*")]
enum RawToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,
    #[token("`", quoted_identifier)]
    QuotedIdent,
    #[token("'", string_literal)]
    String,
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("||")]
    Concat,
    #[token("=")]
    #[token("==")]
    Eq,
    #[token("<>")]
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
}

/// Consumes a string body after the opening quote; `''` is an escaped quote.
fn string_literal(lex: &mut logos::Lexer<'_, RawToken>) -> Result<(), LexError> {
    let rest = lex.remainder().as_bytes();
    let mut i = 0;
    while i < rest.len() {
        if rest[i] == b'\'' {
            if rest.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            lex.bump(i + 1);
            return Ok(());
        }
        i += 1;
    }
    lex.bump(rest.len());
    Err(LexError::UnterminatedString)
}

fn quoted_identifier(lex: &mut logos::Lexer<'_, RawToken>) -> Result<(), LexError> {
    match lex.remainder().find('`') {
        Some(end) => {
            lex.bump(end + 1);
            Ok(())
        }
        None => {
            let len = lex.remainder().len();
            lex.bump(len);
            Err(LexError::UnterminatedIdentifier)
        }
    }
}

/// Tokenizes SQL text.
pub fn tokenize(source: &str) -> LexerResult {
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(raw) = lexer.next() {
        let span = lexer.span();
        let slice = lexer.slice();
        let kind = match raw {
            Ok(raw) => classify(raw, slice),
            Err(err) => {
                diagnostics.push(lex_error_diag(err, slice, span));
                continue;
            }
        };
        tokens.push(Token::new(kind, span));
    }

    let end = source.len();
    tokens.push(Token::new(TokenKind::Eof, end..end));
    LexerResult {
        tokens,
        diagnostics,
    }
}

fn classify(raw: RawToken, slice: &str) -> TokenKind {
    match raw {
        RawToken::Word => match keywords::lookup_keyword(slice) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(SmolStr::new(slice)),
        },
        RawToken::QuotedIdent => TokenKind::QuotedIdent(SmolStr::new(&slice[1..slice.len() - 1])),
        RawToken::String => {
            TokenKind::String(SmolStr::new(slice[1..slice.len() - 1].replace("''", "'")))
        }
        RawToken::Number => TokenKind::Number(SmolStr::new(slice)),
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Semicolon => TokenKind::Semicolon,
        RawToken::Star => TokenKind::Star,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Concat => TokenKind::Concat,
        RawToken::Eq => TokenKind::Eq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::Gt => TokenKind::Gt,
        RawToken::GtEq => TokenKind::GtEq,
    }
}

fn lex_error_diag(err: LexError, slice: &str, span: crate::ast::Span) -> Diag {
    match err {
        LexError::InvalidCharacter => Diag::error(format!("invalid character '{slice}'"))
            .with_primary_label(span, "not valid here")
            .with_code("lex::invalid_character"),
        LexError::UnterminatedString => Diag::error("unterminated string literal")
            .with_primary_label(span, "string starts here")
            .with_help("close the string with a single quote")
            .with_code("lex::unterminated_string"),
        LexError::UnterminatedIdentifier => Diag::error("unterminated quoted identifier")
            .with_primary_label(span, "identifier starts here")
            .with_help("close the identifier with a backtick")
            .with_code("lex::unterminated_identifier"),
    }
}

#[cfg(test)]
mod tests {
    use super::keywords::Keyword;
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn qualified_name_and_keywords() {
        assert_eq!(
            kinds("SELECT * FROM global_temp.v"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Star,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Ident("global_temp".into()),
                TokenKind::Dot,
                TokenKind::Ident("v".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_collapse_doubled_quotes() {
        assert_eq!(
            kinds("'it''s'"),
            vec![TokenKind::String("it's".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn quoted_identifiers_keep_case() {
        assert_eq!(
            kinds("`Sales Q1`"),
            vec![TokenKind::QuotedIdent("Sales Q1".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn comments_and_operators() {
        assert_eq!(
            kinds("a <> b -- trailing\n>= 1.5"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::NotEq,
                TokenKind::Ident("b".into()),
                TokenKind::GtEq,
                TokenKind::Number("1.5".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        let result = tokenize("SELECT 'oops");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].code.as_deref(),
            Some("lex::unterminated_string")
        );
        assert_eq!(result.tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
    }

    #[test]
    fn invalid_characters_do_not_stop_scanning() {
        let result = tokenize("SELECT # a ? b");
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(
            result
                .tokens
                .iter()
                .filter(|t| matches!(t.kind, TokenKind::Ident(_)))
                .count(),
            2
        );
    }

    #[test]
    fn eof_span_is_at_end_of_input() {
        let result = tokenize("USE db ");
        let eof = result.tokens.last().map(|t| t.span.clone());
        assert_eq!(eof, Some(7..7));
    }
}
