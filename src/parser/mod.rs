//! Recursive-descent parser for the SQL subset.
//!
//! The parser is a front-end convenience: the resolution core only consumes
//! the AST in [`crate::ast`], however it was produced. Errors recover at
//! statement boundaries so one call reports problems in every statement.

mod base;
mod expr;
mod query;
mod statement;

use crate::ast::{Query, Script, Statement};
use crate::diag::{Diag, SourceFile, convert_diagnostics_to_reports};
use crate::lexer::token::{Token, TokenKind};
use crate::lexer::tokenize;
use base::TokenStream;
use miette::Report;

pub use base::{ParseError, ParseResult as PResult};

/// Result of parsing a script.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed statements, or `None` if nothing could be recovered.
    pub ast: Option<Script>,
    /// Lexer and parser diagnostics in source order.
    pub diagnostics: Vec<Diag>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diag::is_error)
    }

    /// Renders the diagnostics against the parsed text.
    pub fn reports(&self, source: &SourceFile) -> Vec<Report> {
        convert_diagnostics_to_reports(&self.diagnostics, source)
    }
}

/// Statement parser over a token slice.
pub struct Parser<'t> {
    stream: TokenStream<'t>,
    diagnostics: Vec<Diag>,
}

impl<'t> Parser<'t> {
    /// The slice must end with an EOF token, as [`tokenize`] produces.
    pub fn new(tokens: &'t [Token]) -> Self {
        Self {
            stream: TokenStream::new(tokens),
            diagnostics: Vec::new(),
        }
    }

    /// Parses `;`-separated statements until EOF.
    pub fn parse_script(mut self) -> (Script, Vec<Diag>) {
        let mut script = Script::default();
        loop {
            while self.stream.consume(&TokenKind::Semicolon) {}
            if self.stream.at_eof() {
                break;
            }
            self.stream.reset_depth();
            match self.parse_statement() {
                Ok(statement) => {
                    script.statements.push(statement);
                    if !self.stream.at_eof() && !self.stream.check(&TokenKind::Semicolon) {
                        let current = self.stream.current();
                        self.diagnostics.push(
                            Diag::error(format!(
                                "expected ';' or end of input, found {}",
                                current.kind
                            ))
                            .with_primary_label(current.span.clone(), "statement should end here")
                            .with_code("parse::unexpected_token"),
                        );
                        self.stream.recover_to_statement_end();
                    }
                }
                Err(diag) => {
                    self.diagnostics.push(*diag);
                    self.stream.recover_to_statement_end();
                }
            }
        }
        (script, self.diagnostics)
    }
}

/// Tokenizes and parses SQL text.
pub fn parse(source: &str) -> ParseResult {
    let lexed = tokenize(source);
    let (script, parse_diags) = Parser::new(&lexed.tokens).parse_script();

    let mut diagnostics = lexed.diagnostics;
    diagnostics.extend(parse_diags);
    diagnostics.sort_by_key(|d| d.labels.first().map(|l| l.span.start).unwrap_or(0));

    let has_error = diagnostics.iter().any(Diag::is_error);
    let ast = if has_error && script.statements.is_empty() {
        None
    } else {
        Some(script)
    };
    ParseResult { ast, diagnostics }
}

/// Parses text that must hold exactly one query.
pub fn parse_query(source: &str) -> Result<Query, Vec<Diag>> {
    let result = parse(source);
    if result.has_errors() {
        return Err(result.diagnostics);
    }
    let mut statements = result.ast.map(|s| s.statements).unwrap_or_default();
    match (statements.pop(), statements.is_empty()) {
        (Some(Statement::Query(query)), true) => Ok(*query),
        _ => Err(vec![
            Diag::error("expected a single query")
                .with_primary_label(0..source.len(), "in this text")
                .with_code("parse::expected_query"),
        ]),
    }
}
