//! Expression parsing by precedence level.
//!
//! `OR` < `AND` < `NOT` < comparison, `IS`, `IN` < `+ - ||` < `* / %` < unary
//! minus < primary.

use super::Parser;
use super::base::ParseResult;
use crate::ast::{BinaryOperator, Expr, Literal, UnaryOperator};
use crate::lexer::keywords::Keyword;
use crate::lexer::token::TokenKind;

impl Parser<'_> {
    pub(super) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.stream.enter_nested()?;
        let mut left = self.parse_and()?;
        while self.stream.consume_keyword(Keyword::Or) {
            let right = self.parse_and()?;
            left = binary(left, BinaryOperator::Or, right);
        }
        self.stream.leave_nested();
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not()?;
        while self.stream.consume_keyword(Keyword::And) {
            let right = self.parse_not()?;
            left = binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParseResult<Expr> {
        if !self.stream.check_keyword(Keyword::Not) {
            return self.parse_comparison();
        }
        let start = self.stream.current().span.start;
        self.stream.advance();
        if self.stream.check_keyword(Keyword::Exists) {
            return self.parse_exists(start, true);
        }
        self.stream.enter_nested()?;
        let expr = self.parse_not()?;
        self.stream.leave_nested();
        Ok(Expr::Unary {
            op: UnaryOperator::Not,
            expr: Box::new(expr),
            span: self.stream.span_from(start),
        })
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            if self.stream.consume_keyword(Keyword::Is) {
                let negated = self.stream.consume_keyword(Keyword::Not);
                self.stream.expect_keyword(Keyword::Null)?;
                left = Expr::IsNull {
                    expr: Box::new(left),
                    negated,
                };
                continue;
            }

            let negated_in = self.stream.check_keyword(Keyword::Not)
                && self.stream.peek_nth(1).is_keyword(Keyword::In);
            if negated_in || self.stream.check_keyword(Keyword::In) {
                if negated_in {
                    self.stream.advance();
                }
                self.stream.advance();
                left = self.parse_in_rhs(left, negated_in)?;
                continue;
            }

            let op = match &self.stream.current().kind {
                TokenKind::Eq => BinaryOperator::Eq,
                TokenKind::NotEq => BinaryOperator::NotEq,
                TokenKind::Lt => BinaryOperator::Lt,
                TokenKind::LtEq => BinaryOperator::LtEq,
                TokenKind::Gt => BinaryOperator::Gt,
                TokenKind::GtEq => BinaryOperator::GtEq,
                _ => return Ok(left),
            };
            self.stream.advance();
            let right = self.parse_additive()?;
            left = binary(left, op, right);
        }
    }

    /// `(SELECT …)` or `(expr, …)` after `[NOT] IN`.
    fn parse_in_rhs(&mut self, expr: Expr, negated: bool) -> ParseResult<Expr> {
        self.stream.expect(TokenKind::LParen)?;
        let result = if self.at_query_start() {
            Expr::InSubquery {
                expr: Box::new(expr),
                subquery: Box::new(self.parse_query()?),
                negated,
            }
        } else {
            let mut list = vec![self.parse_expr()?];
            while self.stream.consume(&TokenKind::Comma) {
                list.push(self.parse_expr()?);
            }
            Expr::InList {
                expr: Box::new(expr),
                list,
                negated,
            }
        };
        self.stream.expect(TokenKind::RParen)?;
        Ok(result)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match &self.stream.current().kind {
                TokenKind::Plus => BinaryOperator::Plus,
                TokenKind::Minus => BinaryOperator::Minus,
                TokenKind::Concat => BinaryOperator::Concat,
                _ => return Ok(left),
            };
            self.stream.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, op, right);
        }
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match &self.stream.current().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => return Ok(left),
            };
            self.stream.advance();
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if !self.stream.check(&TokenKind::Minus) {
            return self.parse_primary();
        }
        let start = self.stream.current().span.start;
        self.stream.advance();
        self.stream.enter_nested()?;
        let expr = self.parse_unary()?;
        self.stream.leave_nested();
        Ok(Expr::Unary {
            op: UnaryOperator::Minus,
            expr: Box::new(expr),
            span: self.stream.span_from(start),
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.stream.current();
        let literal = match &token.kind {
            TokenKind::Number(n) => Some(Literal::Number(n.clone())),
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            TokenKind::Keyword(Keyword::True) => Some(Literal::Boolean(true)),
            TokenKind::Keyword(Keyword::False) => Some(Literal::Boolean(false)),
            TokenKind::Keyword(Keyword::Null) => Some(Literal::Null),
            _ => None,
        };
        if let Some(literal) = literal {
            self.stream.advance();
            return Ok(Expr::Literal(literal, token.span.clone()));
        }

        match &token.kind {
            TokenKind::Keyword(Keyword::Exists) => self.parse_exists(token.span.start, false),
            TokenKind::LParen => {
                self.stream.advance();
                let expr = if self.at_query_start() {
                    Expr::Subquery(Box::new(self.parse_query()?))
                } else {
                    Expr::Nested(Box::new(self.parse_expr()?))
                };
                self.stream.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ if self.stream.at_ident() => self.parse_column_or_call(),
            other => Err(self
                .stream
                .error_here(format!("expected an expression, found {other}"))),
        }
    }

    /// `EXISTS (query)`; `start` covers a preceding `NOT`.
    fn parse_exists(&mut self, start: usize, negated: bool) -> ParseResult<Expr> {
        self.stream.expect_keyword(Keyword::Exists)?;
        self.stream.expect(TokenKind::LParen)?;
        let subquery = self.parse_query()?;
        self.stream.expect(TokenKind::RParen)?;
        Ok(Expr::Exists {
            subquery: Box::new(subquery),
            negated,
            span: self.stream.span_from(start),
        })
    }

    fn parse_column_or_call(&mut self) -> ParseResult<Expr> {
        let start = self.stream.current().span.start;
        let first = self.stream.parse_ident()?;

        if self.stream.consume(&TokenKind::LParen) {
            if self.stream.consume(&TokenKind::Star) {
                self.stream.expect(TokenKind::RParen)?;
                return Ok(Expr::Function {
                    name: first,
                    distinct: false,
                    args: Vec::new(),
                    star: true,
                    span: self.stream.span_from(start),
                });
            }
            let distinct = self.stream.consume_keyword(Keyword::Distinct);
            let mut args = Vec::new();
            if !self.stream.check(&TokenKind::RParen) {
                args.push(self.parse_expr()?);
                while self.stream.consume(&TokenKind::Comma) {
                    args.push(self.parse_expr()?);
                }
            }
            self.stream.expect(TokenKind::RParen)?;
            return Ok(Expr::Function {
                name: first,
                distinct,
                args,
                star: false,
                span: self.stream.span_from(start),
            });
        }

        if self.stream.consume(&TokenKind::Dot) {
            let name = self.stream.parse_ident()?;
            return Ok(Expr::Column {
                qualifier: Some(first),
                name,
            });
        }

        Ok(Expr::Column {
            qualifier: None,
            name: first,
        })
    }

    fn at_query_start(&self) -> bool {
        self.stream.check_keyword(Keyword::Select) || self.stream.check_keyword(Keyword::With)
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BinaryOperator, Expr, SelectItem, UnaryOperator};
    use crate::parser::parse_query;

    fn expr(text: &str) -> Expr {
        let query = match parse_query(&format!("SELECT {text}")) {
            Ok(query) => query,
            Err(diags) => panic!("{text}: {diags:?}"),
        };
        match query.body.leftmost_select().projection.first() {
            Some(SelectItem::Expr { expr, .. }) => expr.clone(),
            other => panic!("unexpected projection {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let Expr::Binary { op, right, .. } = expr("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOperator::Plus);
        assert!(matches!(
            *right,
            Expr::Binary {
                op: BinaryOperator::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let Expr::Binary { op, .. } = expr("a = 1 OR b = 2 AND c = 3") else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOperator::Or);
    }

    #[test]
    fn not_exists_is_a_negated_exists() {
        assert!(matches!(
            expr("NOT EXISTS (SELECT 1 FROM t)"),
            Expr::Exists { negated: true, .. }
        ));
        assert!(matches!(
            expr("NOT a"),
            Expr::Unary {
                op: UnaryOperator::Not,
                ..
            }
        ));
    }

    #[test]
    fn in_forms() {
        assert!(matches!(
            expr("a NOT IN (SELECT x FROM t)"),
            Expr::InSubquery { negated: true, .. }
        ));
        assert!(matches!(
            expr("a IN (1, 2, 3)"),
            Expr::InList { negated: false, ref list, .. } if list.len() == 3
        ));
        assert!(matches!(
            expr("a IS NOT NULL"),
            Expr::IsNull { negated: true, .. }
        ));
    }

    #[test]
    fn calls_and_qualified_columns() {
        assert!(matches!(expr("count(*)"), Expr::Function { star: true, .. }));
        assert!(matches!(
            expr("sum(DISTINCT o.amount)"),
            Expr::Function { distinct: true, ref args, .. } if args.len() == 1
        ));
        assert!(matches!(
            expr("o.amount"),
            Expr::Column {
                qualifier: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn parenthesized_query_is_a_scalar_subquery() {
        assert!(matches!(expr("(SELECT max(a) FROM t)"), Expr::Subquery(_)));
        assert!(matches!(expr("(1 + 2)"), Expr::Nested(_)));
    }

    #[test]
    fn deep_parentheses_report_instead_of_recursing() {
        let text = format!("SELECT {}1{}", "(".repeat(10_000), ")".repeat(10_000));
        let diags = match parse_query(&text) {
            Ok(_) => panic!("10000 nested parentheses should not parse"),
            Err(diags) => diags,
        };
        assert_eq!(diags[0].code.as_deref(), Some("parse::nesting_too_deep"));
    }

    #[test]
    fn long_prefix_operator_runs_are_capped() {
        let minus = format!("SELECT {}1", "- ".repeat(10_000));
        assert!(parse_query(&minus).is_err());
        let not = format!("SELECT a FROM t WHERE {}TRUE", "NOT ".repeat(10_000));
        assert!(parse_query(&not).is_err());
    }
}
