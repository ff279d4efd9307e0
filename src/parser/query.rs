//! Query parsing: `WITH`, set operations, `SELECT`, and `FROM` clauses.

use super::Parser;
use super::base::ParseResult;
use crate::ast::{
    Cte, Join, JoinKind, OrderByItem, Query, Select, SelectItem, SetExpr, SetOperator, TableAlias,
    TableFactor, TableWithJoins, With,
};
use crate::lexer::keywords::Keyword;
use crate::lexer::token::TokenKind;

impl Parser<'_> {
    pub(super) fn parse_query(&mut self) -> ParseResult<Query> {
        self.stream.enter_nested()?;
        let start = self.stream.current().span.start;
        let with = if self.stream.check_keyword(Keyword::With) {
            Some(self.parse_with()?)
        } else {
            None
        };
        let body = self.parse_set_expr()?;

        let mut order_by = Vec::new();
        if self.stream.consume_keyword(Keyword::Order) {
            self.stream.expect_keyword(Keyword::By)?;
            loop {
                let expr = self.parse_expr()?;
                let asc = if self.stream.consume_keyword(Keyword::Desc) {
                    false
                } else {
                    self.stream.consume_keyword(Keyword::Asc);
                    true
                };
                order_by.push(OrderByItem { expr, asc });
                if !self.stream.consume(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let limit = if self.stream.consume_keyword(Keyword::Limit) {
            let token = self.stream.current();
            let value = match &token.kind {
                TokenKind::Number(n) => n.parse::<u64>().ok(),
                _ => None,
            };
            match value {
                Some(value) => {
                    self.stream.advance();
                    Some(value)
                }
                None => return Err(self.stream.error_here("LIMIT expects a whole number")),
            }
        } else {
            None
        };

        self.stream.leave_nested();
        Ok(Query {
            with,
            body,
            order_by,
            limit,
            span: self.stream.span_from(start),
        })
    }

    fn parse_with(&mut self) -> ParseResult<With> {
        let start = self.stream.expect_keyword(Keyword::With)?.start;
        let mut ctes = Vec::new();
        loop {
            let cte_start = self.stream.current().span.start;
            let name = self.stream.parse_ident()?;
            let columns = if self.stream.check(&TokenKind::LParen) {
                self.parse_ident_list()?
            } else {
                Vec::new()
            };
            self.stream.expect_keyword(Keyword::As)?;
            self.stream.expect(TokenKind::LParen)?;
            let query = self.parse_query()?;
            self.stream.expect(TokenKind::RParen)?;
            ctes.push(Cte {
                name,
                columns,
                query: Box::new(query),
                span: self.stream.span_from(cte_start),
            });
            if !self.stream.consume(&TokenKind::Comma) {
                break;
            }
        }
        Ok(With {
            ctes,
            span: self.stream.span_from(start),
        })
    }

    fn parse_set_expr(&mut self) -> ParseResult<SetExpr> {
        let mut left = self.parse_set_operand()?;
        loop {
            let op = match &self.stream.current().kind {
                TokenKind::Keyword(Keyword::Union) => SetOperator::Union,
                TokenKind::Keyword(Keyword::Except) => SetOperator::Except,
                TokenKind::Keyword(Keyword::Intersect) => SetOperator::Intersect,
                _ => break,
            };
            self.stream.advance();
            let all = if self.stream.consume_keyword(Keyword::All) {
                true
            } else {
                self.stream.consume_keyword(Keyword::Distinct);
                false
            };
            let right = self.parse_set_operand()?;
            left = SetExpr::SetOperation {
                op,
                all,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_set_operand(&mut self) -> ParseResult<SetExpr> {
        if self.stream.consume(&TokenKind::LParen) {
            let query = self.parse_query()?;
            self.stream.expect(TokenKind::RParen)?;
            Ok(SetExpr::Query(Box::new(query)))
        } else if self.stream.check_keyword(Keyword::Select) {
            Ok(SetExpr::Select(Box::new(self.parse_select()?)))
        } else {
            let found = &self.stream.current().kind;
            Err(self
                .stream
                .error_here(format!("expected SELECT or '(', found {found}")))
        }
    }

    fn parse_select(&mut self) -> ParseResult<Select> {
        let start = self.stream.expect_keyword(Keyword::Select)?.start;
        let distinct = if self.stream.consume_keyword(Keyword::Distinct) {
            true
        } else {
            self.stream.consume_keyword(Keyword::All);
            false
        };

        let mut projection = vec![self.parse_select_item()?];
        while self.stream.consume(&TokenKind::Comma) {
            projection.push(self.parse_select_item()?);
        }

        let mut from = Vec::new();
        if self.stream.consume_keyword(Keyword::From) {
            from.push(self.parse_table_with_joins()?);
            while self.stream.consume(&TokenKind::Comma) {
                from.push(self.parse_table_with_joins()?);
            }
        }

        let selection = if self.stream.consume_keyword(Keyword::Where) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.stream.consume_keyword(Keyword::Group) {
            self.stream.expect_keyword(Keyword::By)?;
            group_by.push(self.parse_expr()?);
            while self.stream.consume(&TokenKind::Comma) {
                group_by.push(self.parse_expr()?);
            }
        }

        let having = if self.stream.consume_keyword(Keyword::Having) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(Select {
            distinct,
            projection,
            from,
            selection,
            group_by,
            having,
            span: self.stream.span_from(start),
        })
    }

    fn parse_select_item(&mut self) -> ParseResult<SelectItem> {
        if self.stream.check(&TokenKind::Star) {
            let span = self.stream.current().span.clone();
            self.stream.advance();
            return Ok(SelectItem::Wildcard(span));
        }
        if self.stream.at_ident()
            && self.stream.peek_nth(1) == &TokenKind::Dot
            && self.stream.peek_nth(2) == &TokenKind::Star
        {
            let qualifier = self.stream.parse_ident()?;
            self.stream.advance();
            self.stream.advance();
            return Ok(SelectItem::QualifiedWildcard(qualifier));
        }

        let expr = self.parse_expr()?;
        let alias = if self.stream.consume_keyword(Keyword::As) {
            Some(self.stream.parse_ident()?)
        } else if self.at_implicit_alias() {
            Some(self.stream.parse_ident()?)
        } else {
            None
        };
        Ok(SelectItem::Expr { expr, alias })
    }

    /// Aliases without `AS` must be plain identifiers, never keywords.
    fn at_implicit_alias(&self) -> bool {
        matches!(
            self.stream.current().kind,
            TokenKind::Ident(_) | TokenKind::QuotedIdent(_)
        )
    }

    fn parse_table_with_joins(&mut self) -> ParseResult<TableWithJoins> {
        let relation = self.parse_table_factor()?;
        let mut joins = Vec::new();
        while let Some(kind) = self.parse_join_kind()? {
            let relation = self.parse_table_factor()?;
            let constraint = if self.stream.consume_keyword(Keyword::On) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            joins.push(Join {
                relation,
                kind,
                constraint,
            });
        }
        Ok(TableWithJoins { relation, joins })
    }

    /// Consumes a join introducer up to and including `JOIN`.
    fn parse_join_kind(&mut self) -> ParseResult<Option<JoinKind>> {
        let kind = match &self.stream.current().kind {
            TokenKind::Keyword(Keyword::Join) => {
                self.stream.advance();
                return Ok(Some(JoinKind::Inner));
            }
            TokenKind::Keyword(Keyword::Inner) => JoinKind::Inner,
            TokenKind::Keyword(Keyword::Cross) => JoinKind::Cross,
            TokenKind::Keyword(Keyword::Left) => JoinKind::LeftOuter,
            TokenKind::Keyword(Keyword::Right) => JoinKind::RightOuter,
            TokenKind::Keyword(Keyword::Full) => JoinKind::FullOuter,
            _ => return Ok(None),
        };
        self.stream.advance();
        if matches!(
            kind,
            JoinKind::LeftOuter | JoinKind::RightOuter | JoinKind::FullOuter
        ) {
            self.stream.consume_keyword(Keyword::Outer);
        }
        self.stream.expect_keyword(Keyword::Join)?;
        Ok(Some(kind))
    }

    fn parse_table_factor(&mut self) -> ParseResult<TableFactor> {
        if self.stream.consume(&TokenKind::LParen) {
            let subquery = self.parse_query()?;
            self.stream.expect(TokenKind::RParen)?;
            let alias = self.parse_table_alias()?;
            return Ok(TableFactor::Derived {
                subquery: Box::new(subquery),
                alias,
            });
        }
        let name = self.parse_object_name()?;
        let alias = self.parse_table_alias()?;
        Ok(TableFactor::Table { name, alias })
    }

    fn parse_table_alias(&mut self) -> ParseResult<Option<TableAlias>> {
        let name = if self.stream.consume_keyword(Keyword::As) {
            self.stream.parse_ident()?
        } else if self.at_implicit_alias() {
            self.stream.parse_ident()?
        } else {
            return Ok(None);
        };
        let columns = if self.stream.check(&TokenKind::LParen) {
            self.parse_ident_list()?
        } else {
            Vec::new()
        };
        Ok(Some(TableAlias { name, columns }))
    }
}
