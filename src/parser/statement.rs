//! Statement parsing: queries, view/table DDL, `SHOW TABLES`, `USE`.

use super::Parser;
use super::base::ParseResult;
use crate::ast::{
    ColumnDef, CreateTable, CreateView, DropRelation, Ident, ObjectName, RelationKind, Statement,
    ViewKind,
};
use crate::lexer::keywords::Keyword;
use crate::lexer::token::TokenKind;

impl Parser<'_> {
    pub(super) fn parse_statement(&mut self) -> ParseResult<Statement> {
        match &self.stream.current().kind {
            TokenKind::Keyword(Keyword::Select | Keyword::With) | TokenKind::LParen => {
                Ok(Statement::Query(Box::new(self.parse_query()?)))
            }
            TokenKind::Keyword(Keyword::Create) => self.parse_create(),
            TokenKind::Keyword(Keyword::Drop) => self.parse_drop(),
            TokenKind::Keyword(Keyword::Show) => self.parse_show(),
            TokenKind::Keyword(Keyword::Use) => {
                let start = self.stream.current().span.start;
                self.stream.advance();
                let namespace = self.stream.parse_ident()?;
                Ok(Statement::Use {
                    namespace,
                    span: self.stream.span_from(start),
                })
            }
            other => Err(self
                .stream
                .error_here(format!("expected a statement, found {other}"))),
        }
    }

    fn parse_create(&mut self) -> ParseResult<Statement> {
        let start = self.stream.expect_keyword(Keyword::Create)?.start;
        let or_replace = if self.stream.consume_keyword(Keyword::Or) {
            self.stream.expect_keyword(Keyword::Replace)?;
            true
        } else {
            false
        };

        let kind = if self.stream.consume_keyword(Keyword::Global) {
            self.expect_temp()?;
            ViewKind::GlobalTemporary
        } else if self.consume_temp() {
            ViewKind::Temporary
        } else {
            ViewKind::Persistent
        };

        if kind == ViewKind::Persistent && !or_replace && self.stream.check_keyword(Keyword::Table)
        {
            self.stream.advance();
            return self.parse_create_table(start);
        }

        self.stream.expect_keyword(Keyword::View)?;
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;
        let columns = if self.stream.check(&TokenKind::LParen) {
            self.parse_ident_list()?
        } else {
            Vec::new()
        };
        self.stream.expect_keyword(Keyword::As)?;
        let query = self.parse_query()?;

        Ok(Statement::CreateView(Box::new(CreateView {
            kind,
            or_replace,
            if_not_exists,
            name,
            columns,
            query,
            span: self.stream.span_from(start),
        })))
    }

    fn parse_create_table(&mut self, start: usize) -> ParseResult<Statement> {
        let if_not_exists = self.parse_if_not_exists()?;
        let name = self.parse_object_name()?;
        self.stream.expect(TokenKind::LParen)?;
        let mut columns = Vec::new();
        loop {
            let column = self.stream.parse_ident()?;
            let data_type = if self.stream.at_ident() {
                let ty = self.stream.parse_ident()?;
                self.skip_type_parameters()?;
                Some(ty)
            } else {
                None
            };
            columns.push(ColumnDef {
                name: column,
                data_type,
            });
            if !self.stream.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.stream.expect(TokenKind::RParen)?;

        Ok(Statement::CreateTable(CreateTable {
            if_not_exists,
            name,
            columns,
            span: self.stream.span_from(start),
        }))
    }

    /// `DECIMAL(10, 2)` and friends: the parameters carry no meaning here.
    fn skip_type_parameters(&mut self) -> ParseResult<()> {
        if !self.stream.consume(&TokenKind::LParen) {
            return Ok(());
        }
        loop {
            match &self.stream.current().kind {
                TokenKind::Number(_) => self.stream.advance(),
                other => {
                    return Err(self
                        .stream
                        .error_here(format!("expected type parameter, found {other}")));
                }
            }
            if !self.stream.consume(&TokenKind::Comma) {
                break;
            }
        }
        self.stream.expect(TokenKind::RParen)?;
        Ok(())
    }

    fn parse_drop(&mut self) -> ParseResult<Statement> {
        let start = self.stream.expect_keyword(Keyword::Drop)?.start;
        let kind = if self.stream.consume_keyword(Keyword::View) {
            RelationKind::View
        } else if self.stream.consume_keyword(Keyword::Table) {
            RelationKind::Table
        } else {
            return Err(self.stream.error_here("expected VIEW or TABLE after DROP"));
        };
        let if_exists = if self.stream.consume_keyword(Keyword::If) {
            self.stream.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };
        let name = self.parse_object_name()?;
        Ok(Statement::Drop(DropRelation {
            kind,
            if_exists,
            name,
            span: self.stream.span_from(start),
        }))
    }

    fn parse_show(&mut self) -> ParseResult<Statement> {
        let start = self.stream.expect_keyword(Keyword::Show)?.start;
        self.stream.expect_keyword(Keyword::Tables)?;
        let qualified =
            self.stream.consume_keyword(Keyword::In) || self.stream.consume_keyword(Keyword::From);
        let namespace = if qualified {
            Some(self.stream.parse_ident()?)
        } else {
            None
        };
        Ok(Statement::ShowTables {
            namespace,
            span: self.stream.span_from(start),
        })
    }

    fn consume_temp(&mut self) -> bool {
        self.stream.consume_keyword(Keyword::Temp)
            || self.stream.consume_keyword(Keyword::Temporary)
    }

    fn expect_temp(&mut self) -> ParseResult<()> {
        if self.consume_temp() {
            Ok(())
        } else {
            Err(self.stream.error_here("expected TEMP or TEMPORARY after GLOBAL"))
        }
    }

    fn parse_if_not_exists(&mut self) -> ParseResult<bool> {
        if !self.stream.consume_keyword(Keyword::If) {
            return Ok(false);
        }
        self.stream.expect_keyword(Keyword::Not)?;
        self.stream.expect_keyword(Keyword::Exists)?;
        Ok(true)
    }

    /// `name` or `namespace.name`.
    pub(super) fn parse_object_name(&mut self) -> ParseResult<ObjectName> {
        let first = self.stream.parse_ident()?;
        if self.stream.consume(&TokenKind::Dot) {
            let relation = self.stream.parse_ident()?;
            Ok(ObjectName::qualified(first, relation))
        } else {
            Ok(ObjectName::bare(first))
        }
    }

    /// `(a, b, c)`
    pub(super) fn parse_ident_list(&mut self) -> ParseResult<Vec<Ident>> {
        self.stream.expect(TokenKind::LParen)?;
        let mut idents = vec![self.stream.parse_ident()?];
        while self.stream.consume(&TokenKind::Comma) {
            idents.push(self.stream.parse_ident()?);
        }
        self.stream.expect(TokenKind::RParen)?;
        Ok(idents)
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{RelationKind, Statement, ViewKind};
    use crate::parser::parse;

    fn single(source: &str) -> Statement {
        let result = parse(source);
        assert!(!result.has_errors(), "{source}: {:?}", result.diagnostics);
        let mut statements = result.ast.map(|s| s.statements).unwrap_or_default();
        assert_eq!(statements.len(), 1);
        statements.remove(0)
    }

    #[test]
    fn create_global_temp_view() {
        let Statement::CreateView(create) =
            single("CREATE OR REPLACE GLOBAL TEMPORARY VIEW recent (id, ts) AS SELECT a, b FROM t")
        else {
            panic!("expected CREATE VIEW");
        };
        assert_eq!(create.kind, ViewKind::GlobalTemporary);
        assert!(create.or_replace);
        assert_eq!(create.columns.len(), 2);
        assert_eq!(create.name.to_string(), "recent");
    }

    #[test]
    fn create_persistent_view_if_not_exists() {
        let Statement::CreateView(create) =
            single("CREATE VIEW IF NOT EXISTS sales.by_region AS SELECT region FROM orders")
        else {
            panic!("expected CREATE VIEW");
        };
        assert_eq!(create.kind, ViewKind::Persistent);
        assert!(create.if_not_exists);
        assert_eq!(create.name.to_string(), "sales.by_region");
    }

    #[test]
    fn create_table_with_types() {
        let Statement::CreateTable(create) =
            single("CREATE TABLE events (id INT, amount DECIMAL(10, 2), note)")
        else {
            panic!("expected CREATE TABLE");
        };
        let names: Vec<_> = create.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "amount", "note"]);
        assert!(create.columns[2].data_type.is_none());
    }

    #[test]
    fn drop_view_if_exists() {
        let Statement::Drop(drop) = single("DROP VIEW IF EXISTS global_temp.recent") else {
            panic!("expected DROP");
        };
        assert_eq!(drop.kind, RelationKind::View);
        assert!(drop.if_exists);
        assert!(drop.name.is_qualified());
    }

    #[test]
    fn show_tables_in_namespace() {
        let Statement::ShowTables { namespace, .. } = single("SHOW TABLES IN Sales") else {
            panic!("expected SHOW TABLES");
        };
        assert_eq!(namespace.map(|n| n.value), Some("sales".into()));
    }

    #[test]
    fn global_requires_temp() {
        assert!(parse("CREATE GLOBAL VIEW v AS SELECT 1").has_errors());
    }
}
