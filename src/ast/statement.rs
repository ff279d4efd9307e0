//! Statement-level AST nodes: the DDL surface for views and tables plus
//! `SHOW TABLES` and `USE`.

use super::{Ident, ObjectName, Query, Span};

/// A sequence of statements separated by `;`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(Box<Query>),
    CreateView(Box<CreateView>),
    CreateTable(CreateTable),
    Drop(DropRelation),
    /// `SHOW TABLES [IN ns]`
    ShowTables {
        namespace: Option<Ident>,
        span: Span,
    },
    /// `USE ns`
    Use {
        namespace: Ident,
        span: Span,
    },
}

/// Which catalog scope a `CREATE VIEW` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// `CREATE VIEW`
    Persistent,
    /// `CREATE TEMP VIEW`
    Temporary,
    /// `CREATE GLOBAL TEMP VIEW`
    GlobalTemporary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateView {
    pub kind: ViewKind,
    pub or_replace: bool,
    pub if_not_exists: bool,
    pub name: ObjectName,
    pub columns: Vec<Ident>,
    pub query: Query,
    pub span: Span,
}

/// `CREATE TABLE name (col type, …)`.
///
/// Only the column names matter to resolution; the type text is kept for
/// display.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub if_not_exists: bool,
    pub name: ObjectName,
    pub columns: Vec<ColumnDef>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: Ident,
    pub data_type: Option<Ident>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    View,
    Table,
}

/// `DROP VIEW|TABLE [IF EXISTS] name`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropRelation {
    pub kind: RelationKind,
    pub if_exists: bool,
    pub name: ObjectName,
    pub span: Span,
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Query(query) => query.span.clone(),
            Statement::CreateView(create) => create.span.clone(),
            Statement::CreateTable(create) => create.span.clone(),
            Statement::Drop(drop) => drop.span.clone(),
            Statement::ShowTables { span, .. } | Statement::Use { span, .. } => span.clone(),
        }
    }
}
