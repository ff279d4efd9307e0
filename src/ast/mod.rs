//! Syntax tree for the SQL subset handled by the resolver.
//!
//! The tree is produced by [`crate::parser`] or by any other front-end that
//! builds it directly. Spans are byte ranges into the original statement text.

mod display;
mod expr;
mod query;
mod statement;

use smol_str::SmolStr;
use std::ops::Range;

pub use expr::{BinaryOperator, Expr, Literal, UnaryOperator};
pub use query::{
    Cte, Join, JoinKind, OrderByItem, Query, Select, SelectItem, SetExpr, SetOperator,
    TableAlias, TableFactor, TableWithJoins, With,
};
pub use statement::{
    ColumnDef, CreateTable, CreateView, DropRelation, RelationKind, Script, Statement, ViewKind,
};

/// A byte range in source text.
pub type Span = Range<usize>;

/// An identifier as written in the statement.
///
/// Unquoted identifiers are folded to lower case by the parser; quoted ones
/// keep their case and may contain any character but a backtick.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub value: SmolStr,
    pub quoted: bool,
    pub span: Span,
}

impl Ident {
    /// Creates an unquoted identifier with an empty span.
    ///
    /// Handy for building trees by hand; the value is taken as-is.
    pub fn new(value: impl Into<SmolStr>) -> Self {
        Self {
            value: value.into(),
            quoted: false,
            span: 0..0,
        }
    }

    pub fn with_span(value: impl Into<SmolStr>, span: Span) -> Self {
        Self {
            value: value.into(),
            quoted: false,
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// A possibly qualified relation name: `relation` or `namespace.relation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub namespace: Option<Ident>,
    pub relation: Ident,
}

impl ObjectName {
    pub fn bare(relation: Ident) -> Self {
        Self {
            namespace: None,
            relation,
        }
    }

    pub fn qualified(namespace: Ident, relation: Ident) -> Self {
        Self {
            namespace: Some(namespace),
            relation,
        }
    }

    /// Span covering the whole name.
    pub fn span(&self) -> Span {
        match &self.namespace {
            Some(ns) => ns.span.start..self.relation.span.end,
            None => self.relation.span.clone(),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.namespace.is_some()
    }
}

impl From<&str> for ObjectName {
    /// Splits on the first `.`; no quoting rules apply.
    fn from(value: &str) -> Self {
        match value.split_once('.') {
            Some((ns, rel)) => ObjectName::qualified(Ident::new(ns), Ident::new(rel)),
            None => ObjectName::bare(Ident::new(value)),
        }
    }
}
