//! Scalar expressions.

use super::{Ident, Query, Span};
use smol_str::SmolStr;

/// A scalar expression.
///
/// Subquery positions (`(SELECT …)`, `EXISTS`, `IN (SELECT …)`) hold full
/// [`Query`] values and may declare their own `WITH` clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `col` or `rel.col`.
    Column {
        qualifier: Option<Ident>,
        name: Ident,
    },
    Literal(Literal, Span),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    /// `f(args)`, `f(DISTINCT args)`, `count(*)`.
    Function {
        name: Ident,
        distinct: bool,
        args: Vec<Expr>,
        /// `count(*)` style call; `args` is empty.
        star: bool,
        span: Span,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<Query>,
        negated: bool,
    },
    Exists {
        subquery: Box<Query>,
        negated: bool,
        span: Span,
    },
    /// Scalar subquery.
    Subquery(Box<Query>),
    Nested(Box<Expr>),
}

impl Expr {
    pub fn column(name: &str) -> Self {
        Expr::Column {
            qualifier: None,
            name: Ident::new(name),
        }
    }

    pub fn number(value: &str) -> Self {
        Expr::Literal(Literal::Number(value.into()), 0..0)
    }

    /// Best-effort span of the expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Column { qualifier, name } => match qualifier {
                Some(q) => q.span.start..name.span.end,
                None => name.span.clone(),
            },
            Expr::Literal(_, span)
            | Expr::Unary { span, .. }
            | Expr::Function { span, .. }
            | Expr::Exists { span, .. } => span.clone(),
            Expr::Binary { left, right, .. } => left.span().start..right.span().end,
            Expr::IsNull { expr, .. }
            | Expr::InList { expr, .. }
            | Expr::InSubquery { expr, .. } => expr.span(),
            Expr::Subquery(query) => query.span.clone(),
            Expr::Nested(inner) => inner.span(),
        }
    }

    /// Name the expression gets in a projection without an alias.
    pub fn output_name(&self) -> SmolStr {
        match self {
            Expr::Column { name, .. } => name.value.clone(),
            Expr::Nested(inner) => inner.output_name(),
            other => SmolStr::new(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Kept as written; no numeric interpretation happens here.
    Number(SmolStr),
    String(SmolStr),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

impl BinaryOperator {
    /// Binding power used by the parser and the printer.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq => 4,
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Concat => 5,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Or => "OR",
            BinaryOperator::And => "AND",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Concat => "||",
        }
    }
}
