//! Query AST nodes: `WITH` clauses, set operations, `SELECT` blocks and the
//! relations they read from.

use super::{Expr, Ident, ObjectName, Span};

/// A complete query expression, optionally preceded by a `WITH` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub with: Option<With>,
    pub body: SetExpr,
    pub order_by: Vec<OrderByItem>,
    pub limit: Option<u64>,
    pub span: Span,
}

/// `WITH c1 AS (…), c2 (x, y) AS (…)`.
#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub ctes: Vec<Cte>,
    pub span: Span,
}

/// One named subquery in a `WITH` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: Ident,
    /// Explicit output column names; empty when none were declared.
    pub columns: Vec<Ident>,
    pub query: Box<Query>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    Select(Box<Select>),
    /// Parenthesized query used as a set operand.
    Query(Box<Query>),
    SetOperation {
        op: SetOperator,
        all: bool,
        left: Box<SetExpr>,
        right: Box<SetExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Except,
    Intersect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    Wildcard(Span),
    /// `rel.*`
    QualifiedWildcard(Ident),
    Expr { expr: Expr, alias: Option<Ident> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableWithJoins {
    pub relation: TableFactor,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub relation: TableFactor,
    pub kind: JoinKind,
    pub constraint: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

/// A relation in a `FROM` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    /// A named relation: a CTE, a catalog view, or a catalog table.
    Table {
        name: ObjectName,
        alias: Option<TableAlias>,
    },
    /// `(subquery) [AS] alias`.
    Derived {
        subquery: Box<Query>,
        alias: Option<TableAlias>,
    },
}

/// `AS name (c1, c2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableAlias {
    pub name: Ident,
    pub columns: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: Expr,
    pub asc: bool,
}

impl Query {
    /// Wraps a set expression into a query with no modifiers.
    pub fn from_body(body: SetExpr, span: Span) -> Self {
        Self {
            with: None,
            body,
            order_by: Vec::new(),
            limit: None,
            span,
        }
    }

    /// `SELECT * FROM <factor>`.
    pub fn select_star_from(factor: TableFactor, span: Span) -> Self {
        let select = Select {
            distinct: false,
            projection: vec![SelectItem::Wildcard(span.clone())],
            from: vec![TableWithJoins {
                relation: factor,
                joins: Vec::new(),
            }],
            selection: None,
            group_by: Vec::new(),
            having: None,
            span: span.clone(),
        };
        Self::from_body(SetExpr::Select(Box::new(select)), span)
    }

    /// Returns true if a `WITH` clause appears anywhere in this query,
    /// including nested subqueries.
    pub fn contains_cte(&self) -> bool {
        self.with.is_some()
            || self.body.contains_cte()
            || self.order_by.iter().any(|item| item.expr.contains_cte())
    }

    /// Number of output columns when it is known without catalog access.
    ///
    /// Returns `None` when the leftmost `SELECT` projects a wildcard.
    pub fn static_arity(&self) -> Option<usize> {
        let select = self.body.leftmost_select();
        if select
            .projection
            .iter()
            .any(|item| !matches!(item, SelectItem::Expr { .. }))
        {
            return None;
        }
        Some(select.projection.len())
    }

    /// Renames the output columns positionally by rewriting the projection
    /// aliases of the leftmost `SELECT`.
    ///
    /// Callers check [`Query::static_arity`] first; wildcard items are left
    /// untouched.
    pub fn rename_outputs(&mut self, names: &[Ident]) {
        let select = self.body.leftmost_select_mut();
        for (item, name) in select.projection.iter_mut().zip(names) {
            if let SelectItem::Expr { alias, .. } = item {
                *alias = Some(name.clone());
            }
        }
    }
}

impl SetExpr {
    /// The `SELECT` block that determines output column names.
    pub fn leftmost_select(&self) -> &Select {
        match self {
            SetExpr::Select(select) => select,
            SetExpr::Query(query) => query.body.leftmost_select(),
            SetExpr::SetOperation { left, .. } => left.leftmost_select(),
        }
    }

    fn leftmost_select_mut(&mut self) -> &mut Select {
        match self {
            SetExpr::Select(select) => select,
            SetExpr::Query(query) => query.body.leftmost_select_mut(),
            SetExpr::SetOperation { left, .. } => left.leftmost_select_mut(),
        }
    }

    fn contains_cte(&self) -> bool {
        match self {
            SetExpr::Select(select) => select.contains_cte(),
            SetExpr::Query(query) => query.contains_cte(),
            SetExpr::SetOperation { left, right, .. } => {
                left.contains_cte() || right.contains_cte()
            }
        }
    }
}

impl Select {
    fn contains_cte(&self) -> bool {
        let in_projection = self.projection.iter().any(|item| match item {
            SelectItem::Expr { expr, .. } => expr.contains_cte(),
            _ => false,
        });
        let in_from = self.from.iter().any(|twj| {
            twj.relation.contains_cte()
                || twj.joins.iter().any(|join| {
                    join.relation.contains_cte()
                        || join.constraint.as_ref().is_some_and(Expr::contains_cte)
                })
        });
        in_projection
            || in_from
            || self.selection.as_ref().is_some_and(Expr::contains_cte)
            || self.group_by.iter().any(Expr::contains_cte)
            || self.having.as_ref().is_some_and(Expr::contains_cte)
    }
}

impl TableFactor {
    fn contains_cte(&self) -> bool {
        match self {
            TableFactor::Table { .. } => false,
            TableFactor::Derived { subquery, .. } => subquery.contains_cte(),
        }
    }
}

impl Expr {
    fn contains_cte(&self) -> bool {
        match self {
            Expr::Column { .. } | Expr::Literal(..) => false,
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::Nested(expr) => {
                expr.contains_cte()
            }
            Expr::Binary { left, right, .. } => left.contains_cte() || right.contains_cte(),
            Expr::Function { args, .. } => args.iter().any(Expr::contains_cte),
            Expr::InList { expr, list, .. } => {
                expr.contains_cte() || list.iter().any(Expr::contains_cte)
            }
            Expr::InSubquery { expr, subquery, .. } => {
                expr.contains_cte() || subquery.contains_cte()
            }
            Expr::Exists { subquery, .. } | Expr::Subquery(subquery) => subquery.contains_cte(),
        }
    }
}
