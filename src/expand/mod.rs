//! Common table expression inlining.
//!
//! [`CteExpander::expand`] rewrites a query so that no `WITH` clause and no
//! reference to a CTE remains: each reference becomes a derived table holding
//! the CTE's defining query. Names that match no visible CTE are left for the
//! catalog.
//!
//! Scoping rules:
//! - a `WITH` list's queries are expanded against the enclosing scopes only,
//!   so a CTE does not see its siblings or itself;
//! - the list then becomes the innermost scope for the query body;
//! - inner scopes shadow outer scopes and catalog relations.

mod scope;

use crate::ast::{
    Expr, Ident, Join, OrderByItem, Query, Select, SelectItem, SetExpr, Span, TableAlias,
    TableFactor, TableWithJoins, With,
};
use crate::catalog::Name;
use crate::config::MAX_RESOLVE_DEPTH;
use crate::error::{ResolveError, ResolveResult};
use scope::{CteBinding, CteScopes};
use smol_str::SmolStr;
use tracing::trace;

/// Expands `query` with a fresh [`CteExpander`].
pub fn expand(query: &Query) -> ResolveResult<Query> {
    CteExpander::new().expand(query)
}

#[derive(Debug, Default)]
pub struct CteExpander {
    scopes: CteScopes,
    /// CTEs whose definitions are being expanded, with the scope depth at
    /// which each definition started.
    active: Vec<ActiveCte>,
    /// Nesting of the node being expanded.
    depth: usize,
}

#[derive(Debug)]
struct ActiveCte {
    name: SmolStr,
    scope_depth: usize,
    declared_at: Span,
}

impl CteExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `query` with every CTE inlined.
    ///
    /// Expanding an already expanded query returns it unchanged.
    pub fn expand(&mut self, query: &Query) -> ResolveResult<Query> {
        self.scopes.reset();
        self.active.clear();
        self.depth = 0;
        self.expand_query(query)
            .map_err(|err| err.with_span(query.span.clone()))
    }

    /// Runs `f` one level deeper, failing past [`MAX_RESOLVE_DEPTH`].
    fn nested<T>(
        &mut self,
        span: Option<&Span>,
        f: impl FnOnce(&mut Self) -> ResolveResult<T>,
    ) -> ResolveResult<T> {
        if self.depth >= MAX_RESOLVE_DEPTH {
            return Err(ResolveError::NestingTooDeep {
                limit: MAX_RESOLVE_DEPTH,
                span: span.cloned(),
            });
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn expand_query(&mut self, query: &Query) -> ResolveResult<Query> {
        self.nested(Some(&query.span), |this| this.expand_scoped(query))
    }

    fn expand_scoped(&mut self, query: &Query) -> ResolveResult<Query> {
        let Some(with) = &query.with else {
            return self.expand_unscoped(query);
        };
        let bindings = self.expand_with(with)?;
        self.scopes.push(bindings);
        let expanded = self.expand_unscoped(query);
        self.scopes.pop();
        expanded
    }

    /// Expands everything but the `WITH` clause, which is dropped.
    fn expand_unscoped(&mut self, query: &Query) -> ResolveResult<Query> {
        let body = self.expand_set_expr(&query.body)?;
        let order_by = query
            .order_by
            .iter()
            .map(|item| {
                Ok(OrderByItem {
                    expr: self.expand_expr(&item.expr)?,
                    asc: item.asc,
                })
            })
            .collect::<ResolveResult<_>>()?;
        Ok(Query {
            with: None,
            body,
            order_by,
            limit: query.limit,
            span: query.span.clone(),
        })
    }

    fn expand_with(&mut self, with: &With) -> ResolveResult<Vec<CteBinding>> {
        let mut bindings: Vec<CteBinding> = Vec::with_capacity(with.ctes.len());
        for cte in &with.ctes {
            if let Some(first) = bindings.iter().find(|b| b.name == cte.name.value) {
                return Err(ResolveError::DuplicateCte {
                    name: Name::bare(cte.name.value.clone()),
                    span: Some(cte.name.span.clone()),
                    declared_at: Some(first.declared_at.clone()),
                });
            }

            self.active.push(ActiveCte {
                name: cte.name.value.clone(),
                scope_depth: self.scopes.depth(),
                declared_at: cte.span.clone(),
            });
            let body = self.expand_query(&cte.query);
            self.active.pop();
            let mut body = body?;

            let mut carried_columns = Vec::new();
            if !cte.columns.is_empty() {
                match body.static_arity() {
                    Some(found) if found != cte.columns.len() => {
                        return Err(ResolveError::ColumnArityMismatch {
                            name: Name::bare(cte.name.value.clone()),
                            expected: cte.columns.len(),
                            found,
                            span: Some(cte.span.clone()),
                        });
                    }
                    Some(_) => body.rename_outputs(&cte.columns),
                    None => carried_columns = cte.columns.clone(),
                }
            }

            bindings.push(CteBinding {
                name: cte.name.value.clone(),
                body,
                carried_columns,
                declared_at: cte.span.clone(),
            });
        }
        Ok(bindings)
    }

    fn expand_set_expr(&mut self, body: &SetExpr) -> ResolveResult<SetExpr> {
        Ok(match body {
            SetExpr::Select(select) => SetExpr::Select(Box::new(self.expand_select(select)?)),
            SetExpr::Query(query) => SetExpr::Query(Box::new(self.expand_query(query)?)),
            SetExpr::SetOperation {
                op,
                all,
                left,
                right,
            } => self.nested(None, |this| {
                Ok(SetExpr::SetOperation {
                    op: *op,
                    all: *all,
                    left: Box::new(this.expand_set_expr(left)?),
                    right: Box::new(this.expand_set_expr(right)?),
                })
            })?,
        })
    }

    fn expand_select(&mut self, select: &Select) -> ResolveResult<Select> {
        let projection = select
            .projection
            .iter()
            .map(|item| {
                Ok(match item {
                    SelectItem::Expr { expr, alias } => SelectItem::Expr {
                        expr: self.expand_expr(expr)?,
                        alias: alias.clone(),
                    },
                    other => other.clone(),
                })
            })
            .collect::<ResolveResult<_>>()?;

        let from = select
            .from
            .iter()
            .map(|twj| {
                let relation = self.expand_table_factor(&twj.relation)?;
                let joins = twj
                    .joins
                    .iter()
                    .map(|join| {
                        Ok(Join {
                            relation: self.expand_table_factor(&join.relation)?,
                            kind: join.kind,
                            constraint: self.expand_opt_expr(join.constraint.as_ref())?,
                        })
                    })
                    .collect::<ResolveResult<_>>()?;
                Ok(TableWithJoins { relation, joins })
            })
            .collect::<ResolveResult<_>>()?;

        Ok(Select {
            distinct: select.distinct,
            projection,
            from,
            selection: self.expand_opt_expr(select.selection.as_ref())?,
            group_by: self.expand_exprs(&select.group_by)?,
            having: self.expand_opt_expr(select.having.as_ref())?,
            span: select.span.clone(),
        })
    }

    fn expand_table_factor(&mut self, factor: &TableFactor) -> ResolveResult<TableFactor> {
        match factor {
            TableFactor::Table { name, alias } if name.namespace.is_none() => {
                match self.inline_reference(&name.relation, alias.as_ref())? {
                    Some(inlined) => Ok(inlined),
                    None => Ok(factor.clone()),
                }
            }
            TableFactor::Table { .. } => Ok(factor.clone()),
            TableFactor::Derived { subquery, alias } => Ok(TableFactor::Derived {
                subquery: Box::new(self.expand_query(subquery)?),
                alias: alias.clone(),
            }),
        }
    }

    /// Replaces a reference to a visible CTE with a derived table.
    ///
    /// Returns `None` when `name` is not a CTE in scope.
    fn inline_reference(
        &self,
        name: &Ident,
        alias: Option<&TableAlias>,
    ) -> ResolveResult<Option<TableFactor>> {
        let visible = self.scopes.lookup(&name.value);

        // A reference to a CTE under definition is recursion unless a CTE
        // declared inside that definition shadows it.
        let in_progress = self.active.iter().rev().find(|cte| cte.name == name.value);
        if let Some(cte) = in_progress {
            if !visible.is_some_and(|(_, level)| level > cte.scope_depth) {
                return Err(ResolveError::UnsupportedRecursion {
                    name: Name::bare(name.value.clone()),
                    depth: cte.scope_depth,
                    span: Some(name.span.clone()),
                    declared_at: Some(cte.declared_at.clone()),
                });
            }
        }

        let Some((binding, level)) = visible else {
            return Ok(None);
        };
        trace!(
            cte = %binding.name,
            level,
            declared_at = ?binding.declared_at,
            "inlining common table expression"
        );

        let subquery = Box::new(binding.body.clone());
        let own_alias = |columns| TableAlias {
            name: name.clone(),
            columns,
        };
        let factor = if binding.carried_columns.is_empty() {
            TableFactor::Derived {
                subquery,
                alias: Some(alias.cloned().unwrap_or_else(|| own_alias(Vec::new()))),
            }
        } else {
            let carried = binding.carried_columns.clone();
            match alias {
                // Both the CTE and the reference rename columns: apply the
                // CTE's names first, then the reference's.
                Some(outer) if !outer.columns.is_empty() => {
                    let inner = TableFactor::Derived {
                        subquery,
                        alias: Some(own_alias(carried)),
                    };
                    TableFactor::Derived {
                        subquery: Box::new(Query::select_star_from(inner, name.span.clone())),
                        alias: Some(outer.clone()),
                    }
                }
                Some(outer) => TableFactor::Derived {
                    subquery,
                    alias: Some(TableAlias {
                        name: outer.name.clone(),
                        columns: carried,
                    }),
                },
                None => TableFactor::Derived {
                    subquery,
                    alias: Some(own_alias(carried)),
                },
            }
        };
        Ok(Some(factor))
    }

    fn expand_exprs(&mut self, exprs: &[Expr]) -> ResolveResult<Vec<Expr>> {
        exprs.iter().map(|e| self.expand_expr(e)).collect()
    }

    fn expand_opt_expr(&mut self, expr: Option<&Expr>) -> ResolveResult<Option<Expr>> {
        expr.map(|e| self.expand_expr(e)).transpose()
    }

    fn expand_expr(&mut self, expr: &Expr) -> ResolveResult<Expr> {
        self.nested(None, |this| this.expand_expr_node(expr))
    }

    fn expand_expr_node(&mut self, expr: &Expr) -> ResolveResult<Expr> {
        Ok(match expr {
            Expr::Column { .. } | Expr::Literal(..) => expr.clone(),
            Expr::Unary { op, expr, span } => Expr::Unary {
                op: *op,
                expr: Box::new(self.expand_expr(expr)?),
                span: span.clone(),
            },
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(self.expand_expr(left)?),
                op: *op,
                right: Box::new(self.expand_expr(right)?),
            },
            Expr::Function {
                name,
                distinct,
                args,
                star,
                span,
            } => Expr::Function {
                name: name.clone(),
                distinct: *distinct,
                args: self.expand_exprs(args)?,
                star: *star,
                span: span.clone(),
            },
            Expr::IsNull { expr, negated } => Expr::IsNull {
                expr: Box::new(self.expand_expr(expr)?),
                negated: *negated,
            },
            Expr::InList {
                expr,
                list,
                negated,
            } => Expr::InList {
                expr: Box::new(self.expand_expr(expr)?),
                list: self.expand_exprs(list)?,
                negated: *negated,
            },
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => Expr::InSubquery {
                expr: Box::new(self.expand_expr(expr)?),
                subquery: Box::new(self.expand_query(subquery)?),
                negated: *negated,
            },
            Expr::Exists {
                subquery,
                negated,
                span,
            } => Expr::Exists {
                subquery: Box::new(self.expand_query(subquery)?),
                negated: *negated,
                span: span.clone(),
            },
            Expr::Subquery(query) => Expr::Subquery(Box::new(self.expand_query(query)?)),
            Expr::Nested(inner) => Expr::Nested(Box::new(self.expand_expr(inner)?)),
        })
    }
}
