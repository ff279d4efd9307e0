use super::{
    BlockBody, ProjectionItem, QueryBlock, QueryGraph, RelationNode, ScalarExpr, SelectBlock,
    SortKey,
};
use crate::ast::{Expr, Query, Select, SelectItem, SetExpr, TableAlias, TableFactor, TableWithJoins};
use crate::catalog::{Catalog, Name, Relation};
use crate::config::MAX_RESOLVE_DEPTH;
use crate::error::{ResolveError, ResolveResult};
use crate::expand::CteExpander;
use crate::resolver::{ScopeResolver, SessionContext};
use smol_str::SmolStr;
use std::cell::Cell;
use tracing::debug;

/// Builds a [`QueryGraph`] from a query: CTEs are expanded first, then every
/// remaining relation name is resolved through the catalog.
pub struct Binder<'a> {
    resolver: ScopeResolver<'a>,
    ctx: &'a SessionContext,
    /// Nesting of the node being bound. Inlined CTE bodies can make the
    /// expanded tree deeper than the query as written.
    depth: Cell<usize>,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: &'a Catalog, ctx: &'a SessionContext) -> Self {
        Self {
            resolver: ScopeResolver::new(catalog),
            ctx,
            depth: Cell::new(0),
        }
    }

    pub fn bind(&self, query: &Query) -> ResolveResult<QueryGraph> {
        let expanded = CteExpander::new().expand(query)?;
        self.depth.set(0);
        let root = self
            .bind_query(&expanded)
            .map_err(|err| err.with_span(query.span.clone()))?;
        debug!(
            session_id = %self.ctx.session_id,
            columns = root.columns.len(),
            "bound query"
        );
        Ok(QueryGraph::new(root))
    }

    /// Runs `f` one level deeper, failing past [`MAX_RESOLVE_DEPTH`].
    fn nested<T>(&self, f: impl FnOnce() -> ResolveResult<T>) -> ResolveResult<T> {
        let depth = self.depth.get();
        if depth >= MAX_RESOLVE_DEPTH {
            return Err(ResolveError::NestingTooDeep {
                limit: MAX_RESOLVE_DEPTH,
                span: None,
            });
        }
        self.depth.set(depth + 1);
        let out = f();
        self.depth.set(depth);
        out
    }

    fn bind_query(&self, query: &Query) -> ResolveResult<QueryBlock> {
        self.nested(|| self.bind_query_block(query))
    }

    fn bind_query_block(&self, query: &Query) -> ResolveResult<QueryBlock> {
        let (body, columns) = self.bind_set_expr(&query.body)?;
        let order_by = query
            .order_by
            .iter()
            .map(|item| {
                Ok(SortKey {
                    expr: self.bind_expr(&item.expr)?,
                    asc: item.asc,
                })
            })
            .collect::<ResolveResult<_>>()?;
        Ok(QueryBlock {
            body,
            order_by,
            limit: query.limit,
            columns,
        })
    }

    fn bind_set_expr(&self, body: &SetExpr) -> ResolveResult<(BlockBody, Vec<SmolStr>)> {
        match body {
            SetExpr::Select(select) => {
                let (block, columns) = self.bind_select(select)?;
                Ok((BlockBody::Select(block), columns))
            }
            SetExpr::Query(query) => {
                let inner = self.bind_query(query)?;
                let columns = inner.columns.clone();
                Ok((BlockBody::Nested(Box::new(inner)), columns))
            }
            SetExpr::SetOperation {
                op,
                all,
                left,
                right,
            } => {
                let (left, right) =
                    self.nested(|| Ok((self.bind_arm(left)?, self.bind_arm(right)?)))?;
                if left.columns.len() != right.columns.len() {
                    return Err(ResolveError::SetOperationArity {
                        left: left.columns.len(),
                        right: right.columns.len(),
                        span: None,
                    });
                }
                let columns = left.columns.clone();
                Ok((
                    BlockBody::SetOperation {
                        op: *op,
                        all: *all,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    columns,
                ))
            }
        }
    }

    fn bind_arm(&self, arm: &SetExpr) -> ResolveResult<QueryBlock> {
        let (body, columns) = self.bind_set_expr(arm)?;
        Ok(QueryBlock {
            body,
            order_by: Vec::new(),
            limit: None,
            columns,
        })
    }

    fn bind_select(&self, select: &Select) -> ResolveResult<(SelectBlock, Vec<SmolStr>)> {
        let from = select
            .from
            .iter()
            .map(|twj| self.bind_table_with_joins(twj))
            .collect::<ResolveResult<Vec<_>>>()?;

        let mut projection = Vec::new();
        for item in &select.projection {
            match item {
                SelectItem::Wildcard(_) => {
                    for node in &from {
                        expand_wildcard(node, &mut projection);
                    }
                }
                SelectItem::QualifiedWildcard(qualifier) => {
                    let node = from
                        .iter()
                        .find_map(|node| find_aliased(node, &qualifier.value))
                        .ok_or_else(|| ResolveError::UnresolvedReference {
                            name: Name::bare(qualifier.value.clone()),
                            span: Some(qualifier.span.clone()),
                        })?;
                    expand_wildcard(node, &mut projection);
                }
                SelectItem::Expr { expr, alias } => projection.push(ProjectionItem {
                    expr: self.bind_expr(expr)?,
                    name: match alias {
                        Some(alias) => alias.value.clone(),
                        None => expr.output_name(),
                    },
                }),
            }
        }
        let columns = projection.iter().map(|item| item.name.clone()).collect();

        let block = SelectBlock {
            distinct: select.distinct,
            from,
            projection,
            filter: self.bind_opt_expr(select.selection.as_ref())?,
            group_by: self.bind_exprs(&select.group_by)?,
            having: self.bind_opt_expr(select.having.as_ref())?,
        };
        Ok((block, columns))
    }

    fn bind_table_with_joins(&self, twj: &TableWithJoins) -> ResolveResult<RelationNode> {
        let mut node = self.bind_table_factor(&twj.relation)?;
        for join in &twj.joins {
            node = RelationNode::Join {
                kind: join.kind,
                left: Box::new(node),
                right: Box::new(self.bind_table_factor(&join.relation)?),
                on: self.bind_opt_expr(join.constraint.as_ref())?,
            };
        }
        Ok(node)
    }

    fn bind_table_factor(&self, factor: &TableFactor) -> ResolveResult<RelationNode> {
        match factor {
            TableFactor::Table { name, alias } => {
                let reference = Name::from(name);
                let definition = self
                    .resolver
                    .resolve(&reference, self.ctx)
                    .map_err(|err| err.with_span(name.span()))?;
                let alias_name = alias
                    .as_ref()
                    .map_or_else(|| name.relation.value.clone(), |a| a.name.value.clone());
                let columns =
                    apply_alias_columns(definition.columns().to_vec(), alias.as_ref(), &reference)?;
                let qualified = definition.qualified_name();
                Ok(match definition.relation {
                    Relation::Table { .. } => RelationNode::Base {
                        name: qualified,
                        scope: definition.scope,
                        alias: alias_name,
                        columns,
                    },
                    Relation::View(body) => RelationNode::View {
                        name: qualified,
                        scope: definition.scope,
                        alias: alias_name,
                        columns,
                        body,
                    },
                })
            }
            TableFactor::Derived { subquery, alias } => {
                let body = self.bind_query(subquery)?;
                let owner = Name::bare(
                    alias
                        .as_ref()
                        .map_or_else(|| SmolStr::new_static("subquery"), |a| a.name.value.clone()),
                );
                let columns = apply_alias_columns(body.columns.clone(), alias.as_ref(), &owner)?;
                Ok(RelationNode::Derived {
                    alias: alias.as_ref().map(|a| a.name.value.clone()),
                    columns,
                    body: Box::new(body),
                })
            }
        }
    }

    fn bind_exprs(&self, exprs: &[Expr]) -> ResolveResult<Vec<ScalarExpr>> {
        exprs.iter().map(|e| self.bind_expr(e)).collect()
    }

    fn bind_opt_expr(&self, expr: Option<&Expr>) -> ResolveResult<Option<ScalarExpr>> {
        expr.map(|e| self.bind_expr(e)).transpose()
    }

    fn bind_expr(&self, expr: &Expr) -> ResolveResult<ScalarExpr> {
        self.nested(|| self.bind_expr_node(expr))
    }

    fn bind_expr_node(&self, expr: &Expr) -> ResolveResult<ScalarExpr> {
        Ok(match expr {
            Expr::Column { qualifier, name } => ScalarExpr::Column {
                qualifier: qualifier.as_ref().map(|q| q.value.clone()),
                name: name.value.clone(),
            },
            Expr::Literal(literal, _) => ScalarExpr::Literal(literal.clone()),
            Expr::Unary { op, expr, .. } => ScalarExpr::Unary {
                op: *op,
                expr: Box::new(self.bind_expr(expr)?),
            },
            Expr::Binary { left, op, right } => ScalarExpr::Binary {
                left: Box::new(self.bind_expr(left)?),
                op: *op,
                right: Box::new(self.bind_expr(right)?),
            },
            Expr::Function {
                name,
                distinct,
                args,
                star,
                ..
            } => ScalarExpr::Function {
                name: name.value.clone(),
                distinct: *distinct,
                args: self.bind_exprs(args)?,
                star: *star,
            },
            Expr::IsNull { expr, negated } => ScalarExpr::IsNull {
                expr: Box::new(self.bind_expr(expr)?),
                negated: *negated,
            },
            Expr::InList {
                expr,
                list,
                negated,
            } => ScalarExpr::InList {
                expr: Box::new(self.bind_expr(expr)?),
                list: self.bind_exprs(list)?,
                negated: *negated,
            },
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => ScalarExpr::InSubquery {
                expr: Box::new(self.bind_expr(expr)?),
                subquery: Box::new(self.bind_query(subquery)?),
                negated: *negated,
            },
            Expr::Exists {
                subquery, negated, ..
            } => ScalarExpr::Exists {
                subquery: Box::new(self.bind_query(subquery)?),
                negated: *negated,
            },
            Expr::Subquery(query) => ScalarExpr::Subquery(Box::new(self.bind_query(query)?)),
            Expr::Nested(inner) => self.bind_expr(inner)?,
        })
    }
}

/// Replaces `columns` with the alias column list, if there is one.
fn apply_alias_columns(
    columns: Vec<SmolStr>,
    alias: Option<&TableAlias>,
    owner: &Name,
) -> ResolveResult<Vec<SmolStr>> {
    let Some(alias) = alias.filter(|a| !a.columns.is_empty()) else {
        return Ok(columns);
    };
    if alias.columns.len() != columns.len() {
        return Err(ResolveError::ColumnArityMismatch {
            name: owner.clone(),
            expected: alias.columns.len(),
            found: columns.len(),
            span: Some(alias.name.span.clone()),
        });
    }
    Ok(alias.columns.iter().map(|c| c.value.clone()).collect())
}

/// Pushes one projection item per column of `node`, qualified by the alias of
/// the leaf relation it comes from.
fn expand_wildcard(node: &RelationNode, projection: &mut Vec<ProjectionItem>) {
    if let RelationNode::Join { left, right, .. } = node {
        expand_wildcard(left, projection);
        expand_wildcard(right, projection);
        return;
    }
    let qualifier = node.alias().map(SmolStr::new);
    for column in node.columns() {
        projection.push(ProjectionItem {
            expr: ScalarExpr::Column {
                qualifier: qualifier.clone(),
                name: column.clone(),
            },
            name: column,
        });
    }
}

fn find_aliased<'n>(node: &'n RelationNode, alias: &str) -> Option<&'n RelationNode> {
    match node {
        RelationNode::Join { left, right, .. } => {
            find_aliased(left, alias).or_else(|| find_aliased(right, alias))
        }
        other => (other.alias() == Some(alias)).then_some(other),
    }
}
