//! The resolved logical query tree.
//!
//! A [`QueryGraph`] contains no CTE references and no unresolved names: every
//! catalog relation is either a [`RelationNode::Base`] leaf or a
//! [`RelationNode::View`] carrying the view's own graph, captured when the
//! view was defined.

mod bind;

pub use bind::Binder;

use crate::ast::{BinaryOperator, JoinKind, Literal, SetOperator, UnaryOperator};
use crate::catalog::{Name, Scope};
use crate::error::{ResolveError, ResolveResult};
use smol_str::SmolStr;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryGraph {
    root: QueryBlock,
}

/// A catalog relation read by a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationRef {
    /// Fully qualified name of the definition.
    pub name: Name,
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryBlock {
    pub body: BlockBody,
    pub order_by: Vec<SortKey>,
    pub limit: Option<u64>,
    /// Output column names.
    pub columns: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockBody {
    Select(SelectBlock),
    /// A parenthesized query with its own ordering or limit.
    Nested(Box<QueryBlock>),
    SetOperation {
        op: SetOperator,
        all: bool,
        left: Box<QueryBlock>,
        right: Box<QueryBlock>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectBlock {
    pub distinct: bool,
    pub from: Vec<RelationNode>,
    pub projection: Vec<ProjectionItem>,
    pub filter: Option<ScalarExpr>,
    pub group_by: Vec<ScalarExpr>,
    pub having: Option<ScalarExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionItem {
    pub expr: ScalarExpr,
    pub name: SmolStr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: ScalarExpr,
    pub asc: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RelationNode {
    /// A base relation from the catalog.
    Base {
        name: Name,
        scope: Scope,
        alias: SmolStr,
        columns: Vec<SmolStr>,
    },
    /// A view, with the graph it was resolved to at definition time.
    View {
        name: Name,
        scope: Scope,
        alias: SmolStr,
        columns: Vec<SmolStr>,
        body: Arc<QueryGraph>,
    },
    /// A subquery in `FROM`, including inlined CTEs.
    Derived {
        alias: Option<SmolStr>,
        columns: Vec<SmolStr>,
        body: Box<QueryBlock>,
    },
    Join {
        kind: JoinKind,
        left: Box<RelationNode>,
        right: Box<RelationNode>,
        on: Option<ScalarExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    Column {
        qualifier: Option<SmolStr>,
        name: SmolStr,
    },
    Literal(Literal),
    Unary {
        op: UnaryOperator,
        expr: Box<ScalarExpr>,
    },
    Binary {
        left: Box<ScalarExpr>,
        op: BinaryOperator,
        right: Box<ScalarExpr>,
    },
    Function {
        name: SmolStr,
        distinct: bool,
        args: Vec<ScalarExpr>,
        star: bool,
    },
    IsNull {
        expr: Box<ScalarExpr>,
        negated: bool,
    },
    InList {
        expr: Box<ScalarExpr>,
        list: Vec<ScalarExpr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<ScalarExpr>,
        subquery: Box<QueryBlock>,
        negated: bool,
    },
    Exists {
        subquery: Box<QueryBlock>,
        negated: bool,
    },
    Subquery(Box<QueryBlock>),
}

impl QueryGraph {
    pub fn new(root: QueryBlock) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &QueryBlock {
        &self.root
    }

    pub fn columns(&self) -> &[SmolStr] {
        &self.root.columns
    }

    /// Catalog relations this graph reads directly, sorted and deduplicated.
    /// Relations read only through a view's body are not included.
    pub fn references(&self) -> Vec<RelationRef> {
        let mut refs = Vec::new();
        self.root.visit_relations(&mut |node| match node {
            RelationNode::Base { name, scope, .. } | RelationNode::View { name, scope, .. } => {
                refs.push(RelationRef {
                    name: name.clone(),
                    scope: *scope,
                });
            }
            RelationNode::Derived { .. } | RelationNode::Join { .. } => {}
        });
        refs.sort();
        refs.dedup();
        refs
    }

    /// Returns true if this graph reads the definition, directly or through
    /// any chain of views.
    pub fn depends_on(&self, scope: Scope, namespace: &str, name: &str) -> bool {
        let mut found = false;
        self.root.visit_relations(&mut |node| {
            if found {
                return;
            }
            match node {
                RelationNode::Base {
                    name: n, scope: s, ..
                } => found = *s == scope && is_named(n, namespace, name),
                RelationNode::View {
                    name: n,
                    scope: s,
                    body,
                    ..
                } => {
                    found = (*s == scope && is_named(n, namespace, name))
                        || body.depends_on(scope, namespace, name);
                }
                RelationNode::Derived { .. } | RelationNode::Join { .. } => {}
            }
        });
        found
    }

    /// Renames the output columns positionally.
    ///
    /// `owner` names the relation in the error when the counts differ.
    pub fn with_column_names(mut self, owner: &Name, names: Vec<SmolStr>) -> ResolveResult<Self> {
        if names.len() != self.root.columns.len() {
            return Err(ResolveError::ColumnArityMismatch {
                name: owner.clone(),
                expected: names.len(),
                found: self.root.columns.len(),
                span: None,
            });
        }
        self.root.columns = names;
        Ok(self)
    }
}

fn is_named(candidate: &Name, namespace: &str, name: &str) -> bool {
    candidate.relation == name && candidate.namespace.as_deref() == Some(namespace)
}

impl QueryBlock {
    /// Calls `f` on every relation node in this block and in every nested
    /// block, but not inside view bodies.
    pub fn visit_relations(&self, f: &mut dyn FnMut(&RelationNode)) {
        match &self.body {
            BlockBody::Select(select) => {
                for node in &select.from {
                    node.visit(f);
                }
                for item in &select.projection {
                    item.expr.visit_subqueries(f);
                }
                let clauses = select.filter.iter().chain(&select.group_by).chain(&select.having);
                for expr in clauses {
                    expr.visit_subqueries(f);
                }
            }
            BlockBody::Nested(inner) => inner.visit_relations(f),
            BlockBody::SetOperation { left, right, .. } => {
                left.visit_relations(f);
                right.visit_relations(f);
            }
        }
        for key in &self.order_by {
            key.expr.visit_subqueries(f);
        }
    }
}

impl RelationNode {
    pub fn columns(&self) -> Vec<SmolStr> {
        match self {
            RelationNode::Base { columns, .. }
            | RelationNode::View { columns, .. }
            | RelationNode::Derived { columns, .. } => columns.clone(),
            RelationNode::Join { left, right, .. } => {
                let mut columns = left.columns();
                columns.extend(right.columns());
                columns
            }
        }
    }

    /// The name columns of this relation are qualified with.
    pub fn alias(&self) -> Option<&str> {
        match self {
            RelationNode::Base { alias, .. } | RelationNode::View { alias, .. } => Some(alias),
            RelationNode::Derived { alias, .. } => alias.as_deref(),
            RelationNode::Join { .. } => None,
        }
    }

    fn visit(&self, f: &mut dyn FnMut(&RelationNode)) {
        f(self);
        match self {
            RelationNode::Derived { body, .. } => body.visit_relations(f),
            RelationNode::Join {
                left, right, on, ..
            } => {
                left.visit(f);
                right.visit(f);
                if let Some(on) = on {
                    on.visit_subqueries(f);
                }
            }
            RelationNode::Base { .. } | RelationNode::View { .. } => {}
        }
    }
}

impl ScalarExpr {
    fn visit_subqueries(&self, f: &mut dyn FnMut(&RelationNode)) {
        match self {
            ScalarExpr::Column { .. } | ScalarExpr::Literal(_) => {}
            ScalarExpr::Unary { expr, .. } | ScalarExpr::IsNull { expr, .. } => {
                expr.visit_subqueries(f)
            }
            ScalarExpr::Binary { left, right, .. } => {
                left.visit_subqueries(f);
                right.visit_subqueries(f);
            }
            ScalarExpr::Function { args, .. } => {
                for arg in args {
                    arg.visit_subqueries(f);
                }
            }
            ScalarExpr::InList { expr, list, .. } => {
                expr.visit_subqueries(f);
                for item in list {
                    item.visit_subqueries(f);
                }
            }
            ScalarExpr::InSubquery { expr, subquery, .. } => {
                expr.visit_subqueries(f);
                subquery.visit_relations(f);
            }
            ScalarExpr::Exists { subquery, .. } | ScalarExpr::Subquery(subquery) => {
                subquery.visit_relations(f)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(name: &str, scope: Scope) -> RelationNode {
        RelationNode::Base {
            name: Name::qualified("db", name),
            scope,
            alias: name.into(),
            columns: vec!["a".into()],
        }
    }

    fn select_from(from: Vec<RelationNode>) -> QueryBlock {
        QueryBlock {
            body: BlockBody::Select(SelectBlock {
                distinct: false,
                from,
                projection: vec![ProjectionItem {
                    expr: ScalarExpr::Column {
                        qualifier: None,
                        name: "a".into(),
                    },
                    name: "a".into(),
                }],
                filter: None,
                group_by: Vec::new(),
                having: None,
            }),
            order_by: Vec::new(),
            limit: None,
            columns: vec!["a".into()],
        }
    }

    #[test]
    fn renaming_checks_arity() {
        let graph = QueryGraph::new(select_from(vec![base("t", Scope::Persistent)]));
        let owner = Name::bare("v");
        let renamed = graph.clone().with_column_names(&owner, vec!["x".into()]);
        assert!(matches!(renamed, Ok(ref g) if g.columns() == ["x"]));

        let err = graph.with_column_names(&owner, vec!["x".into(), "y".into()]);
        assert!(matches!(
            err,
            Err(ResolveError::ColumnArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn dependencies_follow_view_bodies_but_references_do_not() {
        let inner = Arc::new(QueryGraph::new(select_from(vec![base(
            "t",
            Scope::Persistent,
        )])));
        let view = RelationNode::View {
            name: Name::qualified("db", "v"),
            scope: Scope::SessionTemporary,
            alias: "v".into(),
            columns: vec!["a".into()],
            body: inner,
        };
        let graph = QueryGraph::new(select_from(vec![view]));

        let refs = graph.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].scope, Scope::SessionTemporary);

        assert!(graph.depends_on(Scope::SessionTemporary, "db", "v"));
        assert!(graph.depends_on(Scope::Persistent, "db", "t"));
        assert!(!graph.depends_on(Scope::Persistent, "db", "v"));
        assert!(!graph.depends_on(Scope::Persistent, "other", "t"));
    }

    #[test]
    fn join_columns_concatenate() {
        let join = RelationNode::Join {
            kind: JoinKind::Inner,
            left: Box::new(base("t", Scope::Persistent)),
            right: Box::new(base("s", Scope::Persistent)),
            on: None,
        };
        assert_eq!(join.columns(), ["a", "a"]);
        assert_eq!(join.alias(), None);
    }
}
