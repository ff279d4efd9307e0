use super::Name;
use crate::graph::QueryGraph;
use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use std::fmt;
use std::sync::Arc;

/// Lifetime tier of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Durable; survives sessions.
    Persistent,
    /// Owned by one session and destroyed with it.
    SessionTemporary,
    /// Lives in the reserved global namespace until the cluster ends.
    ClusterGlobalTemporary,
}

impl Scope {
    pub fn is_temporary(self) -> bool {
        !matches!(self, Scope::Persistent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Persistent => "persistent",
            Scope::SessionTemporary => "temporary",
            Scope::ClusterGlobalTemporary => "global temporary",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a definition names.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// A base relation supplied by the relation-reading collaborator.
    Table { columns: Vec<SmolStr> },
    /// A view, resolved when it was defined.
    View(Arc<QueryGraph>),
}

impl Relation {
    pub fn table<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Relation::Table {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn view(graph: QueryGraph) -> Self {
        Relation::View(Arc::new(graph))
    }

    /// Output column names.
    pub fn columns(&self) -> &[SmolStr] {
        match self {
            Relation::Table { columns } => columns,
            Relation::View(graph) => graph.columns(),
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self, Relation::View(_))
    }
}

/// A named relation registered in one scope of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub scope: Scope,
    /// Owning namespace. Global temporary definitions always carry the
    /// reserved global namespace.
    pub namespace: SmolStr,
    pub name: SmolStr,
    pub relation: Relation,
    pub created_at: DateTime<Utc>,
}

impl Definition {
    pub fn new(
        scope: Scope,
        namespace: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        relation: Relation,
    ) -> Self {
        Self {
            scope,
            namespace: namespace.into(),
            name: name.into(),
            relation,
            created_at: Utc::now(),
        }
    }

    /// Fully qualified name.
    pub fn qualified_name(&self) -> Name {
        Name::qualified(self.namespace.clone(), self.name.clone())
    }

    pub fn columns(&self) -> &[SmolStr] {
        self.relation.columns()
    }
}
