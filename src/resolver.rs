//! Scope precedence for named relation references.

use crate::catalog::{Catalog, Definition, Name, Scope};
use crate::error::{ResolveError, ResolveResult};
use smol_str::SmolStr;
use tracing::trace;
use uuid::Uuid;

/// Who is resolving: the session, its cluster, and its active namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub cluster_id: Uuid,
    pub active_namespace: SmolStr,
}

impl SessionContext {
    /// A fresh session id in `cluster_id`.
    pub fn new(cluster_id: Uuid, active_namespace: impl Into<SmolStr>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            cluster_id,
            active_namespace: active_namespace.into(),
        }
    }
}

/// Picks the single definition a name refers to.
///
/// Unqualified names try the session's temporary views, then persistent
/// relations in the active namespace. A namespace qualifier reads exactly one
/// scope: the reserved global namespace reads global temporary views, any
/// other namespace reads persistent relations.
#[derive(Debug, Clone, Copy)]
pub struct ScopeResolver<'c> {
    catalog: &'c Catalog,
}

impl<'c> ScopeResolver<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    pub fn resolve(&self, name: &Name, ctx: &SessionContext) -> ResolveResult<Definition> {
        let found = match &name.namespace {
            Some(ns) if self.catalog.config().is_global_namespace(ns) => {
                self.resolve_global(name, ns)?
            }
            Some(ns) => self.catalog.lookup(Scope::Persistent, ns, &name.relation)?,
            None => self.resolve_unqualified(name, &ctx.active_namespace)?,
        };
        match found {
            Some(definition) => {
                trace!(
                    %name,
                    scope = %definition.scope,
                    namespace = %definition.namespace,
                    session_id = %ctx.session_id,
                    "resolved relation"
                );
                Ok(definition)
            }
            None => Err(ResolveError::UnresolvedReference {
                name: name.clone(),
                span: None,
            }),
        }
    }

    fn resolve_unqualified(
        &self,
        name: &Name,
        namespace: &str,
    ) -> ResolveResult<Option<Definition>> {
        for scope in [Scope::SessionTemporary, Scope::Persistent] {
            if let Some(definition) = self.catalog.lookup(scope, namespace, &name.relation)? {
                return Ok(Some(definition));
            }
        }
        Ok(None)
    }

    fn resolve_global(&self, name: &Name, namespace: &str) -> ResolveResult<Option<Definition>> {
        let global = self
            .catalog
            .lookup(Scope::ClusterGlobalTemporary, namespace, &name.relation)?;
        if global.is_some()
            && self
                .catalog
                .lookup(Scope::Persistent, namespace, &name.relation)?
                .is_some()
        {
            return Err(ResolveError::AmbiguousGlobalQualifier { name: name.clone() });
        }
        Ok(global)
    }
}
