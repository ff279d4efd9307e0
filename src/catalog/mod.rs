//! Namespaced registry of relation definitions, partitioned by scope.
//!
//! A [`Catalog`] is one session's view of the registry: it shares the durable
//! store and the cluster-global temporary partition with every other session
//! of the cluster, and owns its session-temporary partition outright.

mod definition;
mod name;
mod store;
mod temp;

pub use definition::{Definition, Relation, Scope};
pub use name::Name;
pub use store::{CatalogStore, MemoryStore};
pub use temp::{GlobalTempViews, SessionViews};

use crate::config::CatalogConfig;
use crate::error::{ResolveError, ResolveResult};
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::debug;

/// One entry of [`Catalog::list`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ListEntry {
    pub name: SmolStr,
    pub scope: Scope,
}

#[derive(Debug)]
pub struct Catalog {
    config: CatalogConfig,
    store: Arc<dyn CatalogStore>,
    global: Arc<GlobalTempViews>,
    session: SessionViews,
}

impl Catalog {
    /// Creates a session catalog over shared cluster state.
    pub fn new(
        config: CatalogConfig,
        store: Arc<dyn CatalogStore>,
        global: Arc<GlobalTempViews>,
    ) -> Self {
        Self {
            config,
            store,
            global,
            session: SessionViews::default(),
        }
    }

    /// A catalog with its own in-memory store and global partition.
    pub fn in_memory(config: CatalogConfig) -> Self {
        let global = Arc::new(GlobalTempViews::new(config.global_namespace.clone()));
        Self::new(config, Arc::new(MemoryStore::new()), global)
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn global_namespace(&self) -> &str {
        &self.config.global_namespace
    }

    pub fn session_views(&self) -> &SessionViews {
        &self.session
    }

    /// Registers a definition.
    ///
    /// Global temporary definitions ignore `namespace` and land in the
    /// reserved global namespace. With `replace` unset an existing key fails
    /// with [`ResolveError::AlreadyExists`].
    pub fn define(
        &mut self,
        scope: Scope,
        namespace: &str,
        name: &str,
        relation: Relation,
        replace: bool,
    ) -> ResolveResult<Definition> {
        let namespace = match scope {
            Scope::ClusterGlobalTemporary => self.config.global_namespace.clone(),
            Scope::Persistent | Scope::SessionTemporary => {
                if self.config.is_global_namespace(namespace) {
                    return Err(ResolveError::ReservedNamespace {
                        namespace: namespace.into(),
                    });
                }
                SmolStr::new(namespace)
            }
        };

        let definition = Definition::new(scope, namespace, name, relation);
        match scope {
            Scope::Persistent => self.store.insert(definition.clone(), replace)?,
            Scope::SessionTemporary => self.session.insert(definition.clone(), replace)?,
            Scope::ClusterGlobalTemporary => self.global.insert(definition.clone(), replace)?,
        }
        debug!(
            %scope,
            namespace = %definition.namespace,
            name = %definition.name,
            replace,
            "defined relation"
        );
        Ok(definition)
    }

    /// Removes a definition, failing with [`ResolveError::NotFound`] if it is
    /// absent.
    pub fn drop(&mut self, scope: Scope, namespace: &str, name: &str) -> ResolveResult<Definition> {
        let removed = match scope {
            Scope::Persistent => self.store.remove(namespace, name)?,
            Scope::SessionTemporary => self.session.remove(namespace, name),
            Scope::ClusterGlobalTemporary => self.global.remove(name),
        };
        match removed {
            Some(definition) => {
                debug!(%scope, namespace, name, "dropped relation");
                Ok(definition)
            }
            None => Err(ResolveError::NotFound {
                name: self.display_name(scope, namespace, name),
                scope,
            }),
        }
    }

    /// Reads one scope. Global temporary lookups ignore `namespace`.
    pub fn lookup(
        &self,
        scope: Scope,
        namespace: &str,
        name: &str,
    ) -> ResolveResult<Option<Definition>> {
        Ok(match scope {
            Scope::Persistent => self.store.get(namespace, name)?,
            Scope::SessionTemporary => self.session.get(namespace, name).cloned(),
            Scope::ClusterGlobalTemporary => self.global.get(name),
        })
    }

    /// Persistent and, optionally, session-temporary definitions of a
    /// namespace, sorted by name then scope. Global temporary views are never
    /// listed.
    pub fn list(&self, namespace: &str, include_temporary: bool) -> ResolveResult<Vec<ListEntry>> {
        let mut entries: Vec<ListEntry> = self
            .store
            .list(namespace)?
            .into_iter()
            .map(|def| ListEntry {
                name: def.name,
                scope: Scope::Persistent,
            })
            .collect();
        if include_temporary {
            entries.extend(self.session.in_namespace(namespace).map(|def| ListEntry {
                name: def.name.clone(),
                scope: Scope::SessionTemporary,
            }));
        }
        entries.sort();
        Ok(entries)
    }

    fn display_name(&self, scope: Scope, namespace: &str, name: &str) -> Name {
        match scope {
            Scope::SessionTemporary => Name::bare(name),
            Scope::ClusterGlobalTemporary => {
                Name::qualified(self.config.global_namespace.clone(), name)
            }
            Scope::Persistent => Name::qualified(namespace, name),
        }
    }
}
