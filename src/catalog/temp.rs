//! In-memory partitions for temporary definitions.

use super::{Definition, Name, Scope};
use crate::error::{ResolveError, ResolveResult};
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Cluster-global temporary views, shared by every session of a cluster.
///
/// All entries live in one namespace, fixed at construction.
#[derive(Debug)]
pub struct GlobalTempViews {
    namespace: SmolStr,
    views: RwLock<BTreeMap<SmolStr, Definition>>,
}

impl GlobalTempViews {
    pub fn new(namespace: impl Into<SmolStr>) -> Self {
        Self {
            namespace: namespace.into(),
            views: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get(&self, name: &str) -> Option<Definition> {
        self.views.read().get(name).cloned()
    }

    pub(crate) fn insert(&self, definition: Definition, replace: bool) -> ResolveResult<()> {
        let mut views = self.views.write();
        if !replace && views.contains_key(&definition.name) {
            return Err(ResolveError::AlreadyExists {
                name: definition.qualified_name(),
                scope: Scope::ClusterGlobalTemporary,
            });
        }
        views.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Definition> {
        self.views.write().remove(name)
    }

    /// Drops every view. Called when the owning cluster terminates.
    pub(crate) fn clear(&self) -> usize {
        let mut views = self.views.write();
        let count = views.len();
        views.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.views.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.read().is_empty()
    }

    pub fn names(&self) -> Vec<SmolStr> {
        self.views.read().keys().cloned().collect()
    }
}

/// Temporary definitions owned by one session, keyed by `(namespace, name)`.
#[derive(Debug, Default)]
pub struct SessionViews {
    views: BTreeMap<(SmolStr, SmolStr), Definition>,
}

impl SessionViews {
    pub fn get(&self, namespace: &str, name: &str) -> Option<&Definition> {
        self.views.get(&(SmolStr::new(namespace), SmolStr::new(name)))
    }

    pub fn insert(&mut self, definition: Definition, replace: bool) -> ResolveResult<()> {
        let key = (definition.namespace.clone(), definition.name.clone());
        if !replace && self.views.contains_key(&key) {
            return Err(ResolveError::AlreadyExists {
                name: Name::bare(definition.name),
                scope: Scope::SessionTemporary,
            });
        }
        self.views.insert(key, definition);
        Ok(())
    }

    pub fn remove(&mut self, namespace: &str, name: &str) -> Option<Definition> {
        self.views.remove(&(SmolStr::new(namespace), SmolStr::new(name)))
    }

    /// Definitions of one namespace, in name order.
    pub fn in_namespace<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a Definition> {
        self.views
            .iter()
            .filter(move |((ns, _), _)| ns == namespace)
            .map(|(_, def)| def)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}
