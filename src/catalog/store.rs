//! Durable storage for persistent definitions.

use super::{Definition, Scope};
use crate::error::{ResolveError, ResolveResult};
use parking_lot::RwLock;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;

/// Persistence collaborator for [`Scope::Persistent`] definitions.
///
/// Implementations must make a successful `insert` or `remove` durable before
/// returning, and must serialize writers per key. Reads never observe a
/// partially written definition.
pub trait CatalogStore: Send + Sync + fmt::Debug {
    fn get(&self, namespace: &str, name: &str) -> ResolveResult<Option<Definition>>;

    /// Stores `definition`. With `replace` unset an existing entry fails with
    /// [`ResolveError::AlreadyExists`]; otherwise it is overwritten.
    fn insert(&self, definition: Definition, replace: bool) -> ResolveResult<()>;

    /// Removes and returns the definition, if present.
    fn remove(&self, namespace: &str, name: &str) -> ResolveResult<Option<Definition>>;

    /// All definitions of a namespace, in name order.
    fn list(&self, namespace: &str) -> ResolveResult<Vec<Definition>>;
}

/// In-process [`CatalogStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<(SmolStr, SmolStr), Definition>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CatalogStore for MemoryStore {
    fn get(&self, namespace: &str, name: &str) -> ResolveResult<Option<Definition>> {
        let key = (SmolStr::new(namespace), SmolStr::new(name));
        Ok(self.entries.read().get(&key).cloned())
    }

    fn insert(&self, definition: Definition, replace: bool) -> ResolveResult<()> {
        let key = (definition.namespace.clone(), definition.name.clone());
        let mut entries = self.entries.write();
        if !replace && entries.contains_key(&key) {
            return Err(ResolveError::AlreadyExists {
                name: definition.qualified_name(),
                scope: Scope::Persistent,
            });
        }
        entries.insert(key, definition);
        Ok(())
    }

    fn remove(&self, namespace: &str, name: &str) -> ResolveResult<Option<Definition>> {
        let key = (SmolStr::new(namespace), SmolStr::new(name));
        Ok(self.entries.write().remove(&key))
    }

    fn list(&self, namespace: &str) -> ResolveResult<Vec<Definition>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, def)| def.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Relation;

    fn table(ns: &str, name: &str) -> Definition {
        Definition::new(Scope::Persistent, ns, name, Relation::table(["a"]))
    }

    #[test]
    fn insert_respects_replace_flag() {
        let store = MemoryStore::new();
        assert!(store.insert(table("db", "t"), false).is_ok());
        assert!(matches!(
            store.insert(table("db", "t"), false),
            Err(ResolveError::AlreadyExists { .. })
        ));
        assert!(store.insert(table("db", "t"), true).is_ok());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn list_is_namespace_scoped_and_ordered() {
        let store = MemoryStore::new();
        for (ns, name) in [("db", "b"), ("other", "x"), ("db", "a")] {
            assert!(store.insert(table(ns, name), false).is_ok());
        }
        let names: Vec<_> = store
            .list("db")
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn remove_returns_previous() {
        let store = MemoryStore::new();
        assert!(store.insert(table("db", "t"), false).is_ok());
        assert!(matches!(store.remove("db", "t"), Ok(Some(_))));
        assert!(matches!(store.remove("db", "t"), Ok(None)));
        assert!(store.is_empty());
    }
}
