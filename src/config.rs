//! Catalog configuration.

use smol_str::SmolStr;

/// Deepest recursion the parser accepts. Subqueries, derived tables, CTE
/// bodies, parenthesized expressions, and prefix operators each add a level.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Deepest tree the CTE expander and the binder walk, counting query blocks,
/// set operations, and expression nodes. Inlined CTE bodies and operator
/// chains make trees deeper than the parser's own nesting.
pub const MAX_RESOLVE_DEPTH: usize = 256;

/// Settings shared by every session of a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Namespace that holds cluster-global temporary views. It is reserved:
    /// persistent definitions may not be created in it.
    pub global_namespace: SmolStr,

    /// Namespace a new session starts in.
    pub default_namespace: SmolStr,

    /// Allow persistent views to read temporary views.
    ///
    /// Off by default: a persistent view outlives the session that created
    /// it, and so would its dangling reference.
    pub allow_temporary_in_persistent_views: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            global_namespace: SmolStr::new_static("global_temp"),
            default_namespace: SmolStr::new_static("default"),
            allow_temporary_in_persistent_views: false,
        }
    }
}

impl CatalogConfig {
    pub fn with_global_namespace(mut self, namespace: impl Into<SmolStr>) -> Self {
        self.global_namespace = namespace.into();
        self
    }

    pub fn with_default_namespace(mut self, namespace: impl Into<SmolStr>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    pub fn is_global_namespace(&self, namespace: &str) -> bool {
        self.global_namespace == namespace
    }
}
