use crate::ast::ObjectName;
use smol_str::SmolStr;
use std::fmt;

/// A relation name, optionally qualified with a namespace.
///
/// An unqualified name is resolved by scope precedence; a qualified one reads
/// exactly one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    pub namespace: Option<SmolStr>,
    pub relation: SmolStr,
}

impl Name {
    pub fn bare(relation: impl Into<SmolStr>) -> Self {
        Self {
            namespace: None,
            relation: relation.into(),
        }
    }

    pub fn qualified(namespace: impl Into<SmolStr>, relation: impl Into<SmolStr>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            relation: relation.into(),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.namespace.is_some()
    }

    /// The namespace, or `default` when unqualified.
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }
}

impl From<&ObjectName> for Name {
    fn from(name: &ObjectName) -> Self {
        Self {
            namespace: name.namespace.as_ref().map(|ns| ns.value.clone()),
            relation: name.relation.value.clone(),
        }
    }
}

impl From<&str> for Name {
    /// `"v"` or `"ns.v"`.
    fn from(value: &str) -> Self {
        match value.split_once('.') {
            Some((ns, rel)) => Name::qualified(ns, rel),
            None => Name::bare(value),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.relation),
            None => f.write_str(&self.relation),
        }
    }
}
