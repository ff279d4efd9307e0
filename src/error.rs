//! Resolution errors and their diagnostic rendering.

use crate::ast::Span;
use crate::catalog::{Name, Scope};
use crate::diag::{Diag, SourceFile, convert_diagnostics_to_reports};
use miette::Report;
use smol_str::SmolStr;

/// Result type for catalog, resolution, and expansion operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Failure while defining, resolving, or expanding named relations.
///
/// Every variant carries the offending name; spans are filled in when the
/// failure can be traced to statement text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A definition with this key already exists in the scope.
    AlreadyExists { name: Name, scope: Scope },

    /// No definition with this key exists in the scope.
    NotFound { name: Name, scope: Scope },

    /// No scope tier holds the referenced name.
    UnresolvedReference { name: Name, span: Option<Span> },

    /// A column alias list does not match the relation's output columns.
    ColumnArityMismatch {
        name: Name,
        expected: usize,
        found: usize,
        span: Option<Span>,
    },

    /// A CTE or view refers to itself.
    UnsupportedRecursion {
        name: Name,
        depth: usize,
        span: Option<Span>,
        /// Declaration of the CTE being defined, when known.
        declared_at: Option<Span>,
    },

    /// The reserved global namespace qualifies a name that also exists as a
    /// persistent relation in the durable store.
    AmbiguousGlobalQualifier { name: Name },

    /// One `WITH` list declares the same name twice.
    DuplicateCte {
        name: Name,
        span: Option<Span>,
        /// The earlier declaration of the name.
        declared_at: Option<Span>,
    },

    /// The query tree is deeper than the expander or binder will walk.
    NestingTooDeep { limit: usize, span: Option<Span> },

    /// The arms of a set operation produce different column counts.
    SetOperationArity {
        left: usize,
        right: usize,
        span: Option<Span>,
    },

    /// Persistent definitions and session contexts may not use the reserved
    /// global namespace.
    ReservedNamespace { namespace: SmolStr },

    /// A session temporary view was named with a namespace.
    QualifiedTemporaryName { name: Name },

    /// A persistent view would read a temporary relation.
    TemporaryInPersistentView {
        view: Name,
        dependency: Name,
        scope: Scope,
    },

    /// The durable store failed.
    Storage { name: Name, message: String },
}

impl ResolveError {
    /// Identifier used in diagnostic codes.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::AlreadyExists { .. } => "already_exists",
            ResolveError::NotFound { .. } => "not_found",
            ResolveError::UnresolvedReference { .. } => "unresolved_reference",
            ResolveError::ColumnArityMismatch { .. } => "column_arity_mismatch",
            ResolveError::UnsupportedRecursion { .. } => "unsupported_recursion",
            ResolveError::AmbiguousGlobalQualifier { .. } => "ambiguous_global_qualifier",
            ResolveError::DuplicateCte { .. } => "duplicate_cte",
            ResolveError::SetOperationArity { .. } => "set_operation_arity",
            ResolveError::NestingTooDeep { .. } => "nesting_too_deep",
            ResolveError::ReservedNamespace { .. } => "reserved_namespace",
            ResolveError::QualifiedTemporaryName { .. } => "qualified_temporary_name",
            ResolveError::TemporaryInPersistentView { .. } => "temporary_in_persistent_view",
            ResolveError::Storage { .. } => "storage",
        }
    }

    pub fn span(&self) -> Option<&Span> {
        match self {
            ResolveError::UnresolvedReference { span, .. }
            | ResolveError::ColumnArityMismatch { span, .. }
            | ResolveError::UnsupportedRecursion { span, .. }
            | ResolveError::DuplicateCte { span, .. }
            | ResolveError::SetOperationArity { span, .. }
            | ResolveError::NestingTooDeep { span, .. } => span.as_ref(),
            _ => None,
        }
    }

    /// Attaches `span` if the error has a span slot that is still empty.
    pub fn with_span(mut self, new_span: Span) -> Self {
        match &mut self {
            ResolveError::UnresolvedReference { span, .. }
            | ResolveError::ColumnArityMismatch { span, .. }
            | ResolveError::UnsupportedRecursion { span, .. }
            | ResolveError::DuplicateCte { span, .. }
            | ResolveError::SetOperationArity { span, .. }
            | ResolveError::NestingTooDeep { span, .. } => {
                if span.is_none() {
                    *span = Some(new_span);
                }
            }
            _ => {}
        }
        self
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            ResolveError::AlreadyExists { .. } => {
                Some("use CREATE OR REPLACE to overwrite the existing definition")
            }
            ResolveError::UnsupportedRecursion { .. } => {
                Some("recursive common table expressions are not supported")
            }
            ResolveError::AmbiguousGlobalQualifier { .. } => {
                Some("rename or drop the persistent relation in the reserved namespace")
            }
            ResolveError::QualifiedTemporaryName { .. } => {
                Some("temporary views live in the session's active namespace")
            }
            ResolveError::TemporaryInPersistentView { .. } => {
                Some("create the view as TEMPORARY, or reference only persistent relations")
            }
            ResolveError::NestingTooDeep { .. } => {
                Some("split the query into views or common table expressions")
            }
            _ => None,
        }
    }

    /// Points at the declaration a CTE error refers back to.
    fn declaration(&self) -> Option<(&Span, &'static str)> {
        match self {
            ResolveError::UnsupportedRecursion {
                declared_at: Some(declared),
                ..
            } => Some((declared, "declared here")),
            ResolveError::DuplicateCte {
                declared_at: Some(declared),
                ..
            } => Some((declared, "first declared here")),
            _ => None,
        }
    }

    fn note(&self) -> Option<String> {
        match self {
            ResolveError::UnsupportedRecursion { depth, .. } if *depth > 0 => Some(format!(
                "the recursive definition starts at WITH scope depth {depth}"
            )),
            ResolveError::NestingTooDeep { .. } => Some(
                "nested query blocks and expression nodes each count toward the limit".to_string(),
            ),
            _ => None,
        }
    }

    /// Converts to a diagnostic with code `viewscope::<kind>`.
    pub fn to_diag(&self) -> Diag {
        let mut diag =
            Diag::error(self.to_string()).with_code(format!("viewscope::{}", self.kind()));
        if let Some(span) = self.span() {
            diag = diag.with_primary_label(span.clone(), "referenced here");
        }
        if let Some((declared, label)) = self.declaration() {
            diag = diag.with_secondary_label(declared.clone(), label);
        }
        if let Some(help) = self.help() {
            diag = diag.with_help(help);
        }
        if let Some(note) = self.note() {
            diag = diag.with_note(note);
        }
        diag
    }
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::AlreadyExists { name, scope } => {
                write!(f, "{scope} relation '{name}' already exists")
            }
            ResolveError::NotFound { name, scope } => {
                write!(f, "{scope} relation '{name}' not found")
            }
            ResolveError::UnresolvedReference { name, .. } => {
                write!(f, "relation '{name}' could not be resolved")
            }
            ResolveError::ColumnArityMismatch {
                name,
                expected,
                found,
                ..
            } => write!(
                f,
                "'{name}' declares {expected} column names but its query produces {found} columns"
            ),
            ResolveError::UnsupportedRecursion { name, depth, .. } => {
                write!(f, "'{name}' refers to itself (CTE depth {depth})")
            }
            ResolveError::AmbiguousGlobalQualifier { name } => write!(
                f,
                "'{name}' names both a global temporary view and a persistent relation"
            ),
            ResolveError::DuplicateCte { name, .. } => {
                write!(f, "common table expression '{name}' is declared more than once")
            }
            ResolveError::SetOperationArity { left, right, .. } => write!(
                f,
                "set operation arms produce {left} and {right} columns"
            ),
            ResolveError::NestingTooDeep { limit, .. } => {
                write!(f, "query nests more than {limit} levels deep")
            }
            ResolveError::ReservedNamespace { namespace } => {
                write!(f, "namespace '{namespace}' is reserved for global temporary views")
            }
            ResolveError::QualifiedTemporaryName { name } => {
                write!(f, "temporary view name '{name}' cannot be qualified")
            }
            ResolveError::TemporaryInPersistentView {
                view,
                dependency,
                scope,
            } => write!(
                f,
                "persistent view '{view}' cannot reference {scope} view '{dependency}'"
            ),
            ResolveError::Storage { name, message } => {
                write!(f, "catalog storage failed for '{name}': {message}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Failure of [`crate::Session::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// The text did not parse; nothing was executed.
    Parse(Vec<Diag>),
    /// A statement failed; statements before it took effect.
    Resolve(ResolveError),
}

impl SessionError {
    pub fn diagnostics(&self) -> Vec<Diag> {
        match self {
            SessionError::Parse(diags) => diags.clone(),
            SessionError::Resolve(err) => vec![err.to_diag()],
        }
    }

    /// Renders the diagnostics against the executed text.
    pub fn reports(&self, source: &SourceFile) -> Vec<Report> {
        convert_diagnostics_to_reports(&self.diagnostics(), source)
    }

    pub fn as_resolve(&self) -> Option<&ResolveError> {
        match self {
            SessionError::Resolve(err) => Some(err),
            SessionError::Parse(_) => None,
        }
    }
}

impl From<ResolveError> for SessionError {
    fn from(err: ResolveError) -> Self {
        SessionError::Resolve(err)
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Parse(diags) => match diags.first() {
                Some(first) if diags.len() > 1 => {
                    write!(f, "{first} (and {} more)", diags.len() - 1)
                }
                Some(first) => write!(f, "{first}"),
                None => f.write_str("parse failed"),
            },
            SessionError::Resolve(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {}
