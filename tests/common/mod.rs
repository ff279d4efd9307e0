//! Common test utilities
//!
//! Shared fixtures and assertion helpers for the integration tests.
//!
//! # Execution Helpers
//! - [`cluster`] - In-memory cluster with the default configuration
//! - [`run`] - Execute SQL, panicking with rendered diagnostics on failure
//! - [`query_graph`] - Execute a single query and return its graph
//! - [`resolve_error`] - Execute SQL that must fail during resolution
//!
//! # Parsing Helpers
//! - [`parse_cleanly`] - Parse a query, panicking on diagnostics
//! - [`format_diagnostics`] - Render diagnostics for assertion messages

#![allow(dead_code)]

use viewscope::ast::Query;
use viewscope::catalog::{CatalogStore, Definition};
use viewscope::diag::convert_diagnostics_to_reports;
use viewscope::{
    CatalogConfig, Cluster, QueryGraph, ResolveError, ResolveResult, Session, SessionError,
    SourceFile, StatementResult, parse_query,
};

// ============================================================================
// Fixtures
// ============================================================================

pub fn cluster() -> Cluster {
    Cluster::in_memory(CatalogConfig::default())
}

/// A session with `t(a, b, c)` and `s(b, d)` registered as persistent tables
/// in the default namespace.
pub fn seeded_session(cluster: &Cluster) -> Session {
    let mut session = cluster.open_session();
    run(&mut session, "CREATE TABLE t (a, b, c); CREATE TABLE s (b, d)");
    session
}

/// A store whose every operation fails, standing in for an unreachable
/// durable backend.
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn fail<T>(name: &str) -> ResolveResult<T> {
        Err(ResolveError::Storage {
            name: name.into(),
            message: "backend unavailable".to_string(),
        })
    }
}

impl CatalogStore for UnavailableStore {
    fn get(&self, _namespace: &str, name: &str) -> ResolveResult<Option<Definition>> {
        Self::fail(name)
    }

    fn insert(&self, definition: Definition, _replace: bool) -> ResolveResult<()> {
        Self::fail(&definition.name)
    }

    fn remove(&self, _namespace: &str, name: &str) -> ResolveResult<Option<Definition>> {
        Self::fail(name)
    }

    fn list(&self, namespace: &str) -> ResolveResult<Vec<Definition>> {
        Self::fail(namespace)
    }
}

// ============================================================================
// Diagnostic Helpers
// ============================================================================

/// Format miette reports for display in assertion messages.
pub fn format_diagnostics(reports: &[miette::Report]) -> String {
    reports
        .iter()
        .map(|report| format!("{report:?}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe(err: &SessionError, sql: &str) -> String {
    format_diagnostics(&err.reports(&SourceFile::new(sql)))
}

// ============================================================================
// Execution Helpers
// ============================================================================

/// Executes `sql`, panicking with rendered diagnostics if anything fails.
pub fn run(session: &mut Session, sql: &str) -> Vec<StatementResult> {
    session
        .execute(sql)
        .unwrap_or_else(|err| panic!("`{sql}` failed:\n{}", describe(&err, sql)))
}

/// Executes a single query and returns its resolved graph.
pub fn query_graph(session: &mut Session, sql: &str) -> QueryGraph {
    match run(session, sql).pop() {
        Some(StatementResult::Query(graph)) => graph,
        other => panic!("`{sql}` did not produce a query graph: {other:?}"),
    }
}

/// Executes `sql`, which must fail with a resolution error.
pub fn resolve_error(session: &mut Session, sql: &str) -> ResolveError {
    match session.execute(sql) {
        Err(SessionError::Resolve(err)) => err,
        Err(err) => panic!("`{sql}` failed to parse:\n{}", describe(&err, sql)),
        Ok(results) => panic!("`{sql}` unexpectedly succeeded: {results:?}"),
    }
}

pub fn columns(graph: &QueryGraph) -> Vec<String> {
    graph.columns().iter().map(|c| c.to_string()).collect()
}

// ============================================================================
// Parsing Helpers
// ============================================================================

/// Parses a single query, panicking if there are any diagnostics.
pub fn parse_cleanly(sql: &str) -> Query {
    parse_query(sql).unwrap_or_else(|diags| {
        let reports = convert_diagnostics_to_reports(&diags, &SourceFile::new(sql));
        panic!("`{sql}` did not parse:\n{}", format_diagnostics(&reports))
    })
}
