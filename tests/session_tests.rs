//! Statement execution: view DDL rules, namespaces, and error reporting.

mod common;

use common::*;
use viewscope::{
    CatalogConfig, Cluster, Name, ResolveError, Scope, SessionError, SourceFile, StatementResult,
};

#[test]
fn persistent_view_may_not_read_temporary_views() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(
        &mut session,
        "CREATE TEMP VIEW tv AS SELECT a FROM t; CREATE GLOBAL TEMP VIEW gv AS SELECT b FROM t",
    );

    let err = resolve_error(&mut session, "CREATE VIEW pv AS SELECT a FROM tv");
    assert!(matches!(
        err,
        ResolveError::TemporaryInPersistentView {
            scope: Scope::SessionTemporary,
            ..
        }
    ));
    let err = resolve_error(
        &mut session,
        "CREATE VIEW pv AS SELECT a FROM t WHERE b IN (SELECT b FROM global_temp.gv)",
    );
    assert!(matches!(
        err,
        ResolveError::TemporaryInPersistentView {
            scope: Scope::ClusterGlobalTemporary,
            ..
        }
    ));
    assert!(matches!(
        session.catalog().lookup(Scope::Persistent, "default", "pv"),
        Ok(None)
    ));

    // Temporary views may read anything.
    run(&mut session, "CREATE TEMP VIEW tv2 AS SELECT a FROM tv");
}

#[test]
fn configuration_can_allow_temporary_dependencies() {
    let config = CatalogConfig {
        allow_temporary_in_persistent_views: true,
        ..CatalogConfig::default()
    };
    let cluster = Cluster::in_memory(config);
    let mut session = seeded_session(&cluster);
    run(
        &mut session,
        "CREATE TEMP VIEW tv AS SELECT a FROM t; CREATE VIEW pv AS SELECT a FROM tv",
    );
    assert_eq!(columns(&query_graph(&mut session, "SELECT * FROM pv")), ["a"]);
}

#[test]
fn replacing_a_view_with_itself_is_recursion() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(&mut session, "CREATE VIEW v AS SELECT a FROM t");

    let err = resolve_error(&mut session, "CREATE OR REPLACE VIEW v AS SELECT * FROM v");
    assert!(matches!(err, ResolveError::UnsupportedRecursion { depth: 0, .. }));

    // Indirectly, through another view.
    run(&mut session, "CREATE VIEW w AS SELECT a FROM v");
    let err = resolve_error(&mut session, "CREATE OR REPLACE VIEW v AS SELECT * FROM w");
    assert!(matches!(err, ResolveError::UnsupportedRecursion { .. }));

    // The original definition survives.
    assert_eq!(columns(&query_graph(&mut session, "SELECT * FROM v")), ["a"]);
}

#[test]
fn temporary_view_may_wrap_the_persistent_view_it_shadows() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(
        &mut session,
        "CREATE VIEW v AS SELECT a, b FROM t; CREATE TEMP VIEW v AS SELECT a FROM v",
    );
    let graph = query_graph(&mut session, "SELECT * FROM v");
    assert_eq!(columns(&graph), ["a"]);
}

#[test]
fn or_replace_and_if_not_exists() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(&mut session, "CREATE VIEW v AS SELECT a FROM t");

    assert!(matches!(
        resolve_error(&mut session, "CREATE VIEW v AS SELECT b FROM t"),
        ResolveError::AlreadyExists {
            scope: Scope::Persistent,
            ..
        }
    ));

    let results = run(&mut session, "CREATE VIEW IF NOT EXISTS v AS SELECT b FROM t");
    assert!(matches!(results[0], StatementResult::Unchanged { .. }));
    assert_eq!(columns(&query_graph(&mut session, "SELECT * FROM v")), ["a"]);

    run(&mut session, "CREATE OR REPLACE VIEW v AS SELECT b FROM t");
    assert_eq!(columns(&query_graph(&mut session, "SELECT * FROM v")), ["b"]);
}

#[test]
fn view_column_list_renames_outputs() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(&mut session, "CREATE VIEW v (x, y) AS SELECT a, b FROM t");
    assert_eq!(columns(&query_graph(&mut session, "SELECT * FROM v")), ["x", "y"]);

    assert!(matches!(
        resolve_error(&mut session, "CREATE VIEW w (x) AS SELECT a, b FROM t"),
        ResolveError::ColumnArityMismatch {
            expected: 1,
            found: 2,
            ..
        }
    ));
}

#[test]
fn statement_results_describe_each_statement() {
    let cluster = cluster();
    let mut session = cluster.open_session();
    let results = run(
        &mut session,
        "CREATE TABLE t (a); \
         CREATE GLOBAL TEMP VIEW g AS SELECT a FROM t; \
         DROP VIEW IF EXISTS missing; \
         USE sales; \
         SHOW TABLES IN default",
    );
    assert_eq!(results.len(), 5);
    assert_eq!(
        results[0],
        StatementResult::Created {
            name: Name::qualified("default", "t"),
            scope: Scope::Persistent,
        }
    );
    assert_eq!(
        results[1],
        StatementResult::Created {
            name: Name::qualified("global_temp", "g"),
            scope: Scope::ClusterGlobalTemporary,
        }
    );
    assert!(matches!(results[2], StatementResult::Unchanged { .. }));
    assert_eq!(results[3], StatementResult::NamespaceChanged("sales".into()));
    let StatementResult::Tables(entries) = &results[4] else {
        panic!("expected a listing, got {:?}", results[4]);
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "t");
}

#[test]
fn execution_stops_at_the_first_failure() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    let err = session.execute(
        "CREATE TEMP VIEW first AS SELECT a FROM t; \
         SELECT * FROM nowhere; \
         CREATE TEMP VIEW third AS SELECT a FROM t",
    );
    assert!(matches!(err, Err(SessionError::Resolve(_))));
    assert!(session.catalog().session_views().get("default", "first").is_some());
    assert!(session.catalog().session_views().get("default", "third").is_none());
}

#[test]
fn syntax_errors_run_nothing() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    let sql = "CREATE TEMP VIEW ok AS SELECT a FROM t; SELECT FROM WHERE";
    let err = match session.execute(sql) {
        Err(err @ SessionError::Parse(_)) => err,
        other => panic!("expected a parse error, got {other:?}"),
    };
    assert!(!err.diagnostics().is_empty());
    assert!(err.as_resolve().is_none());
    assert!(session.catalog().session_views().is_empty());
}

#[test]
fn resolution_errors_render_as_reports() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    let sql = "SELECT * FROM missing";
    let err = match session.execute(sql) {
        Err(err) => err,
        Ok(results) => panic!("unexpectedly succeeded: {results:?}"),
    };
    let reports = err.reports(&SourceFile::new(sql));
    assert_eq!(reports.len(), 1);
    let rendered = format_diagnostics(&reports);
    assert!(rendered.contains("missing"), "{rendered}");
    assert_eq!(err.diagnostics()[0].labels.len(), 1);
}

#[test]
fn cte_errors_point_back_at_the_declaration() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    let sql = "WITH c AS (SELECT a FROM t), c AS (SELECT b FROM t) SELECT * FROM c";
    let err = match session.execute(sql) {
        Err(err) => err,
        Ok(results) => panic!("unexpectedly succeeded: {results:?}"),
    };
    let diag = &err.diagnostics()[0];
    assert_eq!(diag.labels.len(), 2);
    assert!(!diag.labels[1].primary);
    assert_eq!(&sql[diag.labels[1].span.clone()], "c AS (SELECT a FROM t)");

    let rendered = format_diagnostics(&err.reports(&SourceFile::new(sql)));
    assert!(rendered.contains("first declared here"), "{rendered}");
}

#[test]
fn registered_tables_are_queryable() {
    let cluster = cluster();
    let mut session = cluster.open_session();
    let registered = session.register_table(
        Scope::SessionTemporary,
        &Name::bare("loaded"),
        &["id", "payload"],
        false,
    );
    assert!(registered.is_ok());
    assert_eq!(
        columns(&query_graph(&mut session, "SELECT * FROM loaded")),
        ["id", "payload"]
    );
    assert!(matches!(
        session.register_table(
            Scope::SessionTemporary,
            &Name::qualified("db", "loaded"),
            &["id"],
            false
        ),
        Err(ResolveError::QualifiedTemporaryName { .. })
    ));
}

#[test]
fn sessions_have_distinct_ids_in_one_cluster() {
    let cluster = cluster();
    let first = cluster.open_session();
    let second = cluster.open_session();
    assert_ne!(first.id(), second.id());
    assert_eq!(first.context().cluster_id, cluster.id());
    assert_eq!(second.context().cluster_id, cluster.id());
}
