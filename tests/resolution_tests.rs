//! Scope precedence and view resolution through the session executor.

mod common;

use common::*;
use viewscope::catalog::Definition;
use viewscope::graph::{BlockBody, RelationNode};
use viewscope::{Relation, ResolveError, Scope};

/// The relation in the first `FROM` position of the root select.
fn first_relation(graph: &viewscope::QueryGraph) -> &RelationNode {
    match &graph.root().body {
        BlockBody::Select(select) => &select.from[0],
        other => panic!("expected a select, got {other:?}"),
    }
}

#[test]
fn temporary_view_is_preferred_over_persistent() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(
        &mut session,
        "CREATE VIEW v AS SELECT a FROM t; CREATE TEMP VIEW v AS SELECT b FROM t",
    );
    let graph = query_graph(&mut session, "SELECT * FROM v");
    assert_eq!(columns(&graph), ["b"]);
    assert!(matches!(
        first_relation(&graph),
        RelationNode::View {
            scope: Scope::SessionTemporary,
            ..
        }
    ));
}

#[test]
fn explicit_namespace_bypasses_temporary_views() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(
        &mut session,
        "CREATE VIEW v AS SELECT a FROM t; CREATE TEMP VIEW v AS SELECT b FROM t",
    );
    let graph = query_graph(&mut session, "SELECT * FROM default.v");
    assert_eq!(columns(&graph), ["a"]);
}

#[test]
fn global_views_need_the_reserved_qualifier() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(&mut session, "CREATE GLOBAL TEMP VIEW g AS SELECT c FROM t");

    assert!(matches!(
        resolve_error(&mut session, "SELECT * FROM g"),
        ResolveError::UnresolvedReference { .. }
    ));
    let graph = query_graph(&mut session, "SELECT * FROM global_temp.g");
    assert_eq!(columns(&graph), ["c"]);
    assert!(matches!(
        first_relation(&graph),
        RelationNode::View {
            scope: Scope::ClusterGlobalTemporary,
            ..
        }
    ));
}

#[test]
fn global_views_are_visible_to_every_session() {
    let cluster = cluster();
    let mut writer = seeded_session(&cluster);
    let mut reader = cluster.open_session();
    run(&mut writer, "CREATE GLOBAL TEMP VIEW g AS SELECT a, b FROM t");
    assert_eq!(
        columns(&query_graph(&mut reader, "SELECT * FROM global_temp.g")),
        ["a", "b"]
    );
}

#[test]
fn persistent_relation_in_reserved_namespace_is_ambiguous() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    let legacy = Definition::new(
        Scope::Persistent,
        "global_temp",
        "g",
        Relation::table(["x"]),
    );
    assert!(cluster.store().insert(legacy, false).is_ok());

    // The persistent entry alone is not reachable through the qualifier.
    assert!(matches!(
        resolve_error(&mut session, "SELECT * FROM global_temp.g"),
        ResolveError::UnresolvedReference { .. }
    ));

    run(&mut session, "CREATE GLOBAL TEMP VIEW g AS SELECT a FROM t");
    assert!(matches!(
        resolve_error(&mut session, "SELECT * FROM global_temp.g"),
        ResolveError::AmbiguousGlobalQualifier { .. }
    ));
}

#[test]
fn view_bodies_are_not_re_resolved_in_the_reading_session() {
    let cluster = cluster();
    let mut writer = seeded_session(&cluster);
    let mut reader = cluster.open_session();
    run(&mut writer, "CREATE GLOBAL TEMP VIEW g AS SELECT * FROM t");

    // The reader's own `t` must not leak into the view body.
    run(&mut reader, "CREATE TEMP VIEW t AS SELECT d FROM s");
    let graph = query_graph(&mut reader, "SELECT * FROM global_temp.g");
    assert_eq!(columns(&graph), ["a", "b", "c"]);

    let RelationNode::View { body, .. } = first_relation(&graph) else {
        panic!("expected a view");
    };
    let refs = body.references();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].scope, Scope::Persistent);
    assert_eq!(refs[0].name.to_string(), "default.t");
}

#[test]
fn active_namespace_scopes_unqualified_names() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(
        &mut session,
        "USE sales; CREATE TABLE orders (id, total); CREATE TEMP VIEW big AS SELECT id FROM orders",
    );
    assert_eq!(columns(&query_graph(&mut session, "SELECT * FROM big")), ["id"]);
    assert_eq!(
        columns(&query_graph(&mut session, "SELECT * FROM default.t")),
        ["a", "b", "c"]
    );

    run(&mut session, "USE default");
    assert!(matches!(
        resolve_error(&mut session, "SELECT * FROM big"),
        ResolveError::UnresolvedReference { .. }
    ));
    assert_eq!(
        columns(&query_graph(&mut session, "SELECT * FROM sales.orders")),
        ["id", "total"]
    );
}

#[test]
fn unresolved_reference_points_at_the_name() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    let sql = "SELECT a FROM t JOIN missing ON a = b";
    let err = resolve_error(&mut session, sql);
    let Some(span) = err.span() else {
        panic!("expected a span on {err:?}");
    };
    assert_eq!(&sql[span.clone()], "missing");
}

#[test]
fn references_are_collected_from_every_position() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(&mut session, "CREATE TEMP VIEW tv AS SELECT a FROM t");
    let graph = query_graph(
        &mut session,
        "SELECT a FROM tv WHERE EXISTS (SELECT 1 FROM s) AND a IN (SELECT a FROM t)",
    );
    let refs: Vec<_> = graph
        .references()
        .into_iter()
        .map(|r| (r.name.to_string(), r.scope))
        .collect();
    assert_eq!(
        refs,
        [
            ("default.s".to_string(), Scope::Persistent),
            ("default.t".to_string(), Scope::Persistent),
            ("default.tv".to_string(), Scope::SessionTemporary),
        ]
    );
}

#[test]
fn dependency_tracking_follows_view_chains() {
    let cluster = cluster();
    let mut session = seeded_session(&cluster);
    run(
        &mut session,
        "CREATE VIEW v1 AS SELECT a FROM t; CREATE VIEW v2 AS SELECT a FROM v1",
    );
    let graph = query_graph(&mut session, "SELECT * FROM v2");
    assert!(graph.depends_on(Scope::Persistent, "default", "v2"));
    assert!(graph.depends_on(Scope::Persistent, "default", "v1"));
    assert!(graph.depends_on(Scope::Persistent, "default", "t"));
    assert!(!graph.depends_on(Scope::Persistent, "default", "s"));
    assert!(!graph.depends_on(Scope::SessionTemporary, "default", "t"));
}
