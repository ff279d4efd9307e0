//! Cluster and session lifecycles, and the statement executor.
//!
//! A [`Cluster`] owns the durable store handle and the global temporary
//! partition; dropping it clears every global temporary view. Each
//! [`Session`] owns its temporary views, which vanish with it.

use crate::ast::{CreateTable, CreateView, DropRelation, Ident, Query, Statement, ViewKind};
use crate::catalog::{
    Catalog, CatalogStore, Definition, GlobalTempViews, ListEntry, MemoryStore, Name, Relation,
    Scope,
};
use crate::config::CatalogConfig;
use crate::error::{ResolveError, ResolveResult, SessionError};
use crate::graph::{Binder, QueryGraph};
use crate::parser::parse;
use crate::resolver::SessionContext;
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shared state of every session: configuration, durable store, and global
/// temporary views.
#[derive(Debug)]
pub struct Cluster {
    id: Uuid,
    config: CatalogConfig,
    store: Arc<dyn CatalogStore>,
    global: Arc<GlobalTempViews>,
}

impl Cluster {
    pub fn new(config: CatalogConfig, store: Arc<dyn CatalogStore>) -> Self {
        let global = Arc::new(GlobalTempViews::new(config.global_namespace.clone()));
        let id = Uuid::new_v4();
        info!(cluster_id = %id, global_namespace = %config.global_namespace, "cluster started");
        Self {
            id,
            config,
            store,
            global,
        }
    }

    /// A cluster over a fresh [`MemoryStore`].
    pub fn in_memory(config: CatalogConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    pub fn global_views(&self) -> &GlobalTempViews {
        &self.global
    }

    /// Opens a session in the configured default namespace.
    pub fn open_session(&self) -> Session {
        let ctx = SessionContext::new(self.id, self.config.default_namespace.clone());
        let catalog = Catalog::new(
            self.config.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.global),
        );
        info!(
            cluster_id = %self.id,
            session_id = %ctx.session_id,
            namespace = %ctx.active_namespace,
            "session opened"
        );
        Session { ctx, catalog }
    }

    /// Ends the cluster. Equivalent to dropping it.
    pub fn shutdown(self) {}
}

impl Drop for Cluster {
    fn drop(&mut self) {
        let cleared = self.global.clear();
        info!(cluster_id = %self.id, cleared, "cluster terminated");
    }
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// A resolved query, ready for a planner.
    Query(QueryGraph),
    Created { name: Name, scope: Scope },
    Dropped { name: Name, scope: Scope },
    /// `IF EXISTS` / `IF NOT EXISTS` made the statement a no-op.
    Unchanged { name: Name },
    Tables(Vec<ListEntry>),
    NamespaceChanged(SmolStr),
}

/// One client's connection to a cluster.
#[derive(Debug)]
pub struct Session {
    ctx: SessionContext,
    catalog: Catalog,
}

impl Session {
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn id(&self) -> Uuid {
        self.ctx.session_id
    }

    pub fn active_namespace(&self) -> &str {
        &self.ctx.active_namespace
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Switches the active namespace. The reserved global namespace is
    /// rejected.
    ///
    /// Session temporary views belong to the namespace that was active when
    /// they were created. After a switch they are hidden from unqualified
    /// lookups until the session switches back.
    pub fn set_namespace(&mut self, namespace: &str) -> ResolveResult<()> {
        if self.catalog.config().is_global_namespace(namespace) {
            return Err(ResolveError::ReservedNamespace {
                namespace: namespace.into(),
            });
        }
        debug!(session_id = %self.ctx.session_id, namespace, "namespace changed");
        self.ctx.active_namespace = namespace.into();
        Ok(())
    }

    /// Registers a base relation, as the relation-reading collaborator does
    /// for a loaded file or table. Unqualified names land in the active
    /// namespace; session temporary relations must be unqualified.
    pub fn register_table(
        &mut self,
        scope: Scope,
        name: &Name,
        columns: &[&str],
        replace: bool,
    ) -> ResolveResult<Definition> {
        let namespace = self.target_namespace(scope, name)?;
        self.catalog.define(
            scope,
            &namespace,
            &name.relation,
            Relation::table(columns.iter().copied()),
            replace,
        )
    }

    /// Resolves a query against this session's catalog.
    pub fn plan_query(&self, query: &Query) -> ResolveResult<QueryGraph> {
        Binder::new(&self.catalog, &self.ctx).bind(query)
    }

    /// Parses and executes `;`-separated statements in order.
    ///
    /// Nothing runs if the text has syntax errors. Execution stops at the
    /// first failing statement; earlier statements keep their effect.
    pub fn execute(&mut self, sql: &str) -> Result<Vec<StatementResult>, SessionError> {
        let parsed = parse(sql);
        if parsed.has_errors() {
            return Err(SessionError::Parse(parsed.diagnostics));
        }
        let statements = parsed.ast.map(|s| s.statements).unwrap_or_default();
        let mut results = Vec::with_capacity(statements.len());
        for (index, statement) in statements.iter().enumerate() {
            match self.execute_statement(statement) {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(
                        session_id = %self.ctx.session_id,
                        statement = index,
                        kind = err.kind(),
                        "statement failed: {err}"
                    );
                    return Err(err.into());
                }
            }
        }
        Ok(results)
    }

    pub fn execute_statement(&mut self, statement: &Statement) -> ResolveResult<StatementResult> {
        match statement {
            Statement::Query(query) => self.plan_query(query).map(StatementResult::Query),
            Statement::CreateView(create) => self.create_view(create),
            Statement::CreateTable(create) => self.create_table(create),
            Statement::Drop(drop) => self.drop_relation(drop),
            Statement::ShowTables { namespace, .. } => {
                let namespace = namespace
                    .as_ref()
                    .map_or(self.ctx.active_namespace.clone(), |ns| ns.value.clone());
                self.catalog
                    .list(&namespace, true)
                    .map(StatementResult::Tables)
            }
            Statement::Use { namespace, .. } => {
                self.set_namespace(namespace.as_str())?;
                Ok(StatementResult::NamespaceChanged(namespace.value.clone()))
            }
        }
    }

    fn create_view(&mut self, create: &CreateView) -> ResolveResult<StatementResult> {
        let scope = match create.kind {
            ViewKind::Persistent => Scope::Persistent,
            ViewKind::Temporary => Scope::SessionTemporary,
            ViewKind::GlobalTemporary => Scope::ClusterGlobalTemporary,
        };
        let name = Name::from(&create.name);
        let namespace = self.target_namespace(scope, &name)?;

        if create.if_not_exists
            && self
                .catalog
                .lookup(scope, &namespace, &name.relation)?
                .is_some()
        {
            return Ok(StatementResult::Unchanged { name });
        }

        let mut graph = self.plan_query(&create.query)?;
        if !create.columns.is_empty() {
            graph = graph.with_column_names(&name, idents(&create.columns))?;
        }

        let allow_temporary = self.catalog.config().allow_temporary_in_persistent_views;
        if scope == Scope::Persistent && !allow_temporary {
            let references = graph.references();
            if let Some(dependency) = references.into_iter().find(|r| r.scope.is_temporary()) {
                return Err(ResolveError::TemporaryInPersistentView {
                    view: Name::qualified(namespace, name.relation),
                    dependency: dependency.name,
                    scope: dependency.scope,
                });
            }
        }

        if graph.depends_on(scope, &namespace, &name.relation) {
            return Err(ResolveError::UnsupportedRecursion {
                name,
                depth: 0,
                span: Some(create.name.span()),
                declared_at: None,
            });
        }

        let definition = self.catalog.define(
            scope,
            &namespace,
            &name.relation,
            Relation::view(graph),
            create.or_replace,
        )?;
        info!(
            session_id = %self.ctx.session_id,
            %scope,
            namespace = %definition.namespace,
            name = %definition.name,
            "view created"
        );
        Ok(StatementResult::Created {
            name: definition.qualified_name(),
            scope,
        })
    }

    fn create_table(&mut self, create: &CreateTable) -> ResolveResult<StatementResult> {
        let name = Name::from(&create.name);
        let namespace = self.target_namespace(Scope::Persistent, &name)?;
        if create.if_not_exists
            && self
                .catalog
                .lookup(Scope::Persistent, &namespace, &name.relation)?
                .is_some()
        {
            return Ok(StatementResult::Unchanged { name });
        }
        let columns: Vec<_> = create.columns.iter().map(|c| c.name.value.clone()).collect();
        let definition = self.catalog.define(
            Scope::Persistent,
            &namespace,
            &name.relation,
            Relation::Table { columns },
            false,
        )?;
        Ok(StatementResult::Created {
            name: definition.qualified_name(),
            scope: Scope::Persistent,
        })
    }

    /// Unqualified names drop the session's temporary relation if there is
    /// one, else the persistent relation in the active namespace. The
    /// reserved global namespace drops a global temporary view.
    fn drop_relation(&mut self, drop: &DropRelation) -> ResolveResult<StatementResult> {
        let name = Name::from(&drop.name);
        let (scope, namespace) = match &name.namespace {
            Some(ns) if self.catalog.config().is_global_namespace(ns) => {
                (Scope::ClusterGlobalTemporary, ns.clone())
            }
            Some(ns) => (Scope::Persistent, ns.clone()),
            None => {
                let active = self.ctx.active_namespace.clone();
                let temporary = self
                    .catalog
                    .lookup(Scope::SessionTemporary, &active, &name.relation)?;
                let scope = if temporary.is_some() {
                    Scope::SessionTemporary
                } else {
                    Scope::Persistent
                };
                (scope, active)
            }
        };

        match self.catalog.drop(scope, &namespace, &name.relation) {
            Ok(definition) => Ok(StatementResult::Dropped {
                name: definition.qualified_name(),
                scope,
            }),
            Err(ResolveError::NotFound { .. }) if drop.if_exists => {
                Ok(StatementResult::Unchanged { name })
            }
            Err(err) => Err(err),
        }
    }

    /// Namespace a new definition of `scope` named `name` is stored under.
    fn target_namespace(&self, scope: Scope, name: &Name) -> ResolveResult<SmolStr> {
        let global = &self.catalog.config().global_namespace;
        match (scope, &name.namespace) {
            (Scope::SessionTemporary, Some(_)) => Err(ResolveError::QualifiedTemporaryName {
                name: name.clone(),
            }),
            (Scope::SessionTemporary, None) => Ok(self.ctx.active_namespace.clone()),
            (Scope::ClusterGlobalTemporary, Some(ns)) if ns != global => {
                Err(ResolveError::QualifiedTemporaryName { name: name.clone() })
            }
            (Scope::ClusterGlobalTemporary, _) => Ok(global.clone()),
            (Scope::Persistent, ns) => Ok(ns
                .clone()
                .unwrap_or_else(|| self.ctx.active_namespace.clone())),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        info!(
            session_id = %self.ctx.session_id,
            temporary_views = self.catalog.session_views().len(),
            "session closed"
        );
    }
}

fn idents(idents: &[Ident]) -> Vec<SmolStr> {
    idents.iter().map(|i| i.value.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(session: &mut Session, sql: &str) -> Vec<StatementResult> {
        session
            .execute(sql)
            .unwrap_or_else(|err| panic!("{sql}: {err}"))
    }

    fn resolve_err(session: &mut Session, sql: &str) -> ResolveError {
        match session.execute(sql) {
            Err(SessionError::Resolve(err)) => err,
            other => panic!("{sql}: expected a resolution error, got {other:?}"),
        }
    }

    #[test]
    fn show_tables_lists_persistent_and_temporary() {
        let cluster = Cluster::in_memory(CatalogConfig::default());
        let mut session = cluster.open_session();
        let results = run(
            &mut session,
            "CREATE TABLE t (a, b); \
             CREATE TEMP VIEW tv AS SELECT a FROM t; \
             CREATE GLOBAL TEMP VIEW gv AS SELECT b FROM t; \
             SHOW TABLES",
        );
        let Some(StatementResult::Tables(entries)) = results.last() else {
            panic!("expected a table listing");
        };
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["t", "tv"]);
    }

    #[test]
    fn use_rejects_reserved_namespace() {
        let cluster = Cluster::in_memory(CatalogConfig::default());
        let mut session = cluster.open_session();
        assert!(matches!(
            resolve_err(&mut session, "USE global_temp"),
            ResolveError::ReservedNamespace { .. }
        ));
        run(&mut session, "USE sales");
        assert_eq!(session.active_namespace(), "sales");
    }

    #[test]
    fn qualified_temporary_names_are_rejected() {
        let cluster = Cluster::in_memory(CatalogConfig::default());
        let mut session = cluster.open_session();
        run(&mut session, "CREATE TABLE t (a)");
        assert!(matches!(
            resolve_err(&mut session, "CREATE TEMP VIEW db.v AS SELECT a FROM t"),
            ResolveError::QualifiedTemporaryName { .. }
        ));
        assert!(matches!(
            resolve_err(&mut session, "CREATE GLOBAL TEMP VIEW db.v AS SELECT a FROM t"),
            ResolveError::QualifiedTemporaryName { .. }
        ));
        run(&mut session, "CREATE GLOBAL TEMP VIEW global_temp.v AS SELECT a FROM t");
    }

    #[test]
    fn view_column_list_renames_outputs() {
        let cluster = Cluster::in_memory(CatalogConfig::default());
        let mut session = cluster.open_session();
        run(&mut session, "CREATE TABLE t (a, b)");
        run(&mut session, "CREATE VIEW v (x, y) AS SELECT * FROM t");
        let results = run(&mut session, "SELECT * FROM v");
        let Some(StatementResult::Query(graph)) = results.first() else {
            panic!("expected a query");
        };
        assert_eq!(graph.columns(), ["x", "y"]);
        assert!(matches!(
            resolve_err(&mut session, "CREATE VIEW w (x) AS SELECT * FROM t"),
            ResolveError::ColumnArityMismatch { .. }
        ));
    }

    #[test]
    fn if_exists_variants_are_no_ops() {
        let cluster = Cluster::in_memory(CatalogConfig::default());
        let mut session = cluster.open_session();
        let results = run(
            &mut session,
            "DROP VIEW IF EXISTS nothing; CREATE TABLE t (a); CREATE TABLE IF NOT EXISTS t (b)",
        );
        assert!(matches!(results[0], StatementResult::Unchanged { .. }));
        assert!(matches!(results[2], StatementResult::Unchanged { .. }));
        assert!(matches!(
            resolve_err(&mut session, "DROP TABLE nothing"),
            ResolveError::NotFound { .. }
        ));
    }

    #[test]
    fn parse_errors_execute_nothing() {
        let cluster = Cluster::in_memory(CatalogConfig::default());
        let mut session = cluster.open_session();
        assert!(matches!(
            session.execute("CREATE TABLE t (a); SELECT FROM"),
            Err(SessionError::Parse(_))
        ));
        assert!(matches!(
            session.catalog().lookup(Scope::Persistent, "default", "t"),
            Ok(None)
        ));
    }
}
