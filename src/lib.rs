//! Scoped view catalog and CTE resolution for SQL front-ends.
//!
//! Named relations live in three scopes: persistent views and tables,
//! session temporary views, and cluster-global temporary views in a reserved
//! namespace. A query is resolved in two steps: [`CteExpander`] inlines every
//! common table expression, then [`ScopeResolver`] maps each remaining name to
//! exactly one catalog definition. The result is a [`QueryGraph`].
//!
//! # Example
//!
//! ```
//! use viewscope::{CatalogConfig, Cluster, StatementResult};
//!
//! let cluster = Cluster::in_memory(CatalogConfig::default());
//! let mut session = cluster.open_session();
//!
//! let results = session
//!     .execute(
//!         "CREATE TABLE t (a, b);
//!          CREATE TEMP VIEW v AS SELECT a FROM t;
//!          WITH v AS (SELECT b FROM t) SELECT * FROM v",
//!     )
//!     .expect("statements should run");
//!
//! // Inside its scope, the CTE hides the temporary view.
//! let StatementResult::Query(graph) = &results[2] else { panic!() };
//! assert_eq!(graph.columns(), ["b"]);
//! ```

pub mod ast;
pub mod catalog;
pub mod config;
pub mod diag;
pub mod error;
pub mod expand;
pub mod graph;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod session;

pub use ast::Span;
pub use catalog::{Catalog, CatalogStore, Definition, MemoryStore, Name, Relation, Scope};
pub use config::{CatalogConfig, MAX_NESTING_DEPTH, MAX_RESOLVE_DEPTH};
pub use diag::{Diag, DiagLabel, DiagSeverity, SourceFile};
pub use error::{ResolveError, ResolveResult, SessionError};
pub use expand::{CteExpander, expand};
pub use graph::{Binder, QueryGraph, RelationNode};
pub use lexer::token::{Token, TokenKind};
pub use lexer::{LexerResult, tokenize};
pub use parser::{ParseResult, parse, parse_query};
pub use resolver::{ScopeResolver, SessionContext};
pub use session::{Cluster, Session, StatementResult};
