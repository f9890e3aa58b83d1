#![forbid(unsafe_code)]
//! relplan-planner: parsed SELECT/UNION statement → logical plan tree.
//!
//! Design:
//! - The statement arrives as an `ast::Statement`; no SQL text is read here.
//! - Builders in `builder` recurse over the FROM tree first, then layer
//!   selection, locking, aggregation, projection, HAVING, DISTINCT, ORDER BY,
//!   LIMIT and a final trim on top of it.
//! - Table metadata comes from a `catalog::Catalog`; scalar expressions are
//!   resolved by a `rewrite::ExprRewriter`. Both are injectable.
//! - One `session::BuildSession` per statement owns id allocation and the
//!   first recorded error.

pub mod ast;
pub mod builder;
pub mod catalog;
pub mod explain;
pub mod rewrite;
pub mod session;

pub use builder::{build_logical_plan, PlanBuilder, ProjectionOutput};
pub use catalog::{Catalog, MemoryCatalog, ResultField};
pub use explain::{explain, explain_json};
pub use rewrite::{AggMapper, DefaultRewriter, ExprRewriter, Rewritten};
pub use session::BuildSession;
