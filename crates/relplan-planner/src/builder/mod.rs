//! Recursive-descent logical plan builder.
//!
//! Every step takes the current plan by value and returns the plan the next
//! step should build on. Steps run through `PlanBuilder::step`, which refuses
//! to do any work once the session holds an error and records the first
//! failure it sees, so a failed build never mutates anything afterwards.
//!
//! Submodules, leaves first:
//! - `scan`: base tables and the dual table
//! - `result_set`: FROM-clause dispatch
//! - `join`: schema concat and ON-condition classification
//! - `selection`: WHERE / HAVING filters and row locks
//! - `projection`: field lists
//! - `aggregation`: aggregate extraction, GROUP BY, aggregation
//! - `set_ops`: UNION, DISTINCT, SORT, LIMIT, TRIM
//! - `subquery`: APPLY, EXISTS, MAXONEROW
//! - `replacer`: deferred HAVING / ORDER BY column resolution
//! - `select`: the SELECT pipeline tying the above together

mod aggregation;
mod join;
mod projection;
mod replacer;
mod result_set;
mod scan;
mod select;
mod selection;
mod set_ops;
mod subquery;

pub use aggregation::{has_aggregation, AggExtraction};
pub use join::{classify_on_conditions, OnConditions};
pub use projection::ProjectionOutput;

use relplan_core::config::PlannerConfig;
use relplan_core::error::{Error, Result};
use relplan_core::id::{OperatorKind, PlanId};
use relplan_core::plan::Plan;
use relplan_core::schema::Schema;

use crate::ast::{ExprNode, Statement};
use crate::catalog::Catalog;
use crate::rewrite::{AggMapper, DefaultRewriter, ExprRewriter, Rewritten};
use crate::session::BuildSession;

static DEFAULT_REWRITER: DefaultRewriter = DefaultRewriter;

pub struct PlanBuilder<'a> {
    session: BuildSession,
    catalog: &'a dyn Catalog,
    rewriter: &'a dyn ExprRewriter,
    /// Schemas of enclosing scopes, innermost last.
    outer_schemas: Vec<Schema>,
    depth: usize,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(catalog: &'a dyn Catalog, config: PlannerConfig) -> Self {
        Self {
            session: BuildSession::new(config),
            catalog,
            rewriter: &DEFAULT_REWRITER,
            outer_schemas: Vec::new(),
            depth: 0,
        }
    }

    /// Replace the expression-rewrite collaborator.
    pub fn with_rewriter(mut self, rewriter: &'a dyn ExprRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn session(&self) -> &BuildSession {
        &self.session
    }

    pub fn config(&self) -> &PlannerConfig {
        self.session.config()
    }

    /// Record a failure on the session, as any failing step would.
    pub fn fail(&mut self, e: Error) -> Error {
        self.session.fail(e)
    }

    pub fn alloc_id(&mut self, kind: OperatorKind) -> PlanId {
        self.session.alloc_id(kind)
    }

    pub fn outer_schemas(&self) -> &[Schema] {
        &self.outer_schemas
    }

    /// Run one builder step under the sticky-error discipline.
    pub(crate) fn step<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.session.ensure_clean()?;
        let out = f(self);
        self.session.record(out)
    }

    /// Resolve one expression against `plan` through the rewrite collaborator.
    pub fn rewrite(
        &mut self,
        expr: &ExprNode,
        plan: Plan,
        mapper: Option<&AggMapper>,
    ) -> Result<Rewritten> {
        self.session.ensure_clean()?;
        let rewriter = self.rewriter;
        let out = rewriter.rewrite(self, expr, plan, mapper);
        self.session.record(out)
    }

    /// Build the whole statement. Consumes the builder: a session is never
    /// reused for a second statement.
    pub fn build(mut self, stmt: &Statement) -> Result<Plan> {
        let plan = match stmt {
            Statement::Select(sel) => self.build_select(sel),
            Statement::Union(union) => self.build_union(union),
        }?;
        #[cfg(feature = "tracing")]
        tracing::trace!(
            root = %plan.id,
            operators = self.session.allocated(),
            width = plan.schema.len(),
            "statement built"
        );
        Ok(plan)
    }

    /// Enter one derived-table or sub-select level, bounded by
    /// `max_nesting_depth`. Joins and plain table sources do not count.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= self.config().max_nesting_depth {
            let limit = self.config().max_nesting_depth;
            return Err(self.fail(Error::UnsupportedConstruct(format!(
                "statement nesting exceeds {limit} levels"
            ))));
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }
}

/// Build `stmt` in a fresh session and hand back the plan tree.
pub fn build_logical_plan(
    stmt: &Statement,
    catalog: &dyn Catalog,
    config: PlannerConfig,
) -> Result<Plan> {
    if !config.use_new_planner {
        return Err(Error::Config("the logical plan builder is disabled".into()));
    }
    PlanBuilder::new(catalog, config).build(stmt)
}
