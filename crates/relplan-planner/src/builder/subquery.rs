//! Operators that lower a sub-select into the enclosing plan.

use relplan_core::error::Result;
use relplan_core::id::OperatorKind;
use relplan_core::plan::{Plan, PlanKind};
use relplan_core::schema::{Column, Schema};
use relplan_core::types::FieldType;

use crate::ast::ResultSetNode;

use super::PlanBuilder;

impl PlanBuilder<'_> {
    /// Build a sub-select with `outer` visible as the innermost enclosing scope.
    pub fn build_subquery(&mut self, query: &ResultSetNode, mut outer: Schema) -> Result<Plan> {
        self.session.ensure_clean()?;
        outer.mark_correlated();
        self.outer_schemas.push(outer);
        let out = self.nested(|b| b.build_result_set_node(query));
        self.outer_schemas.pop();
        out
    }

    /// `outer` APPLY `inner`: outer columns followed by the inner columns,
    /// all of the latter auxiliary.
    pub fn build_apply(&mut self, outer: Plan, inner: Plan) -> Result<Plan> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::Apply);
            let mut outer_schema = outer.schema.clone();
            outer_schema.mark_correlated();

            let mut inner_cols = inner.schema.clone();
            inner_cols.mark_auxiliary();
            let schema = outer.schema.concat(&inner_cols);

            let correlated = outer.correlated;
            let mut plan = Plan::with_children(
                id,
                PlanKind::Apply {
                    inner: Box::new(inner),
                    outer_schema,
                },
                vec![outer],
                schema,
            );
            plan.correlated = correlated;
            Ok(plan)
        })
    }

    /// Replace the schema of `input` with a single boolean column.
    pub fn build_exists(&mut self, input: Plan) -> Result<Plan> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::Exists);
            let schema = Schema::new(vec![Column::new(id, "exists_col", FieldType::boolean())]);
            Ok(Plan::with_children(id, PlanKind::Exists, vec![input], schema))
        })
    }

    /// Mark `input` as producing at most one row. Not checked here.
    pub fn build_max_one_row(&mut self, input: Plan) -> Result<Plan> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::MaxOneRow);
            let schema = input.schema.clone();
            Ok(Plan::with_children(id, PlanKind::MaxOneRow, vec![input], schema))
        })
    }
}
