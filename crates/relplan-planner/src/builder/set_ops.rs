use relplan_core::error::{Error, Result};
use relplan_core::expr::ByItem;
use relplan_core::id::OperatorKind;
use relplan_core::plan::{LimitSpec, Plan, PlanKind};
use relplan_core::schema::Schema;

use crate::ast::{OrderItem, UnionStmt};
use crate::rewrite::AggMapper;

use super::PlanBuilder;

/// Widen `target` so every branch's values fit: longest display length wins,
/// and an unset or NULL type takes the branch's concrete type.
fn reconcile(target: &mut Schema, branch: &Schema) -> Result<()> {
    if branch.len() != target.len() {
        return Err(Error::ArityMismatch {
            expected: target.len(),
            found: branch.len(),
        });
    }
    for (col, other) in target.columns.iter_mut().zip(&branch.columns) {
        if other.ret_type.flen > col.ret_type.flen {
            col.ret_type.flen = other.ret_type.flen;
        }
        if col.ret_type.tp.is_placeholder() {
            col.ret_type.tp = other.ret_type.tp;
        }
    }
    Ok(())
}

impl PlanBuilder<'_> {
    pub fn build_union(&mut self, union: &UnionStmt) -> Result<Plan> {
        self.session.ensure_clean()?;
        let mut branches = Vec::with_capacity(union.selects.len());
        for sel in &union.selects {
            branches.push(self.build_select(sel)?);
        }

        let mut plan = self.step(|b| {
            let first = branches
                .first()
                .ok_or_else(|| Error::UnsupportedConstruct("UNION without branches".into()))?;
            let mut schema = first.schema.clone();
            for branch in &branches {
                reconcile(&mut schema, &branch.schema)?;
            }
            let id = b.alloc_id(OperatorKind::Union);
            schema.retag(id);
            for col in &mut schema.columns {
                col.auxiliary = false;
            }

            #[cfg(feature = "tracing")]
            tracing::trace!(%id, branches = branches.len(), width = schema.len(), "union reconciled");

            Ok(Plan::with_children(id, PlanKind::Union, branches, schema))
        })?;

        if union.distinct {
            plan = self.build_distinct(plan)?;
        }
        if !union.order_by.is_empty() {
            plan = self.build_sort(plan, &union.order_by, None)?;
        }
        if let Some(limit) = union.limit {
            plan = self.build_limit(plan, limit)?;
        }
        Ok(plan)
    }

    pub fn build_distinct(&mut self, input: Plan) -> Result<Plan> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::Distinct);
            let schema = input.schema.clone();
            Ok(Plan::with_children(id, PlanKind::Distinct, vec![input], schema))
        })
    }

    pub fn build_sort(
        &mut self,
        input: Plan,
        items: &[OrderItem],
        mapper: Option<&AggMapper>,
    ) -> Result<Plan> {
        self.step(|b| {
            let mut plan = input;
            let mut correlated = false;
            let mut by_items = Vec::with_capacity(items.len());
            for item in items {
                let rw = b.rewrite(&item.expr, plan, mapper)?;
                plan = rw.plan;
                correlated |= rw.correlated;
                by_items.push(ByItem {
                    expr: rw.expr,
                    desc: item.desc,
                });
            }
            let id = b.alloc_id(OperatorKind::Sort);
            let schema = plan.schema.clone();
            let mut sort = Plan::with_children(
                id,
                PlanKind::Sort {
                    by_items,
                    exec_limit: None,
                },
                vec![plan],
                schema,
            );
            sort.correlated |= correlated;
            Ok(sort)
        })
    }

    /// LIMIT over `input`; folded into a SORT directly below when enabled.
    pub fn build_limit(&mut self, input: Plan, limit: LimitSpec) -> Result<Plan> {
        self.step(|b| {
            let mut input = input;
            if b.config().fold_limit_into_sort {
                if let PlanKind::Sort { exec_limit, .. } = &mut input.kind {
                    *exec_limit = Some(limit);
                    return Ok(input);
                }
            }
            let id = b.alloc_id(OperatorKind::Limit);
            let schema = input.schema.clone();
            Ok(Plan::with_children(id, PlanKind::Limit(limit), vec![input], schema))
        })
    }

    /// Keep only the first `len` columns of `input`.
    pub fn build_trim(&mut self, input: Plan, len: usize) -> Result<Plan> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::Trim);
            let schema = input.schema.truncated(len);
            Ok(Plan::with_children(id, PlanKind::Trim, vec![input], schema))
        })
    }
}
