use relplan_core::error::Result;
use relplan_core::id::OperatorKind;
use relplan_core::plan::{LockType, Plan, PlanKind};

use crate::ast::ExprNode;
use crate::rewrite::AggMapper;

use super::PlanBuilder;

impl PlanBuilder<'_> {
    /// Filter `input` by the conjuncts of `cond`. The schema is unchanged.
    pub fn build_selection(
        &mut self,
        input: Plan,
        cond: &ExprNode,
        mapper: Option<&AggMapper>,
    ) -> Result<Plan> {
        self.step(|b| {
            let conjuncts = cond.split_conjuncts();
            let mut plan = input;
            let mut correlated = false;
            let mut conditions = Vec::with_capacity(conjuncts.len());
            for c in conjuncts {
                let rw = b.rewrite(c, plan, mapper)?;
                plan = rw.plan;
                correlated |= rw.correlated;
                conditions.push(rw.expr);
            }
            let id = b.alloc_id(OperatorKind::Selection);
            let schema = plan.schema.clone();
            let mut sel = Plan::with_children(id, PlanKind::Selection { conditions }, vec![plan], schema);
            sel.correlated |= correlated;
            Ok(sel)
        })
    }

    pub fn build_select_lock(&mut self, input: Plan, lock: LockType) -> Result<Plan> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::SelectLock);
            let schema = input.schema.clone();
            Ok(Plan::with_children(id, PlanKind::SelectLock { lock }, vec![input], schema))
        })
    }
}
