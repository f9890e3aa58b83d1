use relplan_core::error::{Error, Result};
use relplan_core::expr::Expression;
use relplan_core::id::OperatorKind;
use relplan_core::plan::{Plan, PlanKind};
use relplan_core::schema::{Column, Schema};

use crate::ast::{FieldExpr, SelectField, WildCardField};
use crate::rewrite::AggMapper;

use super::PlanBuilder;

#[derive(Debug, Clone)]
pub struct ProjectionOutput {
    pub plan: Plan,
    /// Output columns the user asked for.
    pub visible_len: usize,
    /// Schema position of the first column of each field.
    pub field_offsets: Vec<usize>,
}

fn wildcard_matches(w: &WildCardField, col: &Column) -> bool {
    (w.db.is_empty() || w.db.eq_ignore_ascii_case(&col.db_name))
        && (w.table.is_empty() || w.table.eq_ignore_ascii_case(&col.tbl_name))
}

impl PlanBuilder<'_> {
    pub fn build_projection(
        &mut self,
        input: Plan,
        fields: &[SelectField],
        mapper: Option<&AggMapper>,
    ) -> Result<ProjectionOutput> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::Projection);
            let mut plan = input;
            let mut correlated = false;
            let mut exprs = Vec::with_capacity(fields.len());
            let mut columns = Vec::with_capacity(fields.len());
            let mut field_offsets = Vec::with_capacity(fields.len());
            let mut visible_len = 0;

            for field in fields {
                field_offsets.push(columns.len());
                match &field.field {
                    FieldExpr::Wildcard(w) => {
                        let before = columns.len();
                        for col in plan.schema.iter().filter(|c| !c.auxiliary && wildcard_matches(w, c)) {
                            exprs.push(Expression::Column(col.clone()));
                            let mut out = col.clone();
                            out.db_name.clear();
                            out.correlated = false;
                            columns.push(out);
                            if !field.auxiliary {
                                visible_len += 1;
                            }
                        }
                        if columns.len() == before && !w.table.is_empty() {
                            return Err(Error::AmbiguousOrMissingColumn(format!(
                                "Unknown table '{}'",
                                w.table
                            )));
                        }
                    }
                    FieldExpr::Expr(expr) => {
                        let rw = b.rewrite(expr, plan, mapper)?;
                        plan = rw.plan;
                        correlated |= rw.correlated;
                        let ret_type = rw.expr.ret_type();
                        let mut out = match (&field.alias, rw.expr.as_column()) {
                            (Some(alias), _) => Column::new(id, alias.clone(), ret_type),
                            (None, Some(src)) if expr.as_column().is_some() => {
                                Column::new(src.from_id, src.col_name.clone(), ret_type)
                                    .with_table("", src.tbl_name.clone())
                            }
                            _ => Column::new(id, field.source_text(), ret_type),
                        };
                        out.auxiliary = field.auxiliary;
                        exprs.push(rw.expr);
                        columns.push(out);
                        if !field.auxiliary {
                            visible_len += 1;
                        }
                    }
                }
            }

            let mut plan = Plan::with_children(
                id,
                PlanKind::Projection { exprs },
                vec![plan],
                Schema::new(columns),
            );
            plan.correlated |= correlated;
            Ok(ProjectionOutput {
                plan,
                visible_len,
                field_offsets,
            })
        })
    }
}
