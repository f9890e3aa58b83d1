use relplan_core::error::{Error, Result};
use relplan_core::expr::{funcs, Expression, ScalarFunction};
use relplan_core::id::OperatorKind;
use relplan_core::plan::{JoinType, Plan, PlanKind};
use relplan_core::schema::Schema;
use relplan_core::types::FieldType;

use crate::ast::{Join, JoinKind};

use super::PlanBuilder;

/// ON-clause conjuncts sorted by where they can be evaluated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnConditions {
    /// `left_col = right_col`, left operand always from the left input.
    pub eq: Vec<ScalarFunction>,
    pub left: Vec<Expression>,
    pub right: Vec<Expression>,
    pub other: Vec<Expression>,
}

fn column_pair(f: &ScalarFunction) -> Option<(&Expression, &Expression)> {
    match f.args.as_slice() {
        [l, r] if l.as_column().is_some() && r.as_column().is_some() => Some((l, r)),
        _ => None,
    }
}

/// Classify already resolved conjuncts against the two join inputs.
pub fn classify_on_conditions(conds: Vec<Expression>, left: &Schema, right: &Schema) -> OnConditions {
    let in_schema = |s: &Schema, e: &Expression| e.as_column().is_some_and(|c| s.contains(c));
    let mut out = OnConditions::default();
    for cond in conds {
        if let Expression::ScalarFunction(f) = &cond {
            if f.is(funcs::EQ) {
                if let Some((l, r)) = column_pair(f) {
                    if in_schema(left, l) && in_schema(right, r) {
                        out.eq.push(f.clone());
                        continue;
                    }
                    if in_schema(left, r) && in_schema(right, l) {
                        out.eq.push(ScalarFunction::new(
                            funcs::EQ,
                            vec![r.clone(), l.clone()],
                            FieldType::boolean(),
                        ));
                        continue;
                    }
                }
            }
        }

        let (cols, _) = cond.extract_columns();
        let mut all_left = true;
        let mut all_right = true;
        for col in cols {
            if left.contains(col) {
                all_right = false;
            } else {
                all_left = false;
            }
        }
        if all_right {
            out.right.push(cond);
        } else if all_left {
            out.left.push(cond);
        } else {
            out.other.push(cond);
        }
    }
    out
}

impl PlanBuilder<'_> {
    pub fn build_join(&mut self, join: &Join) -> Result<Plan> {
        let Some(right) = &join.right else {
            return self.build_result_set_node(&join.left);
        };
        let left = self.build_result_set_node(&join.left)?;
        let right = self.build_result_set_node(right)?;

        self.step(|b| {
            let id = b.alloc_id(OperatorKind::Join);
            let join_type = match join.kind {
                JoinKind::Left => JoinType::LeftOuter,
                JoinKind::Right => JoinType::RightOuter,
                JoinKind::Cross => JoinType::Inner,
            };
            let schema = left.schema.concat(&right.schema);

            let mut conds = OnConditions::default();
            if let Some(on) = &join.on {
                let scratch = Plan::leaf(id, PlanKind::Join {
                    join_type,
                    eq_conditions: Vec::new(),
                    left_conditions: Vec::new(),
                    right_conditions: Vec::new(),
                    other_conditions: Vec::new(),
                }, schema.clone());
                let rw = b.rewrite(on, scratch, None)?;
                if rw.plan.id != id {
                    return Err(Error::UnsupportedConstruct(
                        "ON condition doesn't support subqueries yet".into(),
                    ));
                }
                if rw.correlated {
                    return Err(Error::UnsupportedConstruct(
                        "correlated ON condition is not supported".into(),
                    ));
                }
                conds = classify_on_conditions(rw.expr.split_cnf(), &left.schema, &right.schema);
            }

            #[cfg(feature = "tracing")]
            tracing::trace!(
                %id,
                ?join_type,
                eq = conds.eq.len(),
                left = conds.left.len(),
                right = conds.right.len(),
                other = conds.other.len(),
                "join conditions classified"
            );

            Ok(Plan::with_children(
                id,
                PlanKind::Join {
                    join_type,
                    eq_conditions: conds.eq,
                    left_conditions: conds.left,
                    right_conditions: conds.right,
                    other_conditions: conds.other,
                },
                vec![left, right],
                schema,
            ))
        })
    }
}
