//! Aggregate discovery and the aggregation operator.
//!
//! Aggregate calls stay in the AST where they were written; extraction stamps
//! each call with a node id and records, per clause, which output position
//! holds its value. HAVING and ORDER BY calls are also appended to the field
//! list as auxiliary `sel_agg_N` fields so the projection carries them.

use relplan_core::error::{Error, Result};
use relplan_core::expr::{AggFunc, AggregateFunction, Expression};
use relplan_core::id::OperatorKind;
use relplan_core::plan::{Plan, PlanKind};
use relplan_core::schema::{Column, ColumnName, Schema};

use crate::ast::{AggregateFuncExpr, ExprNode, FieldExpr, SelectField, SelectStmt, Visit};
use crate::rewrite::AggMapper;
use crate::session::BuildSession;

use super::PlanBuilder;

/// Result of aggregate extraction over one SELECT.
#[derive(Debug, Clone, Default)]
pub struct AggExtraction {
    /// Distinct aggregate calls, in output-column order.
    pub agg_funcs: Vec<AggregateFuncExpr>,
    /// HAVING call → field position of its auxiliary field.
    pub having_map: AggMapper,
    /// ORDER BY call → field position of its auxiliary field.
    pub order_map: AggMapper,
    /// Every stamped call → aggregation output column.
    pub total_map: AggMapper,
}

/// GROUP BY present, or an aggregate call in the fields, HAVING or ORDER BY.
pub fn has_aggregation(sel: &SelectStmt) -> bool {
    !sel.group_by.is_empty()
        || sel
            .fields
            .iter()
            .filter_map(SelectField::expr_node)
            .any(ExprNode::contains_aggregate)
        || sel.having.as_ref().is_some_and(ExprNode::contains_aggregate)
        || sel.order_by.iter().any(|o| o.expr.contains_aggregate())
}

fn stamp_aggregates(
    session: &mut BuildSession,
    expr: &mut ExprNode,
    found: &mut Vec<AggregateFuncExpr>,
) -> Result<()> {
    expr.walk_mut(&mut |node| {
        let ExprNode::Aggregate(agg) = node else {
            return Ok(Visit::Continue);
        };
        if agg.args.iter().any(ExprNode::contains_aggregate) {
            return Err(Error::ExtractionFailure(format!(
                "aggregate calls cannot be nested inside {}",
                agg.func.name().to_ascii_uppercase()
            )));
        }
        agg.node_id = Some(session.alloc_agg_node_id());
        found.push(agg.clone());
        Ok(Visit::Skip)
    })
}

fn append_auxiliary(fields: &mut Vec<SelectField>, agg: &AggregateFuncExpr, map: &mut AggMapper) {
    let pos = fields.len();
    if let Some(id) = agg.node_id {
        map.insert(id, pos);
    }
    let mut field = SelectField::expr(ExprNode::Aggregate(agg.clone())).with_alias(format!("sel_agg_{pos}"));
    field.auxiliary = true;
    fields.push(field);
}

/// Column references outside any aggregate call.
fn plain_column_refs(expr: &ExprNode) -> Vec<&ColumnName> {
    let mut out = Vec::new();
    expr.walk(&mut |n| match n {
        ExprNode::Column(c) => {
            out.push(c);
            Visit::Continue
        }
        ExprNode::Aggregate(_) => Visit::Skip,
        _ => Visit::Continue,
    });
    out
}

fn push_unique(out: &mut Vec<Column>, col: &Column) {
    if !col.correlated && !out.iter().any(|c| c.same_source(col)) {
        out.push(col.clone());
    }
}

/// Input columns the statement reads outside aggregates; each gets a
/// `firstrow` pass-through so it stays addressable above the aggregation.
fn pass_through_columns(input: &Schema, group_by: &[Expression], sel: &SelectStmt) -> Result<Vec<Column>> {
    let mut out = Vec::new();
    for col in group_by.iter().filter_map(Expression::as_column) {
        push_unique(&mut out, col);
    }
    for field in &sel.fields {
        match &field.field {
            FieldExpr::Wildcard(w) => {
                for col in input.iter().filter(|c| {
                    !c.auxiliary
                        && (w.db.is_empty() || w.db.eq_ignore_ascii_case(&c.db_name))
                        && (w.table.is_empty() || w.table.eq_ignore_ascii_case(&c.tbl_name))
                }) {
                    push_unique(&mut out, col);
                }
            }
            FieldExpr::Expr(e) => {
                for name in plain_column_refs(e) {
                    if let Some(col) = input.find_column(name)? {
                        push_unique(&mut out, col);
                    }
                }
            }
        }
    }
    // HAVING and ORDER BY may name output aliases; misses are not errors here.
    let trailing = sel.having.iter().chain(sel.order_by.iter().map(|o| &o.expr));
    for e in trailing {
        for name in plain_column_refs(e) {
            if let Ok(Some(col)) = input.find_column(name) {
                push_unique(&mut out, col);
            }
        }
    }
    Ok(out)
}

/// Replace bare GROUP BY names that miss the input schema with the
/// expression of the field carrying that alias.
fn substitute_aliases(item: ExprNode, schema: &Schema, fields: &[SelectField]) -> Result<ExprNode> {
    item.transform_up(&mut |node| {
        let name = match &node {
            ExprNode::Column(name) if name.is_bare() => name.clone(),
            _ => return Ok(node),
        };
        if schema.find_column(&name)?.is_some() {
            return Ok(node);
        }
        let mut candidates = fields
            .iter()
            .filter(|f| !f.auxiliary)
            .filter(|f| f.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(&name.name)))
            .filter_map(SelectField::expr_node);
        match (candidates.next(), candidates.next()) {
            (Some(expr), None) => Ok(expr.clone()),
            (Some(_), Some(_)) => Err(Error::AmbiguousOrMissingColumn(format!(
                "Column '{}' in group statement is ambiguous",
                name.name
            ))),
            (None, _) => Ok(node),
        }
    })
}

impl PlanBuilder<'_> {
    /// Resolve GROUP BY items against `input`, honoring output aliases.
    /// Returns the possibly grafted plan, the items and their correlation.
    pub fn rewrite_group_by(
        &mut self,
        input: Plan,
        sel: &SelectStmt,
    ) -> Result<(Plan, Vec<Expression>, bool)> {
        self.step(|b| {
            let mut plan = input;
            let mut items = Vec::with_capacity(sel.group_by.len());
            let mut correlated = false;
            for item in &sel.group_by {
                let item = substitute_aliases(item.clone(), &plan.schema, &sel.fields)?;
                let rw = b.rewrite(&item, plan, None)?;
                plan = rw.plan;
                correlated |= rw.correlated;
                items.push(rw.expr);
            }
            Ok((plan, items, correlated))
        })
    }

    /// Stamp every aggregate call in HAVING, ORDER BY and the user's fields,
    /// in that order, and append the auxiliary fields.
    pub fn extract_aggregates(&mut self, sel: &mut SelectStmt) -> Result<AggExtraction> {
        self.step(|b| {
            let user_fields = sel.fields.len();
            let mut out = AggExtraction::default();

            let mut having_aggs = Vec::new();
            if let Some(having) = sel.having.as_mut() {
                stamp_aggregates(&mut b.session, having, &mut having_aggs)?;
            }
            for agg in &having_aggs {
                append_auxiliary(&mut sel.fields, agg, &mut out.having_map);
            }

            let mut order_aggs = Vec::new();
            for item in sel.order_by.iter_mut() {
                stamp_aggregates(&mut b.session, &mut item.expr, &mut order_aggs)?;
            }
            for agg in &order_aggs {
                append_auxiliary(&mut sel.fields, agg, &mut out.order_map);
            }

            let mut select_aggs = Vec::new();
            for field in sel.fields[..user_fields].iter_mut() {
                if let FieldExpr::Expr(e) = &mut field.field {
                    stamp_aggregates(&mut b.session, e, &mut select_aggs)?;
                }
            }

            for agg in select_aggs.iter().chain(&having_aggs).chain(&order_aggs) {
                let pos = match out.agg_funcs.iter().position(|a| a.same_call(agg)) {
                    Some(pos) => pos,
                    None => {
                        out.agg_funcs.push(agg.clone());
                        out.agg_funcs.len() - 1
                    }
                };
                if let Some(id) = agg.node_id {
                    out.total_map.insert(id, pos);
                }
            }
            Ok(out)
        })
    }

    /// Aggregation over `input`: one column per distinct aggregate call, then
    /// one `firstrow` column per pass-through input column.
    pub fn build_aggregation(
        &mut self,
        input: Plan,
        agg_funcs: &[AggregateFuncExpr],
        group_by: Vec<Expression>,
        group_by_correlated: bool,
        sel: &SelectStmt,
    ) -> Result<Plan> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::Aggregation);
            let pass_through = pass_through_columns(&input.schema, &group_by, sel)?;
            let mut plan = input;
            let mut correlated = group_by_correlated;
            let mut funcs = Vec::with_capacity(agg_funcs.len() + pass_through.len());
            let mut columns = Vec::with_capacity(funcs.capacity());

            for (i, agg) in agg_funcs.iter().enumerate() {
                let mut args = Vec::with_capacity(agg.args.len());
                for arg in &agg.args {
                    let rw = b.rewrite(arg, plan, None)?;
                    plan = rw.plan;
                    correlated |= rw.correlated;
                    args.push(rw.expr);
                }
                let func = AggregateFunction::new(agg.func, args, agg.distinct);
                let mut col = Column::new(id, format!("{id}_col_{i}"), func.ret_type());
                col.auxiliary = true;
                columns.push(col);
                funcs.push(func);
            }
            for src in pass_through {
                columns.push(
                    Column::new(id, src.col_name.clone(), src.ret_type).with_table("", src.tbl_name.clone()),
                );
                funcs.push(AggregateFunction::new(AggFunc::FirstRow, vec![Expression::Column(src)], false));
            }

            let mut agg = Plan::with_children(
                id,
                PlanKind::Aggregation {
                    agg_funcs: funcs,
                    group_by,
                },
                vec![plan],
                Schema::new(columns),
            );
            agg.correlated |= correlated;
            Ok(agg)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::OrderItem;
    use relplan_core::config::PlannerConfig;

    use crate::catalog::MemoryCatalog;

    fn sum_a() -> ExprNode {
        ExprNode::aggregate(AggFunc::Sum, vec![ExprNode::column("a")])
    }

    #[test]
    fn detects_aggregation_sources() {
        let plain = SelectStmt::new(vec![SelectField::expr(ExprNode::column("a"))]).from_table("t");
        assert!(!has_aggregation(&plain));
        assert!(has_aggregation(&plain.clone().group_by(vec![ExprNode::column("a")])));
        assert!(has_aggregation(&plain.clone().order_by(vec![OrderItem::asc(sum_a())])));
    }

    #[test]
    fn identical_calls_share_one_column() {
        let cat = MemoryCatalog::new("test");
        let mut b = PlanBuilder::new(&cat, PlannerConfig::default());
        let mut sel = SelectStmt::new(vec![SelectField::expr(sum_a())])
            .from_table("t")
            .having(ExprNode::binary(crate::ast::BinaryOp::Gt, sum_a(), ExprNode::int(1)))
            .order_by(vec![OrderItem::asc(sum_a())]);

        let ex = b.extract_aggregates(&mut sel).unwrap();
        assert_eq!(ex.agg_funcs.len(), 1);
        assert_eq!(ex.total_map.len(), 3);
        assert!(ex.total_map.values().all(|p| *p == 0));
        assert_eq!(ex.having_map.values().copied().collect::<Vec<_>>(), [1usize]);
        assert_eq!(ex.order_map.values().copied().collect::<Vec<_>>(), [2usize]);
        assert_eq!(sel.fields.len(), 3);
        assert!(sel.fields[1].auxiliary && sel.fields[2].auxiliary);
        assert_eq!(sel.fields[2].alias.as_deref(), Some("sel_agg_2"));
    }

    #[test]
    fn nested_aggregate_fails_extraction() {
        let cat = MemoryCatalog::new("test");
        let mut b = PlanBuilder::new(&cat, PlannerConfig::default());
        let nested = ExprNode::aggregate(AggFunc::Max, vec![sum_a()]);
        let mut sel = SelectStmt::new(vec![SelectField::expr(nested)]).from_table("t");
        let err = b.extract_aggregates(&mut sel).unwrap_err();
        assert!(matches!(err, Error::ExtractionFailure(_)));
        assert!(b.session().has_failed());
    }

    #[test]
    fn duplicate_group_by_alias_is_ambiguous() {
        let fields = vec![
            SelectField::expr(ExprNode::column("a")).with_alias("k"),
            SelectField::expr(ExprNode::column("b")).with_alias("k"),
        ];
        let err = substitute_aliases(ExprNode::column("k"), &Schema::default(), &fields).unwrap_err();
        assert_eq!(err.kind(), "AmbiguousOrMissingColumn");

        let out = substitute_aliases(ExprNode::column("k"), &Schema::default(), &fields[..1]).unwrap();
        assert_eq!(out, ExprNode::column("a"));
    }
}
