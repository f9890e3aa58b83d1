//! Aggregate extraction, GROUP BY resolution and placeholder wiring.


use relplan_core::expr::{AggFunc, Expression};
use relplan_core::id::OperatorKind;
use relplan_core::plan::PlanKind;
use relplan_planner::ast::{ExprNode, OrderItem, SelectField, SelectStmt};
use test_catalog::*;

fn sum(arg: &str) -> ExprNode {
    ExprNode::aggregate(AggFunc::Sum, vec![col(arg)])
}

#[test]
fn test_repeated_aggregate_is_computed_once() {
    let sel = SelectStmt::new(vec![SelectField::expr(sum("a"))])
        .from_table("t")
        .having(gt(sum("a"), ExprNode::int(1)))
        .order_by(vec![OrderItem::asc(sum("a"))]);
    let plan = build_select(sel).unwrap();

    assert_eq!(plan.operator_kind(), OperatorKind::Trim);
    assert_eq!(names(&plan), ["SUM(a)"]);

    let agg = plan.find(OperatorKind::Aggregation).unwrap();
    let PlanKind::Aggregation { agg_funcs, group_by } = &agg.kind else {
        panic!("expected aggregation");
    };
    assert_eq!(agg_funcs.len(), 1);
    assert_eq!(agg_funcs[0].func, AggFunc::Sum);
    assert!(group_by.is_empty());

    let proj = plan.find(OperatorKind::Projection).unwrap();
    let PlanKind::Projection { exprs } = &proj.kind else {
        panic!("expected projection");
    };
    let rendered: Vec<_> = exprs.iter().map(|e| e.to_string()).collect();
    assert_eq!(rendered, ["Aggregation_2_col_0"; 3]);
    assert_eq!(names(proj), ["SUM(a)", "sel_agg_1*", "sel_agg_2*"]);

    let having = plan.find(OperatorKind::Selection).unwrap();
    let PlanKind::Selection { conditions } = &having.kind else {
        panic!("expected selection");
    };
    assert_eq!(conditions[0].to_string(), "gt(sel_agg_1, 1)");

    let sort = plan.find(OperatorKind::Sort).unwrap();
    let PlanKind::Sort { by_items, .. } = &sort.kind else {
        panic!("expected sort");
    };
    assert_eq!(by_items[0].to_string(), "sel_agg_2");
}

#[test]
fn test_group_by_column_gets_firstrow_pass_through() {
    let sel = SelectStmt::new(vec![field("a"), SelectField::expr(sum("b"))])
        .from_table("t")
        .group_by(vec![col("a")]);
    let plan = build_select(sel).unwrap();

    assert_eq!(plan.operator_kind(), OperatorKind::Projection);
    assert_eq!(names(&plan), ["a", "SUM(b)"]);

    let agg = &plan.children[0];
    let PlanKind::Aggregation { agg_funcs, group_by } = &agg.kind else {
        panic!("expected aggregation under the projection");
    };
    assert_eq!(agg_funcs.len(), 2);
    assert_eq!(agg_funcs[1].func, AggFunc::FirstRow);
    assert_eq!(group_by.len(), 1);
    assert_eq!(names(agg), ["Aggregation_2_col_0*", "a"]);
    assert!(agg.schema.iter().all(|c| c.from_id == agg.id));
}

#[test]
fn test_group_by_alias_resolves_to_field_expression() {
    let sel = SelectStmt::new(vec![
        SelectField::expr(plus(col("a"), col("b"))).with_alias("k"),
        SelectField::expr(ExprNode::aggregate(AggFunc::Count, vec![])),
    ])
    .from_table("t")
    .group_by(vec![col("k")]);
    let plan = build_select(sel).unwrap();

    assert_eq!(names(&plan), ["k", "COUNT(*)"]);
    let agg = plan.find(OperatorKind::Aggregation).unwrap();
    let PlanKind::Aggregation { group_by, .. } = &agg.kind else {
        panic!("expected aggregation");
    };
    let Expression::ScalarFunction(f) = &group_by[0] else {
        panic!("group item should be the aliased expression, got {}", group_by[0]);
    };
    assert_eq!(f.name, "plus");
}

#[test]
fn test_ambiguous_group_by_alias_fails() {
    let sel = SelectStmt::new(vec![
        SelectField::expr(col("a")).with_alias("k"),
        SelectField::expr(col("b")).with_alias("k"),
    ])
    .from_table("t")
    .group_by(vec![col("k")]);
    let err = build_select(sel).unwrap_err();
    assert_eq!(err.kind(), "AmbiguousOrMissingColumn");
}

#[test]
fn test_nested_aggregate_fails() {
    let nested = ExprNode::aggregate(AggFunc::Max, vec![sum("a")]);
    let err = build_select(SelectStmt::new(vec![SelectField::expr(nested)]).from_table("t")).unwrap_err();
    assert_eq!(err.kind(), "ExtractionFailure");
}

#[test]
fn test_having_on_group_column() {
    let sel = SelectStmt::new(vec![SelectField::expr(sum("b"))])
        .from_table("t")
        .group_by(vec![col("a")])
        .having(gt(col("a"), ExprNode::int(0)));
    let plan = build_select(sel).unwrap();

    assert_eq!(plan.operator_kind(), OperatorKind::Trim);
    assert_eq!(names(&plan), ["SUM(b)"]);
    let having = &plan.children[0];
    assert_eq!(having.operator_kind(), OperatorKind::Selection);
    assert_eq!(names(having), ["SUM(b)", "a*"]);
}
