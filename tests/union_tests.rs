//! UNION schema reconciliation and the operators layered above it.


use relplan_core::id::OperatorKind;
use relplan_core::plan::{LimitSpec, PlanKind};
use relplan_core::types::{DataType, FieldType};
use relplan_core::Error;
use relplan_planner::ast::{ExprNode, OrderItem, SelectField, SelectStmt, UnionStmt};
use test_catalog::*;

fn literal(e: ExprNode) -> SelectStmt {
    SelectStmt::new(vec![SelectField::expr(e)])
}

#[test]
fn test_branch_width_mismatch() {
    let union = UnionStmt::new(vec![select(&["a"]).from_table("t"), select(&["a", "b"]).from_table("t")]);
    let err = build_union(union).unwrap_err();
    assert_eq!(err, Error::ArityMismatch { expected: 1, found: 2 });
}

#[test]
fn test_null_branch_takes_concrete_type() {
    let union = UnionStmt::new(vec![literal(ExprNode::null()), literal(ExprNode::string("abc"))]);
    let plan = build_union(union).unwrap();

    assert_eq!(plan.operator_kind(), OperatorKind::Union);
    assert_eq!(plan.schema.columns[0].ret_type, FieldType::new(DataType::Varchar, 3));
    assert_eq!(plan.schema.columns[0].from_id, plan.id);
    // Branches keep their own schemas.
    assert_eq!(plan.children[0].schema.columns[0].ret_type.tp, DataType::Null);
}

#[test]
fn test_union_drops_hidden_branch_columns() {
    let first = select(&["a"]).from_table("t1").order_by(vec![OrderItem::asc(col("c"))]);
    let union = UnionStmt::new(vec![first, select(&["b"]).from_table("t2")]);
    let plan = build_union(union).unwrap();
    assert_eq!(names(&plan), ["a"]);
    assert_eq!(plan.children[0].operator_kind(), OperatorKind::Trim);
}

#[test]
fn test_distinct_order_and_limit_over_union() {
    let mut union = UnionStmt::new(vec![select(&["a"]).from_table("t1"), select(&["b"]).from_table("t2")]);
    union.distinct = true;
    union.order_by = vec![OrderItem::desc(col("a"))];
    union.limit = Some(LimitSpec { offset: 0, count: 5 });
    let plan = build_union(union).unwrap();

    let PlanKind::Sort { exec_limit, by_items } = &plan.kind else {
        panic!("expected sort at the root, got {:?}", plan.operator_kind());
    };
    assert_eq!(*exec_limit, Some(LimitSpec { offset: 0, count: 5 }));
    assert!(by_items[0].desc);
    assert_eq!(plan.children[0].operator_kind(), OperatorKind::Distinct);
    assert_eq!(plan.children[0].children[0].operator_kind(), OperatorKind::Union);
}
