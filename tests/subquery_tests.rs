//! Sub-selects in expressions: APPLY grafting and correlation.


use relplan_core::expr::Expression;
use relplan_core::id::OperatorKind;
use relplan_core::plan::{Plan, PlanKind};
use relplan_planner::ast::{ExprNode, SelectField, SelectStmt};
use test_catalog::*;

fn apply_inner(plan: &Plan) -> &Plan {
    let apply = plan.find(OperatorKind::Apply).expect("plan has an apply");
    let PlanKind::Apply { inner, .. } = &apply.kind else {
        panic!("expected apply");
    };
    inner
}

fn where_condition(plan: &Plan) -> &Expression {
    let sel = plan.find(OperatorKind::Selection).expect("plan has a selection");
    let PlanKind::Selection { conditions } = &sel.kind else {
        panic!("expected selection");
    };
    &conditions[0]
}

#[test]
fn test_scalar_subquery_is_bounded_to_one_row() {
    let sub = ExprNode::subquery(select(&["d"]).from_table("t2"));
    let sel = SelectStmt::new(vec![field("a"), SelectField::expr(sub)]).from_table("t1");
    let plan = build_select(sel).unwrap();

    assert_eq!(names(&plan), ["a", "(subquery)"]);
    assert_eq!(plan.children[0].operator_kind(), OperatorKind::Apply);
    let inner = apply_inner(&plan);
    assert_eq!(inner.operator_kind(), OperatorKind::MaxOneRow);
    assert!(!inner.correlated);

    let apply = &plan.children[0];
    assert_eq!(names(apply), ["a", "c", "d*"]);
}

#[test]
fn test_correlated_exists() {
    let inner = select(&["b"]).from_table("t2").filter(ExprNode::eq(col("t2.b"), col("t1.a")));
    let plan = build_select(select(&["a"]).from_table("t1").filter(ExprNode::exists(inner))).unwrap();

    let inner = apply_inner(&plan);
    assert_eq!(inner.operator_kind(), OperatorKind::Exists);
    assert_eq!(names(inner), ["exists_col"]);
    assert!(inner.correlated);
    assert!(!plan.correlated);
    assert!(!plan.find(OperatorKind::Apply).unwrap().correlated);
}

#[test]
fn test_not_exists_negates_the_marker() {
    let inner = select(&["b"]).from_table("t2");
    let cond = ExprNode::Exists {
        query: Box::new(inner.into()),
        negated: true,
    };
    let plan = build_select(select(&["a"]).from_table("t1").filter(cond)).unwrap();
    let Expression::ScalarFunction(f) = where_condition(&plan) else {
        panic!("expected a function");
    };
    assert_eq!(f.name, "not");
}

#[test]
fn test_in_subquery_compares_against_any() {
    let cond = ExprNode::in_subquery(col("a"), select(&["b"]).from_table("t2"));
    let plan = build_select(select(&["a"]).from_table("t1").filter(cond)).unwrap();
    let Expression::ScalarFunction(f) = where_condition(&plan) else {
        panic!("expected a function");
    };
    assert_eq!(f.name, "eq_any");
    assert_eq!(f.args.len(), 2);
    // The sub-select's column stays hidden above the apply.
    assert_eq!(names(&plan), ["a"]);
}

#[test]
fn test_scalar_subquery_must_yield_one_column() {
    let sub = ExprNode::subquery(select(&["b", "d"]).from_table("t2"));
    let err = build_select(SelectStmt::new(vec![SelectField::expr(sub)]).from_table("t1")).unwrap_err();
    assert_eq!(err.kind(), "UnsupportedConstruct");
}

#[test]
fn test_unknown_outer_reference_fails() {
    let inner = select(&["b"]).from_table("t2").filter(ExprNode::eq(col("t2.b"), col("zz.a")));
    let err = build_select(select(&["a"]).from_table("t1").filter(ExprNode::exists(inner))).unwrap_err();
    assert_eq!(err.kind(), "AmbiguousOrMissingColumn");
}
