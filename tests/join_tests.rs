//! Join construction and ON-condition classification.


use relplan_core::id::OperatorKind;
use relplan_core::plan::{JoinType, Plan, PlanKind};
use relplan_planner::ast::{ExprNode, JoinKind, ResultSetNode, SelectField, SelectStmt};
use relplan_planner::explain;
use test_catalog::*;

fn t1_join_t2(kind: JoinKind, on: Option<ExprNode>) -> ResultSetNode {
    ResultSetNode::join(ResultSetNode::table("t1"), ResultSetNode::table("t2"), kind, on)
}

fn join_of(plan: &Plan) -> &Plan {
    plan.find(OperatorKind::Join).expect("plan has a join")
}

#[test]
fn test_on_conditions_are_classified() {
    let on = ExprNode::and(
        ExprNode::and(
            ExprNode::eq(col("t1.a"), col("t2.b")),
            gt(col("t1.c"), ExprNode::int(1)),
        ),
        lt(col("t2.d"), ExprNode::int(5)),
    );
    let plan = build_select(select(&["t1.a"]).from(t1_join_t2(JoinKind::Cross, Some(on)))).unwrap();
    let PlanKind::Join {
        join_type,
        eq_conditions,
        left_conditions,
        right_conditions,
        other_conditions,
    } = &join_of(&plan).kind
    else {
        panic!("expected join");
    };
    assert_eq!(*join_type, JoinType::Inner);
    assert_eq!(eq_conditions.len(), 1);
    assert_eq!(left_conditions.len(), 1);
    assert_eq!(right_conditions.len(), 1);
    assert!(other_conditions.is_empty());
    assert_eq!(left_conditions[0].to_string(), "gt(test.t1.c, 1)");
    assert_eq!(right_conditions[0].to_string(), "lt(test.t2.d, 5)");
}

#[test]
fn test_explain_lists_join_conditions() {
    let on = ExprNode::and(
        ExprNode::eq(col("t1.a"), col("t2.b")),
        lt(col("t2.d"), ExprNode::int(5)),
    );
    let plan = build_select(select(&["t1.a"]).from(t1_join_t2(JoinKind::Cross, Some(on)))).unwrap();
    let text = explain(&plan);
    let line = text.lines().find(|l| l.trim_start().starts_with("Join_")).unwrap();
    assert!(line.contains("right=[lt(test.t2.d, 5)]"), "{line}");
    assert!(line.contains("type=Inner"), "{line}");
    assert!(!line.contains("left="), "{line}");
}

#[test]
fn test_reversed_equality_puts_left_column_first() {
    let on = ExprNode::and(
        ExprNode::eq(col("t2.b"), col("t1.a")),
        gt(col("t1.c"), col("t2.d")),
    );
    let plan = build_select(select(&["t1.a"]).from(t1_join_t2(JoinKind::Cross, Some(on)))).unwrap();
    let PlanKind::Join {
        eq_conditions,
        other_conditions,
        ..
    } = &join_of(&plan).kind
    else {
        panic!("expected join");
    };
    let left = eq_conditions[0].args[0].as_column().unwrap();
    assert_eq!(left.tbl_name, "t1");
    assert_eq!(other_conditions.len(), 1);
}

#[test]
fn test_outer_join_schema_is_left_then_right() {
    for (kind, expected) in [(JoinKind::Left, JoinType::LeftOuter), (JoinKind::Right, JoinType::RightOuter)] {
        let plan = build_select(SelectStmt::new(vec![SelectField::wildcard()]).from(
            t1_join_t2(kind, Some(ExprNode::eq(col("t1.a"), col("t2.b")))),
        ))
        .unwrap();
        let join = join_of(&plan);
        let PlanKind::Join { join_type, .. } = &join.kind else {
            panic!("expected join");
        };
        assert_eq!(*join_type, expected);
        let concat = join.children[0].schema.concat(&join.children[1].schema);
        assert_eq!(join.schema, concat);
        assert_eq!(names(&plan), ["a", "c", "b", "d"]);
    }
}

#[test]
fn test_subquery_in_on_is_rejected() {
    let inner = select(&["b"]).from_table("t").filter(ExprNode::eq(col("t.b"), col("t1.a")));
    let on = ExprNode::and(ExprNode::eq(col("t1.a"), col("t2.b")), ExprNode::exists(inner));
    let err = build_select(select(&["t1.a"]).from(t1_join_t2(JoinKind::Cross, Some(on)))).unwrap_err();
    assert_eq!(err.kind(), "UnsupportedConstruct");
    assert!(err.to_string().contains("subqueries"), "{err}");
}

#[test]
fn test_correlated_on_is_rejected() {
    // SELECT a FROM t WHERE EXISTS (SELECT t1.a FROM t1 JOIN t2 ON t2.b = t.a)
    let on = ExprNode::eq(col("t2.b"), col("t.a"));
    let inner = select(&["t1.a"]).from(t1_join_t2(JoinKind::Cross, Some(on)));
    let err = build_select(select(&["a"]).from_table("t").filter(ExprNode::exists(inner))).unwrap_err();
    assert_eq!(err.kind(), "UnsupportedConstruct");
    assert!(err.to_string().contains("correlated ON condition"), "{err}");
}

#[test]
fn test_join_without_on_has_no_conditions() {
    let plan = build_select(select(&["t1.a", "t2.d"]).from(t1_join_t2(JoinKind::Cross, None))).unwrap();
    let PlanKind::Join {
        eq_conditions,
        left_conditions,
        right_conditions,
        other_conditions,
        ..
    } = &join_of(&plan).kind
    else {
        panic!("expected join");
    };
    assert!(eq_conditions.is_empty() && left_conditions.is_empty());
    assert!(right_conditions.is_empty() && other_conditions.is_empty());
    assert_eq!(names(&plan), ["a", "d"]);
}
