//! Expression-rewrite collaborator: one AST expression → one resolved
//! expression against the current plan.
//!
//! Builders call this through `PlanBuilder::rewrite` and treat it as opaque.
//! A rewrite may replace the plan it was given, e.g. by grafting an APPLY
//! when the expression contains a sub-select, so the plan goes in by value
//! and comes back in `Rewritten`.

use std::collections::HashMap;

use relplan_core::error::{Error, Result};
use relplan_core::expr::{funcs, Constant, Expression, ScalarFunction};
use relplan_core::id::{AggNodeId, OperatorKind, PlanId};
use relplan_core::plan::{Plan, PlanKind};
use relplan_core::schema::{Column, ColumnName, Schema};
use relplan_core::types::{DataType, FieldType, UNSPECIFIED_LENGTH};

use crate::ast::{BinaryOp, ExprNode, ResultSetNode, UnaryOp};
use crate::builder::PlanBuilder;

/// Aggregate node identity → schema position of its placeholder column.
pub type AggMapper = HashMap<AggNodeId, usize>;

#[derive(Debug, Clone)]
pub struct Rewritten {
    pub expr: Expression,
    /// Input plan, or a new plan with sub-selects grafted on.
    pub plan: Plan,
    /// The expression reads a column of an enclosing scope.
    pub correlated: bool,
}

pub trait ExprRewriter {
    fn rewrite(
        &self,
        builder: &mut PlanBuilder<'_>,
        expr: &ExprNode,
        plan: Plan,
        mapper: Option<&AggMapper>,
    ) -> Result<Rewritten>;
}

/// Rewriter used unless the caller injects another one.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRewriter;

impl ExprRewriter for DefaultRewriter {
    fn rewrite(
        &self,
        builder: &mut PlanBuilder<'_>,
        expr: &ExprNode,
        plan: Plan,
        mapper: Option<&AggMapper>,
    ) -> Result<Rewritten> {
        let mut cx = RewriteCx {
            builder,
            plan,
            mapper,
            correlated: false,
        };
        let expr = cx.rewrite_node(expr)?;
        Ok(Rewritten {
            expr,
            plan: cx.plan,
            correlated: cx.correlated,
        })
    }
}

struct RewriteCx<'r, 'a, 'm> {
    builder: &'r mut PlanBuilder<'a>,
    plan: Plan,
    mapper: Option<&'m AggMapper>,
    correlated: bool,
}

// Stands in for the current plan while it is moved into a new APPLY.
fn detached() -> Plan {
    Plan::leaf(
        PlanId::new(OperatorKind::TableDual, 0),
        PlanKind::TableDual,
        Schema::default(),
    )
}

impl RewriteCx<'_, '_, '_> {
    fn rewrite_node(&mut self, node: &ExprNode) -> Result<Expression> {
        match node {
            ExprNode::Column(name) => self.resolve_column(name),
            ExprNode::Value(v) => Ok(Expression::Constant(Constant::new(v.clone()))),
            ExprNode::Paren(inner) => self.rewrite_node(inner),
            ExprNode::Binary { op, left, right } => {
                let args = vec![self.rewrite_node(left)?, self.rewrite_node(right)?];
                let ret_type = binary_ret_type(*op, &args);
                Ok(func(op.func_name(), args, ret_type))
            }
            ExprNode::Unary { op, expr } => {
                let arg = self.rewrite_node(expr)?;
                Ok(match op {
                    UnaryOp::Not => func(funcs::NOT, vec![arg], FieldType::boolean()),
                    UnaryOp::Minus => {
                        let ret_type = arg.ret_type();
                        func(funcs::UNARY_MINUS, vec![arg], ret_type)
                    }
                })
            }
            ExprNode::IsNull { expr, negated } => {
                let arg = self.rewrite_node(expr)?;
                let is_null = func(funcs::IS_NULL, vec![arg], FieldType::boolean());
                Ok(if *negated {
                    func(funcs::NOT, vec![is_null], FieldType::boolean())
                } else {
                    is_null
                })
            }
            ExprNode::FuncCall { name, args } => {
                let args = args
                    .iter()
                    .map(|a| self.rewrite_node(a))
                    .collect::<Result<Vec<_>>>()?;
                let lower = name.to_ascii_lowercase();
                let ret_type = call_ret_type(&lower, &args);
                Ok(func(lower, args, ret_type))
            }
            ExprNode::Aggregate(agg) => {
                let pos = agg
                    .node_id
                    .and_then(|id| self.mapper.and_then(|m| m.get(&id)))
                    .copied()
                    .ok_or_else(|| {
                        Error::UnsupportedConstruct(format!(
                            "aggregate function {node} is not allowed here"
                        ))
                    })?;
                let col = self.plan.schema.column(pos).cloned().ok_or_else(|| {
                    Error::ExtractionFailure(format!(
                        "placeholder for {node} points past the schema (position {pos})"
                    ))
                })?;
                Ok(Expression::Column(col))
            }
            ExprNode::Subquery(query) => {
                let inner = self.build_inner(query)?;
                single_column(&inner, node)?;
                let inner = self.builder.build_max_one_row(inner)?;
                let col = self.graft(inner)?;
                Ok(Expression::Column(col))
            }
            ExprNode::Exists { query, negated } => {
                let inner = self.build_inner(query)?;
                let inner = self.builder.build_exists(inner)?;
                let col = Expression::Column(self.graft(inner)?);
                Ok(if *negated {
                    func(funcs::NOT, vec![col], FieldType::boolean())
                } else {
                    col
                })
            }
            ExprNode::CompareSubquery {
                left,
                op,
                all,
                query,
            } => {
                let lhs = self.rewrite_node(left)?;
                let inner = self.build_inner(query)?;
                single_column(&inner, node)?;
                let col = self.graft(inner)?;
                let name = format!("{}_{}", op.func_name(), if *all { "all" } else { "any" });
                Ok(func(name, vec![lhs, Expression::Column(col)], FieldType::boolean()))
            }
        }
    }

    fn resolve_column(&mut self, name: &ColumnName) -> Result<Expression> {
        if let Some(col) = self.plan.schema.find_column(name)? {
            return Ok(Expression::Column(col.clone()));
        }
        for outer in self.builder.outer_schemas().iter().rev() {
            if let Some(col) = outer.find_column(name)? {
                let mut col = col.clone();
                col.correlated = true;
                self.correlated = true;
                return Ok(Expression::Column(col));
            }
        }
        Err(Error::AmbiguousOrMissingColumn(format!(
            "Unknown column '{name}'"
        )))
    }

    fn build_inner(&mut self, query: &ResultSetNode) -> Result<Plan> {
        let outer = self.plan.schema.clone();
        self.builder.build_subquery(query, outer)
    }

    /// Put `inner` under an APPLY over the current plan; returns the column
    /// the sub-select contributes.
    fn graft(&mut self, inner: Plan) -> Result<Column> {
        let outer = std::mem::replace(&mut self.plan, detached());
        self.plan = self.builder.build_apply(outer, inner)?;
        self.plan.schema.columns.last().cloned().ok_or_else(|| {
            Error::UnsupportedConstruct("sub-select produces no columns".into())
        })
    }
}

fn func(name: impl Into<String>, args: Vec<Expression>, ret_type: FieldType) -> Expression {
    Expression::ScalarFunction(ScalarFunction::new(name, args, ret_type))
}

fn single_column(inner: &Plan, node: &ExprNode) -> Result<()> {
    if inner.schema.len() == 1 {
        Ok(())
    } else {
        Err(Error::UnsupportedConstruct(format!(
            "{node}: operand should contain 1 column(s), got {}",
            inner.schema.len()
        )))
    }
}

fn widest_numeric(args: &[Expression]) -> FieldType {
    let types: Vec<DataType> = args.iter().map(|a| a.ret_type().tp).collect();
    if types
        .iter()
        .any(|t| matches!(t, DataType::Double) || t.is_string())
    {
        FieldType::of(DataType::Double)
    } else if types.contains(&DataType::Decimal) {
        FieldType::of(DataType::Decimal)
    } else {
        FieldType::of(DataType::BigInt)
    }
}

fn binary_ret_type(op: BinaryOp, args: &[Expression]) -> FieldType {
    if op.is_predicate() {
        return FieldType::boolean();
    }
    match op {
        BinaryOp::IntDiv => FieldType::of(DataType::BigInt),
        BinaryOp::Div => match widest_numeric(args).tp {
            DataType::Double => FieldType::of(DataType::Double),
            _ => FieldType::of(DataType::Decimal),
        },
        _ => widest_numeric(args),
    }
}

fn call_ret_type(name: &str, args: &[Expression]) -> FieldType {
    match name {
        "concat" => {
            let lens: Option<i32> = args
                .iter()
                .map(|a| Some(a.ret_type().flen).filter(|l| *l != UNSPECIFIED_LENGTH))
                .sum();
            FieldType::new(DataType::Varchar, lens.unwrap_or(UNSPECIFIED_LENGTH))
        }
        "upper" | "lower" | "trim" | "ltrim" | "rtrim" | "replace" | "substring" | "repeat" => {
            FieldType::of(DataType::Varchar)
        }
        "length" | "char_length" | "locate" => FieldType::of(DataType::BigInt),
        "now" | "current_timestamp" | "sysdate" => FieldType::of(DataType::Datetime),
        "curdate" | "current_date" => FieldType::of(DataType::Date),
        "isnull" => FieldType::boolean(),
        "if" => args.get(1).map(Expression::ret_type).unwrap_or_default(),
        "ifnull" | "coalesce" => args
            .iter()
            .map(Expression::ret_type)
            .find(|t| !t.tp.is_placeholder())
            .unwrap_or_default(),
        _ => args.first().map(Expression::ret_type).unwrap_or_default(),
    }
}
