//! Parsed statement tree consumed by the builder.
//!
//! A parser front-end produces these values; nothing in this crate reads SQL
//! text. Sub-selects inside expressions are opaque leaves for every
//! expression traversal here: walkers never step into them.

use std::fmt;

use serde::{Deserialize, Serialize};

use relplan_core::expr::{funcs, AggFunc};
use relplan_core::id::AggNodeId;
use relplan_core::plan::{LimitSpec, LockType};
use relplan_core::schema::ColumnName;
use relplan_core::types::Datum;
use relplan_core::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(SelectStmt),
    Union(UnionStmt),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TableName {
    /// Database qualifier, empty when absent.
    pub db: String,
    pub name: String,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            db: String::new(),
            name: name.into(),
        }
    }

    pub fn in_db(db: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.db.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.db, self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JoinKind {
    /// Plain, inner or cross join.
    #[default]
    Cross,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub left: ResultSetNode,
    /// Absent for a single-element join list.
    pub right: Option<ResultSetNode>,
    pub kind: JoinKind,
    pub on: Option<ExprNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSource {
    pub source: ResultSetNode,
    pub alias: Option<String>,
}

/// Anything that produces rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultSetNode {
    Join(Box<Join>),
    TableSource(Box<TableSource>),
    /// Only legal wrapped in a `TableSource`.
    TableName(TableName),
    Select(Box<SelectStmt>),
    Union(Box<UnionStmt>),
}

impl ResultSetNode {
    /// `FROM name`
    pub fn table(name: impl Into<String>) -> Self {
        ResultSetNode::TableSource(Box::new(TableSource {
            source: ResultSetNode::TableName(TableName::new(name)),
            alias: None,
        }))
    }

    /// `FROM name AS alias`
    pub fn table_as(name: impl Into<String>, alias: impl Into<String>) -> Self {
        ResultSetNode::TableSource(Box::new(TableSource {
            source: ResultSetNode::TableName(TableName::new(name)),
            alias: Some(alias.into()),
        }))
    }

    /// `FROM (SELECT ...) AS alias`
    pub fn derived(select: SelectStmt, alias: impl Into<String>) -> Self {
        ResultSetNode::TableSource(Box::new(TableSource {
            source: ResultSetNode::Select(Box::new(select)),
            alias: Some(alias.into()),
        }))
    }

    pub fn join(left: ResultSetNode, right: ResultSetNode, kind: JoinKind, on: Option<ExprNode>) -> Self {
        ResultSetNode::Join(Box::new(Join {
            left,
            right: Some(right),
            kind,
            on,
        }))
    }

    pub fn single(left: ResultSetNode) -> Self {
        ResultSetNode::Join(Box::new(Join {
            left,
            right: None,
            kind: JoinKind::Cross,
            on: None,
        }))
    }
}

impl From<SelectStmt> for ResultSetNode {
    fn from(s: SelectStmt) -> Self {
        ResultSetNode::Select(Box::new(s))
    }
}

impl From<UnionStmt> for ResultSetNode {
    fn from(u: UnionStmt) -> Self {
        ResultSetNode::Union(Box::new(u))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    NullEq,
    Like,
    Plus,
    Minus,
    Mul,
    Div,
    IntDiv,
    Mod,
}

impl BinaryOp {
    /// Name of the scalar function the operator resolves to.
    pub const fn func_name(self) -> &'static str {
        match self {
            BinaryOp::And => funcs::AND,
            BinaryOp::Or => funcs::OR,
            BinaryOp::Xor => funcs::XOR,
            BinaryOp::Eq => funcs::EQ,
            BinaryOp::Ne => funcs::NE,
            BinaryOp::Lt => funcs::LT,
            BinaryOp::Le => funcs::LE,
            BinaryOp::Gt => funcs::GT,
            BinaryOp::Ge => funcs::GE,
            BinaryOp::NullEq => funcs::NULL_EQ,
            BinaryOp::Like => funcs::LIKE,
            BinaryOp::Plus => funcs::PLUS,
            BinaryOp::Minus => funcs::MINUS,
            BinaryOp::Mul => funcs::MUL,
            BinaryOp::Div => funcs::DIV,
            BinaryOp::IntDiv => funcs::INT_DIV,
            BinaryOp::Mod => funcs::MOD,
        }
    }

    pub const fn sql(self) -> &'static str {
        match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::NullEq => "<=>",
            BinaryOp::Like => "LIKE",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "DIV",
            BinaryOp::Mod => "%",
        }
    }

    /// Yields a boolean-like value.
    pub const fn is_predicate(self) -> bool {
        !self.is_arithmetic()
    }

    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Plus
                | BinaryOp::Minus
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::IntDiv
                | BinaryOp::Mod
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Minus,
}

/// An aggregate call such as `SUM(DISTINCT a)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFuncExpr {
    pub func: AggFunc,
    pub args: Vec<ExprNode>,
    pub distinct: bool,
    /// Node identity, stamped during aggregate extraction.
    pub node_id: Option<AggNodeId>,
}

impl AggregateFuncExpr {
    /// Same call, ignoring node identity.
    pub fn same_call(&self, other: &AggregateFuncExpr) -> bool {
        self.func == other.func && self.distinct == other.distinct && self.args == other.args
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprNode {
    Column(ColumnName),
    Value(Datum),
    Paren(Box<ExprNode>),
    Binary {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<ExprNode>,
    },
    IsNull {
        expr: Box<ExprNode>,
        negated: bool,
    },
    FuncCall {
        name: String,
        args: Vec<ExprNode>,
    },
    Aggregate(AggregateFuncExpr),
    /// Scalar subquery.
    Subquery(Box<ResultSetNode>),
    Exists {
        query: Box<ResultSetNode>,
        negated: bool,
    },
    /// `left op ANY|ALL (query)`; `IN (query)` is `= ANY`.
    CompareSubquery {
        left: Box<ExprNode>,
        op: BinaryOp,
        all: bool,
        query: Box<ResultSetNode>,
    },
}

/// Whether a walk descends below the node just visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Skip,
}

impl ExprNode {
    pub fn column(name: impl Into<String>) -> Self {
        ExprNode::Column(ColumnName::new(name))
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        ExprNode::Column(ColumnName::qualified(table, name))
    }

    pub fn int(v: i64) -> Self {
        ExprNode::Value(Datum::Int(v))
    }

    pub fn string(s: impl Into<String>) -> Self {
        ExprNode::Value(Datum::Str(s.into()))
    }

    pub fn null() -> Self {
        ExprNode::Value(Datum::Null)
    }

    pub fn binary(op: BinaryOp, left: ExprNode, right: ExprNode) -> Self {
        ExprNode::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(left: ExprNode, right: ExprNode) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    pub fn eq(left: ExprNode, right: ExprNode) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn call(name: impl Into<String>, args: Vec<ExprNode>) -> Self {
        ExprNode::FuncCall {
            name: name.into(),
            args,
        }
    }

    pub fn aggregate(func: AggFunc, args: Vec<ExprNode>) -> Self {
        ExprNode::Aggregate(AggregateFuncExpr {
            func,
            args,
            distinct: false,
            node_id: None,
        })
    }

    pub fn subquery(query: impl Into<ResultSetNode>) -> Self {
        ExprNode::Subquery(Box::new(query.into()))
    }

    pub fn exists(query: impl Into<ResultSetNode>) -> Self {
        ExprNode::Exists {
            query: Box::new(query.into()),
            negated: false,
        }
    }

    pub fn in_subquery(left: ExprNode, query: impl Into<ResultSetNode>) -> Self {
        ExprNode::CompareSubquery {
            left: Box::new(left),
            op: BinaryOp::Eq,
            all: false,
            query: Box::new(query.into()),
        }
    }

    /// Is this a column reference (possibly parenthesized)?
    pub fn as_column(&self) -> Option<&ColumnName> {
        match self {
            ExprNode::Column(c) => Some(c),
            ExprNode::Paren(inner) => inner.as_column(),
            _ => None,
        }
    }

    /// Direct expression children. Sub-selects are not expression children.
    pub fn children(&self) -> Vec<&ExprNode> {
        match self {
            ExprNode::Column(_) | ExprNode::Value(_) | ExprNode::Subquery(_) | ExprNode::Exists { .. } => {
                Vec::new()
            }
            ExprNode::Paren(e) | ExprNode::Unary { expr: e, .. } | ExprNode::IsNull { expr: e, .. } => {
                vec![e.as_ref()]
            }
            ExprNode::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprNode::FuncCall { args, .. } => args.iter().collect(),
            ExprNode::Aggregate(agg) => agg.args.iter().collect(),
            ExprNode::CompareSubquery { left, .. } => vec![left.as_ref()],
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut ExprNode> {
        match self {
            ExprNode::Column(_) | ExprNode::Value(_) | ExprNode::Subquery(_) | ExprNode::Exists { .. } => {
                Vec::new()
            }
            ExprNode::Paren(e) | ExprNode::Unary { expr: e, .. } | ExprNode::IsNull { expr: e, .. } => {
                vec![e.as_mut()]
            }
            ExprNode::Binary { left, right, .. } => vec![left.as_mut(), right.as_mut()],
            ExprNode::FuncCall { args, .. } => args.iter_mut().collect(),
            ExprNode::Aggregate(agg) => agg.args.iter_mut().collect(),
            ExprNode::CompareSubquery { left, .. } => vec![left.as_mut()],
        }
    }

    /// Pre-order walk.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a ExprNode) -> Visit) {
        if f(self) == Visit::Skip {
            return;
        }
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Pre-order walk with mutable access.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut ExprNode) -> Result<Visit>) -> Result<()> {
        if f(self)? == Visit::Skip {
            return Ok(());
        }
        for child in self.children_mut() {
            child.walk_mut(f)?;
        }
        Ok(())
    }

    /// Post-order rewrite: children first, then `f` on the rebuilt node.
    pub fn transform_up(mut self, f: &mut impl FnMut(ExprNode) -> Result<ExprNode>) -> Result<ExprNode> {
        for child in self.children_mut() {
            let owned = std::mem::replace(child, ExprNode::null());
            *child = owned.transform_up(f)?;
        }
        f(self)
    }

    /// Whether an aggregate call appears outside any sub-select.
    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk(&mut |n| {
            if matches!(n, ExprNode::Aggregate(_)) {
                found = true;
                Visit::Skip
            } else {
                Visit::Continue
            }
        });
        found
    }

    /// Top-level AND conjuncts, looking through parentheses.
    pub fn split_conjuncts(&self) -> Vec<&ExprNode> {
        match self {
            ExprNode::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                let mut out = left.split_conjuncts();
                out.extend(right.split_conjuncts());
                out
            }
            ExprNode::Paren(inner) => inner.split_conjuncts(),
            other => vec![other],
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[ExprNode]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::Column(c) => write!(f, "{c}"),
            ExprNode::Value(v) => write!(f, "{v}"),
            ExprNode::Paren(e) => write!(f, "({e})"),
            ExprNode::Binary { op, left, right } => write!(f, "{left} {} {right}", op.sql()),
            ExprNode::Unary { op: UnaryOp::Not, expr } => write!(f, "NOT {expr}"),
            ExprNode::Unary { op: UnaryOp::Minus, expr } => write!(f, "-{expr}"),
            ExprNode::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{expr} IS NOT NULL")
                } else {
                    write!(f, "{expr} IS NULL")
                }
            }
            ExprNode::FuncCall { name, args } => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            ExprNode::Aggregate(agg) => {
                write!(f, "{}(", agg.func.name().to_ascii_uppercase())?;
                if agg.distinct {
                    f.write_str("DISTINCT ")?;
                }
                if agg.args.is_empty() && agg.func == AggFunc::Count {
                    f.write_str("*")?;
                }
                write_args(f, &agg.args)?;
                f.write_str(")")
            }
            ExprNode::Subquery(_) => f.write_str("(subquery)"),
            ExprNode::Exists { negated, .. } => {
                if *negated {
                    f.write_str("NOT EXISTS (subquery)")
                } else {
                    f.write_str("EXISTS (subquery)")
                }
            }
            ExprNode::CompareSubquery { left, op, all, .. } => {
                let quant = if *all { "ALL" } else { "ANY" };
                write!(f, "{left} {} {quant} (subquery)", op.sql())
            }
        }
    }
}

/// `db.table.*`, either qualifier optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WildCardField {
    pub db: String,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldExpr {
    Wildcard(WildCardField),
    Expr(ExprNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectField {
    pub field: FieldExpr,
    pub alias: Option<String>,
    /// Original source text; used to name unaliased computed columns.
    pub text: Option<String>,
    /// Injected by the builder for bookkeeping, never user-visible.
    pub auxiliary: bool,
}

impl SelectField {
    pub fn expr(expr: ExprNode) -> Self {
        Self {
            field: FieldExpr::Expr(expr),
            alias: None,
            text: None,
            auxiliary: false,
        }
    }

    pub fn wildcard() -> Self {
        Self {
            field: FieldExpr::Wildcard(WildCardField::default()),
            alias: None,
            text: None,
            auxiliary: false,
        }
    }

    pub fn table_wildcard(table: impl Into<String>) -> Self {
        Self {
            field: FieldExpr::Wildcard(WildCardField {
                db: String::new(),
                table: table.into(),
            }),
            alias: None,
            text: None,
            auxiliary: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn expr_node(&self) -> Option<&ExprNode> {
        match &self.field {
            FieldExpr::Expr(e) => Some(e),
            FieldExpr::Wildcard(_) => None,
        }
    }

    /// Name for an unaliased computed column.
    pub fn source_text(&self) -> String {
        match (&self.text, &self.field) {
            (Some(text), _) => text.clone(),
            (None, FieldExpr::Expr(e)) => e.to_string(),
            (None, FieldExpr::Wildcard(w)) if w.table.is_empty() => "*".to_string(),
            (None, FieldExpr::Wildcard(w)) => format!("{}.*", w.table),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expr: ExprNode,
    pub desc: bool,
}

impl OrderItem {
    pub fn asc(expr: ExprNode) -> Self {
        Self { expr, desc: false }
    }

    pub fn desc(expr: ExprNode) -> Self {
        Self { expr, desc: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SelectStmt {
    pub distinct: bool,
    pub fields: Vec<SelectField>,
    pub from: Option<ResultSetNode>,
    pub where_clause: Option<ExprNode>,
    /// Empty when there is no GROUP BY.
    pub group_by: Vec<ExprNode>,
    pub having: Option<ExprNode>,
    /// Empty when there is no ORDER BY.
    pub order_by: Vec<OrderItem>,
    pub limit: Option<LimitSpec>,
    pub lock: LockType,
}

impl SelectStmt {
    pub fn new(fields: Vec<SelectField>) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn from_table(mut self, name: impl Into<String>) -> Self {
        self.from = Some(ResultSetNode::single(ResultSetNode::table(name)));
        self
    }

    pub fn from(mut self, node: ResultSetNode) -> Self {
        self.from = Some(node);
        self
    }

    pub fn filter(mut self, expr: ExprNode) -> Self {
        self.where_clause = Some(expr);
        self
    }

    pub fn group_by(mut self, items: Vec<ExprNode>) -> Self {
        self.group_by = items;
        self
    }

    pub fn having(mut self, expr: ExprNode) -> Self {
        self.having = Some(expr);
        self
    }

    pub fn order_by(mut self, items: Vec<OrderItem>) -> Self {
        self.order_by = items;
        self
    }

    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.limit = Some(LimitSpec { offset, count });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn lock(mut self, lock: LockType) -> Self {
        self.lock = lock;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UnionStmt {
    pub distinct: bool,
    pub selects: Vec<SelectStmt>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<LimitSpec>,
}

impl UnionStmt {
    pub fn new(selects: Vec<SelectStmt>) -> Self {
        Self {
            selects,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_conjuncts_looks_through_parens() {
        let e = ExprNode::and(
            ExprNode::Paren(Box::new(ExprNode::and(ExprNode::column("a"), ExprNode::column("b")))),
            ExprNode::binary(BinaryOp::Or, ExprNode::column("c"), ExprNode::column("d")),
        );
        let parts = e.split_conjuncts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].to_string(), "c OR d");
    }

    #[test]
    fn walks_do_not_enter_subqueries() {
        let inner = SelectStmt::new(vec![SelectField::expr(ExprNode::aggregate(
            AggFunc::Sum,
            vec![ExprNode::column("x")],
        ))])
        .from_table("t2");
        let e = ExprNode::binary(BinaryOp::Gt, ExprNode::column("a"), ExprNode::subquery(inner));
        assert!(!e.contains_aggregate());

        let e = ExprNode::binary(
            BinaryOp::Gt,
            ExprNode::aggregate(AggFunc::Count, vec![]),
            ExprNode::int(1),
        );
        assert!(e.contains_aggregate());
        assert_eq!(e.to_string(), "COUNT(*) > 1");
    }

    #[test]
    fn transform_up_rewrites_leaves() {
        let e = ExprNode::binary(BinaryOp::Plus, ExprNode::column("x"), ExprNode::int(1));
        let out = e
            .transform_up(&mut |n| {
                Ok(match n {
                    ExprNode::Column(c) if c.name == "x" => ExprNode::column("y"),
                    other => other,
                })
            })
            .unwrap();
        assert_eq!(out.to_string(), "y + 1");
    }

    #[test]
    fn same_call_ignores_identity() {
        let mut a = AggregateFuncExpr {
            func: AggFunc::Sum,
            args: vec![ExprNode::column("a")],
            distinct: false,
            node_id: None,
        };
        let b = a.clone();
        a.node_id = Some(AggNodeId::new(4));
        assert!(a.same_call(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn field_text_falls_back_to_rendering() {
        let f = SelectField::expr(ExprNode::binary(BinaryOp::Plus, ExprNode::column("a"), ExprNode::int(1)));
        assert_eq!(f.source_text(), "a + 1");
        assert_eq!(f.with_text("a+1").source_text(), "a+1");
    }
}
