//! Resolved expressions: what AST expressions become once every column
//! reference points at a schema column.
//!
//! The variant set is closed. Traversals match on it directly instead of
//! going through a visitor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::Column;
use crate::types::{DataType, Datum, FieldType};

/// Canonical scalar function names.
pub mod funcs {
    pub const AND: &str = "and";
    pub const OR: &str = "or";
    pub const XOR: &str = "xor";
    pub const NOT: &str = "not";
    pub const EQ: &str = "eq";
    pub const NE: &str = "ne";
    pub const LT: &str = "lt";
    pub const LE: &str = "le";
    pub const GT: &str = "gt";
    pub const GE: &str = "ge";
    pub const NULL_EQ: &str = "nulleq";
    pub const LIKE: &str = "like";
    pub const PLUS: &str = "plus";
    pub const MINUS: &str = "minus";
    pub const MUL: &str = "mul";
    pub const DIV: &str = "div";
    pub const INT_DIV: &str = "intdiv";
    pub const MOD: &str = "mod";
    pub const UNARY_MINUS: &str = "unaryminus";
    pub const IS_NULL: &str = "isnull";
    pub const IN: &str = "in";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarFunction {
    pub name: String,
    pub args: Vec<Expression>,
    pub ret_type: FieldType,
}

impl ScalarFunction {
    pub fn new(name: impl Into<String>, args: Vec<Expression>, ret_type: FieldType) -> Self {
        Self {
            name: name.into(),
            args,
            ret_type,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub value: Datum,
    pub ret_type: FieldType,
}

impl Constant {
    pub fn new(value: Datum) -> Self {
        let ret_type = value.field_type();
        Self { value, ret_type }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Column(Column),
    ScalarFunction(ScalarFunction),
    Constant(Constant),
}

impl Expression {
    pub fn ret_type(&self) -> FieldType {
        match self {
            Expression::Column(c) => c.ret_type,
            Expression::ScalarFunction(f) => f.ret_type,
            Expression::Constant(c) => c.ret_type,
        }
    }

    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Expression::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Flatten top-level ANDs. A non-AND expression is a single conjunct.
    pub fn split_cnf(self) -> Vec<Expression> {
        let mut out = Vec::new();
        split_cnf_into(self, &mut out);
        out
    }

    /// Columns referenced anywhere in the expression, split into columns of
    /// the current scope and columns read from an enclosing scope.
    pub fn extract_columns(&self) -> (Vec<&Column>, Vec<&Column>) {
        let mut local = Vec::new();
        let mut outer = Vec::new();
        collect_columns(self, &mut local, &mut outer);
        (local, outer)
    }

    /// Whether any column in the expression comes from an enclosing scope.
    pub fn is_correlated(&self) -> bool {
        !self.extract_columns().1.is_empty()
    }
}

fn split_cnf_into(expr: Expression, out: &mut Vec<Expression>) {
    match expr {
        Expression::ScalarFunction(f) if f.is(funcs::AND) => {
            for arg in f.args {
                split_cnf_into(arg, out);
            }
        }
        other => out.push(other),
    }
}

fn collect_columns<'a>(expr: &'a Expression, local: &mut Vec<&'a Column>, outer: &mut Vec<&'a Column>) {
    match expr {
        Expression::Column(c) if c.correlated => outer.push(c),
        Expression::Column(c) => local.push(c),
        Expression::ScalarFunction(f) => {
            for arg in &f.args {
                collect_columns(arg, local, outer);
            }
        }
        Expression::Constant(_) => {}
    }
}

impl From<Column> for Expression {
    fn from(c: Column) -> Self {
        Expression::Column(c)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Column(c) => write!(f, "{c}"),
            Expression::Constant(c) => write!(f, "{}", c.value),
            Expression::ScalarFunction(func) => {
                write!(f, "{}(", func.name)?;
                for (i, arg) in func.args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Aggregate function symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
    GroupConcat,
    /// Pass-through of a grouping column's value.
    FirstRow,
}

impl AggFunc {
    pub fn from_name(name: &str) -> Option<AggFunc> {
        Some(match name.to_ascii_lowercase().as_str() {
            "count" => AggFunc::Count,
            "sum" => AggFunc::Sum,
            "avg" => AggFunc::Avg,
            "max" => AggFunc::Max,
            "min" => AggFunc::Min,
            "group_concat" => AggFunc::GroupConcat,
            "firstrow" => AggFunc::FirstRow,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            AggFunc::Count => "count",
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Max => "max",
            AggFunc::Min => "min",
            AggFunc::GroupConcat => "group_concat",
            AggFunc::FirstRow => "firstrow",
        }
    }

    /// Result type given the first argument's type, if any.
    pub fn ret_type(self, arg: Option<FieldType>) -> FieldType {
        let arg = arg.unwrap_or_default();
        match self {
            AggFunc::Count => FieldType::new(DataType::BigInt, 21),
            AggFunc::Sum | AggFunc::Avg => match arg.tp {
                DataType::Double => FieldType::of(DataType::Double),
                _ => FieldType::of(DataType::Decimal),
            },
            AggFunc::GroupConcat => FieldType::of(DataType::Text),
            AggFunc::Max | AggFunc::Min | AggFunc::FirstRow => arg,
        }
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFunction {
    pub func: AggFunc,
    pub args: Vec<Expression>,
    pub distinct: bool,
}

impl AggregateFunction {
    pub fn new(func: AggFunc, args: Vec<Expression>, distinct: bool) -> Self {
        Self {
            func,
            args,
            distinct,
        }
    }

    pub fn ret_type(&self) -> FieldType {
        self.func.ret_type(self.args.first().map(Expression::ret_type))
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func)?;
        if self.distinct {
            f.write_str("distinct ")?;
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByItem {
    pub expr: Expression,
    pub desc: bool,
}

impl fmt::Display for ByItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.desc {
            write!(f, "{} desc", self.expr)
        } else {
            write!(f, "{}", self.expr)
        }
    }
}
