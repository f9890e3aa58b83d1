//! Second-pass resolution of HAVING and ORDER BY column names.
//!
//! A name found only below the projection gets an auxiliary projection
//! column so HAVING and SORT can read it from the projection's output. An
//! ORDER BY name used inside a larger expression prefers the input column
//! over a same-named output alias, and is qualified with its table so the
//! later lookup cannot land on the alias.

use relplan_core::error::{Error, Result};
use relplan_core::expr::Expression;
use relplan_core::plan::{Plan, PlanKind};
use relplan_core::schema::{Column, ColumnName, Schema};

use crate::ast::{ExprNode, OrderItem, Visit};

use super::PlanBuilder;

struct Replacer<'p> {
    exprs: &'p mut Vec<Expression>,
    schema: &'p mut Schema,
    child: &'p Schema,
    outer: &'p [Schema],
}

impl Replacer<'_> {
    fn add(&mut self, col: Column) {
        if self.schema.contains(&col) {
            return;
        }
        let mut out = col.clone();
        out.db_name.clear();
        out.auxiliary = true;
        self.exprs.push(Expression::Column(col));
        self.schema.push(out);
    }

    fn missing(&self, name: &ColumnName) -> Result<()> {
        for outer in self.outer.iter().rev() {
            if outer.find_column(name)?.is_some() {
                return Ok(());
            }
        }
        Err(Error::AmbiguousOrMissingColumn(format!("Can't find column {name}")))
    }

    fn resolve(&mut self, name: &mut ColumnName, input_first: bool) -> Result<()> {
        if input_first {
            match self.child.find_column(name)?.cloned() {
                Some(col) => {
                    name.table = col.tbl_name.clone();
                    self.add(col);
                    Ok(())
                }
                None if self.schema.find_column(name)?.is_some() => Ok(()),
                None => self.missing(name),
            }
        } else {
            if self.schema.find_column(name)?.is_some() {
                return Ok(());
            }
            match self.child.find_column(name)?.cloned() {
                Some(col) => {
                    self.add(col);
                    Ok(())
                }
                None => self.missing(name),
            }
        }
    }

    fn visit(&mut self, expr: &mut ExprNode, input_first: bool) -> Result<()> {
        expr.walk_mut(&mut |node| match node {
            ExprNode::Column(name) => {
                self.resolve(name, input_first)?;
                Ok(Visit::Skip)
            }
            // Aggregates were mapped to positions during extraction.
            ExprNode::Aggregate(_) => Ok(Visit::Skip),
            _ => Ok(Visit::Continue),
        })
    }
}

impl PlanBuilder<'_> {
    /// Resolve HAVING and ORDER BY names against a freshly built projection,
    /// extending it with auxiliary columns as needed.
    pub(crate) fn replace_deferred_columns(
        &mut self,
        proj: Plan,
        having: Option<&mut ExprNode>,
        order_by: &mut [OrderItem],
    ) -> Result<Plan> {
        self.step(|b| {
            let mut proj = proj;
            let Plan {
                kind,
                children,
                schema,
                ..
            } = &mut proj;
            let (PlanKind::Projection { exprs }, Some(child)) = (kind, children.first()) else {
                return Err(Error::UnsupportedConstruct(
                    "deferred column resolution needs a projection".into(),
                ));
            };
            let mut replacer = Replacer {
                exprs,
                schema,
                child: &child.schema,
                outer: &b.outer_schemas,
            };
            if let Some(having) = having {
                replacer.visit(having, false)?;
            }
            for item in order_by {
                let in_expr = item.expr.as_column().is_none();
                replacer.visit(&mut item.expr, in_expr)?;
            }
            Ok(proj)
        })
    }
}
